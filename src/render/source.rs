use anyhow::{Context, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use wgpu;

use super::gpu::GpuContext;

/// Format the source image is sampled in.
pub const SOURCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Decoded RGBA8 pixels of the image the effects are applied to.
pub struct SourceImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl SourceImage {
    /// Load from a file path or an http(s) URL.
    pub fn load(location: &str) -> Result<Self> {
        let bytes = if is_url(location) {
            fetch_url(location)?
        } else {
            std::fs::read(location)
                .with_context(|| format!("Failed to read image: {}", location))?
        };
        Self::decode(&bytes).with_context(|| format!("Failed to decode image: {}", location))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }
}

fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

fn fetch_url(url: &str) -> Result<Vec<u8>> {
    log::info!("Downloading source image from {}", url);
    let response = reqwest::blocking::get(url)
        .with_context(|| format!("Failed to request {}", url))?
        .error_for_status()
        .with_context(|| format!("Server rejected {}", url))?;
    let bytes = response
        .bytes()
        .with_context(|| format!("Failed to read body of {}", url))?;
    Ok(bytes.to_vec())
}

/// The uploaded, ready-to-sample source texture.
pub struct SourceTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    id: u64,
    pub width: u32,
    pub height: u32,
}

impl SourceTexture {
    pub fn upload(gpu: &GpuContext, image: &SourceImage) -> Self {
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("source_texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SOURCE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.width * 4),
                rows_per_image: Some(image.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        log::info!("Uploaded source image {}x{}", image.width, image.height);

        Self {
            texture,
            view,
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            width: image.width,
            height: image.height,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Distinguishes uploads so materials know when to rebind.
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn decodes_png_to_rgba() {
        let img = SourceImage::decode(&png_bytes(3, 2)).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert_eq!(img.rgba.len(), 3 * 2 * 4);
        assert_eq!(&img.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(SourceImage::decode(b"not an image").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(SourceImage::load("/definitely/not/here.png").is_err());
    }

    #[test]
    fn recognises_urls() {
        assert!(is_url("https://example.com/Lenna.png"));
        assert!(is_url("http://localhost/a.png"));
        assert!(!is_url("assets/Lenna.png"));
    }
}
