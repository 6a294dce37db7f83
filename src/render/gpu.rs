use anyhow::{Context, Result};
use wgpu;

/// Headless device and queue; the render target is an offscreen texture.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    pub fn new() -> Result<Self> {
        pollster::block_on(Self::init_async())
    }

    async fn init_async() -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        // Full adapter limits: source photos are often larger than 2048px.
        let limits = adapter.limits();
        log::info!(
            "Using GPU: {} ({:?}), max texture {}px",
            info.name,
            info.backend,
            limits.max_texture_dimension_2d
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("shaderlab_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                    ..Default::default()
                },
                None,
            )
            .await
            .context("Failed to create GPU device")?;

        Ok(Self { device, queue })
    }

    /// Largest width or height a 2D texture may have on this device.
    pub fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Fail with a readable error instead of a validation panic when a
    /// texture would not fit on this device.
    pub fn check_texture_size(&self, what: &str, width: u32, height: u32) -> Result<()> {
        check_texture_size(what, width, height, self.max_texture_dimension())
    }
}

pub fn check_texture_size(what: &str, width: u32, height: u32, max: u32) -> Result<()> {
    if width == 0 || height == 0 {
        anyhow::bail!("{} must be at least 1x1, got {}x{}", what, width, height);
    }
    if width > max || height > max {
        anyhow::bail!(
            "{} is {}x{}, but this GPU supports textures up to {}x{}",
            what,
            width,
            height,
            max,
            max
        );
    }
    Ok(())
}
