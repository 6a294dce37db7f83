use wgpu;

use crate::effects::{EffectRuntime, FrameAction, MaterialTracker};

use super::gpu::GpuContext;
use super::material::{EffectMaterial, FrameUniforms};
use super::source::SourceTexture;

/// Draws the runtime's active effect over the source image.
///
/// Owns the single live material. A new one is compiled only when the
/// runtime's shader changes; parameter edits are written into the existing
/// uniform buffer.
pub struct EffectRenderer {
    format: wgpu::TextureFormat,
    frame_buffer: wgpu::Buffer,
    tracker: MaterialTracker,
    material: Option<EffectMaterial>,
    rebuilds: u64,
}

impl EffectRenderer {
    pub fn new(gpu: &GpuContext, format: wgpu::TextureFormat) -> Self {
        let frame_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniform_buffer"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            format,
            frame_buffer,
            tracker: MaterialTracker::default(),
            material: None,
            rebuilds: 0,
        }
    }

    /// Number of programs compiled so far.
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Render one full-viewport frame into `target`.
    ///
    /// Safe to call every frame. Returns `false` when nothing was drawn: no
    /// source texture yet, or the active program failed to build.
    pub fn draw(
        &mut self,
        gpu: &GpuContext,
        runtime: &EffectRuntime,
        source: Option<&SourceTexture>,
        target: &wgpu::TextureView,
        viewport: (u32, u32),
    ) -> bool {
        let Some(source) = source else {
            log::debug!("No source texture yet, skipping draw");
            return false;
        };

        match self.tracker.plan(runtime) {
            FrameAction::Rebuild => {
                // Release the old program before compiling its replacement.
                self.material = None;
                self.rebuilds += 1;
                match EffectMaterial::new(
                    &gpu.device,
                    runtime.active(),
                    &self.frame_buffer,
                    source,
                    self.format,
                ) {
                    Ok(material) => {
                        material.write_params(&gpu.queue, runtime.parameters());
                        self.material = Some(material);
                    }
                    Err(err) => log::error!("{:#}", err),
                }
            }
            FrameAction::UpdateUniforms => {
                if let Some(material) = &self.material {
                    material.write_params(&gpu.queue, runtime.parameters());
                }
            }
            FrameAction::Redraw => {}
        }
        self.tracker.commit(runtime);

        let Some(material) = self.material.as_mut() else {
            return false;
        };
        material.bind_source(&gpu.device, &self.frame_buffer, source);

        let frame = FrameUniforms::for_viewport(viewport.0, viewport.1);
        gpu.queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("effect_encoder"),
        });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(material.effect_id()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            material.record(&mut pass);
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::params::ParamValue;
    use crate::effects::EffectRegistry;
    use crate::render::frame::{FrameRenderer, TEXTURE_FORMAT};
    use crate::render::source::SourceImage;

    fn gpu_or_skip() -> Option<GpuContext> {
        match GpuContext::new() {
            Ok(gpu) => Some(gpu),
            Err(err) => {
                eprintln!("skipping GPU test: {:#}", err);
                None
            }
        }
    }

    fn checker_source(gpu: &GpuContext) -> SourceTexture {
        let rgba = (0..16u8).flat_map(|i| [i * 16, 255 - i * 16, 128, 255]).collect();
        SourceTexture::upload(gpu, &SourceImage { width: 4, height: 4, rgba })
    }

    #[test]
    fn draw_without_source_is_a_no_op() {
        let Some(gpu) = gpu_or_skip() else { return };
        let frame = FrameRenderer::new(&gpu, 4, 4);
        let mut renderer = EffectRenderer::new(&gpu, TEXTURE_FORMAT);
        let mut runtime = EffectRuntime::new(EffectRegistry::builtin());
        runtime.select_effect("grayscale");

        assert!(!renderer.draw(&gpu, &runtime, None, &frame.render_texture_view, (4, 4)));
        assert!(!renderer.draw(&gpu, &runtime, None, &frame.render_texture_view, (4, 4)));
        assert_eq!(renderer.rebuilds(), 0);

        // The skipped frames leave the rebuild pending for the first real one.
        let source = checker_source(&gpu);
        assert!(renderer.draw(&gpu, &runtime, Some(&source), &frame.render_texture_view, (4, 4)));
        assert_eq!(renderer.rebuilds(), 1);
    }

    #[test]
    fn parameter_edits_reuse_the_program() {
        let Some(gpu) = gpu_or_skip() else { return };
        let frame = FrameRenderer::new(&gpu, 4, 4);
        let source = checker_source(&gpu);
        let mut renderer = EffectRenderer::new(&gpu, TEXTURE_FORMAT);
        let mut runtime = EffectRuntime::new(EffectRegistry::builtin());
        let target = &frame.render_texture_view;

        runtime.select_effect("grayscale");
        assert!(renderer.draw(&gpu, &runtime, Some(&source), target, (4, 4)));
        assert_eq!(renderer.rebuilds(), 1);

        runtime.set_parameter("uIntensity", ParamValue::Float(0.5)).unwrap();
        assert!(renderer.draw(&gpu, &runtime, Some(&source), target, (4, 4)));
        assert!(renderer.draw(&gpu, &runtime, Some(&source), target, (4, 4)));
        assert_eq!(renderer.rebuilds(), 1);

        runtime.select_effect("sepia");
        assert!(renderer.draw(&gpu, &runtime, Some(&source), target, (4, 4)));
        assert_eq!(renderer.rebuilds(), 2);
        assert_eq!(renderer.material.as_ref().map(|m| m.effect_id()), Some("sepia"));

        assert!(frame.readback(&gpu).is_ok());
    }
}
