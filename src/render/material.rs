use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use wgpu;

use crate::effects::embedded::COMMON_WGSL;
use crate::effects::{EffectDescriptor, ParameterState};

use super::layout::{assemble_shader, UniformLayout, PARAMS_BINDING};
use super::source::SourceTexture;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub resolution: [f32; 2],
    pub texel: [f32; 2],
}

impl FrameUniforms {
    pub fn for_viewport(width: u32, height: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        Self {
            resolution: [w, h],
            texel: [1.0 / w, 1.0 / h],
        }
    }
}

/// A compiled effect program with its uniforms and source binding.
pub struct EffectMaterial {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    params_buffer: Option<wgpu::Buffer>,
    layout: UniformLayout,
    bind_group: wgpu::BindGroup,
    source_id: u64,
    effect_id: &'static str,
}

impl EffectMaterial {
    pub fn new(
        device: &wgpu::Device,
        effect: &EffectDescriptor,
        frame_buffer: &wgpu::Buffer,
        source: &SourceTexture,
        format: wgpu::TextureFormat,
    ) -> Result<Self> {
        let layout = UniformLayout::new(&effect.defaults);
        let program = assemble_shader(COMMON_WGSL, &layout, &effect.shader_source);

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(effect.id),
            source: wgpu::ShaderSource::Wgsl(program.into()),
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("effect_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let mut entries = vec![
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ];
        if !layout.is_empty() {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: PARAMS_BINDING,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            });
        }

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("effect_bind_group_layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("effect_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("effect_render_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let params_buffer = (!layout.is_empty()).then(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("effect_params_buffer"),
                size: layout.buffer_size(),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        let bind_group = create_bind_group(
            device,
            &bind_group_layout,
            frame_buffer,
            source,
            &sampler,
            params_buffer.as_ref(),
        );

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(anyhow::anyhow!("{}", err))
                .with_context(|| format!("Failed to build material for effect '{}'", effect.id));
        }

        log::debug!(
            "Built material for '{}' ({} uniforms, {} bytes)",
            effect.id,
            layout.fields().len(),
            layout.size()
        );

        Ok(Self {
            pipeline,
            bind_group_layout,
            sampler,
            params_buffer,
            layout,
            bind_group,
            source_id: source.id(),
            effect_id: effect.id,
        })
    }

    pub fn effect_id(&self) -> &'static str {
        self.effect_id
    }

    /// Upload parameter values without touching the program.
    pub fn write_params(&self, queue: &wgpu::Queue, params: &ParameterState) {
        if let Some(buffer) = &self.params_buffer {
            queue.write_buffer(buffer, 0, &self.layout.pack(params));
        }
    }

    /// Point the material at another source texture if it changed.
    pub fn bind_source(&mut self, device: &wgpu::Device, frame_buffer: &wgpu::Buffer, source: &SourceTexture) {
        if self.source_id == source.id() {
            return;
        }
        self.bind_group = create_bind_group(
            device,
            &self.bind_group_layout,
            frame_buffer,
            source,
            &self.sampler,
            self.params_buffer.as_ref(),
        );
        self.source_id = source.id();
    }

    pub fn record(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1); // full-viewport triangle
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    frame_buffer: &wgpu::Buffer,
    source: &SourceTexture,
    sampler: &wgpu::Sampler,
    params_buffer: Option<&wgpu::Buffer>,
) -> wgpu::BindGroup {
    let mut entries = vec![
        wgpu::BindGroupEntry {
            binding: 0,
            resource: frame_buffer.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::TextureView(source.view()),
        },
        wgpu::BindGroupEntry {
            binding: 2,
            resource: wgpu::BindingResource::Sampler(sampler),
        },
    ];
    if let Some(buffer) = params_buffer {
        entries.push(wgpu::BindGroupEntry {
            binding: PARAMS_BINDING,
            resource: buffer.as_entire_binding(),
        });
    }

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("effect_bind_group"),
        layout,
        entries: &entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_uniforms_match_viewport() {
        let u = FrameUniforms::for_viewport(512, 256);
        assert_eq!(u.resolution, [512.0, 256.0]);
        assert_eq!(u.texel, [1.0 / 512.0, 1.0 / 256.0]);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 16);
    }

    #[test]
    fn zero_viewport_does_not_divide_by_zero() {
        let u = FrameUniforms::for_viewport(0, 0);
        assert!(u.texel.iter().all(|t| t.is_finite()));
    }

    #[test]
    fn every_builtin_program_assembles() {
        let registry = crate::effects::EffectRegistry::builtin();
        for effect in registry.list_effects() {
            let layout = UniformLayout::new(&effect.defaults);
            let program = assemble_shader(COMMON_WGSL, &layout, &effect.shader_source);
            assert!(program.contains("fn vs_main"));
            assert!(program.contains("fn fs_main"));
            for (key, _) in effect.defaults.iter() {
                assert!(program.contains(&format!("params.{}", key)), "{} unused in {}", key, effect.id);
            }
            assert_eq!(program.contains("var<uniform> params"), !effect.defaults.is_empty());
        }
    }
}
