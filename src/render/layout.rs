use std::fmt::Write;

use crate::effects::params::{ParamShape, ParamValue, ParameterState};

/// Binding slot of the per-effect parameter block.
pub const PARAMS_BINDING: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct UniformField {
    pub name: String,
    pub offset: usize,
    pub default: ParamValue,
}

/// Layout of an effect's parameters in the WGSL uniform address space.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: usize,
}

fn align_and_size(shape: ParamShape) -> (usize, usize) {
    match shape {
        ParamShape::Float => (4, 4),
        ParamShape::Vector(2) => (8, 8),
        ParamShape::Vector(3) => (16, 12),
        ParamShape::Vector(_) => (16, 16),
        ParamShape::Array(n) => (16, 16 * n),
    }
}

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

fn wgsl_type(shape: ParamShape) -> String {
    match shape {
        ParamShape::Float => "f32".into(),
        ParamShape::Vector(n) => format!("vec{}<f32>", n),
        ParamShape::Array(n) => format!("array<vec4<f32>, {}>", n),
    }
}

impl UniformLayout {
    /// Lay out fields in key order, following the schema's default values.
    pub fn new(schema: &ParameterState) -> Self {
        let mut fields = Vec::with_capacity(schema.len());
        let mut cursor = 0;
        let mut struct_align = 4;
        for (name, default) in schema.iter() {
            let (align, size) = align_and_size(default.shape());
            let offset = round_up(cursor, align);
            cursor = offset + size;
            struct_align = struct_align.max(align);
            fields.push(UniformField {
                name: name.to_string(),
                offset,
                default: default.clone(),
            });
        }
        Self {
            fields,
            size: round_up(cursor, struct_align),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    /// Size of the WGSL struct.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Size of the backing buffer, padded to 16 bytes.
    pub fn buffer_size(&self) -> u64 {
        round_up(self.size.max(16), 16) as u64
    }

    /// `EffectParams` struct and its binding, or nothing for parameterless effects.
    pub fn wgsl_declaration(&self) -> String {
        if self.is_empty() {
            return String::new();
        }
        let mut out = String::from("struct EffectParams {\n");
        for field in &self.fields {
            let _ = writeln!(out, "    {}: {},", field.name, wgsl_type(field.default.shape()));
        }
        out.push_str("};\n\n");
        let _ = writeln!(
            out,
            "@group(0) @binding({}) var<uniform> params: EffectParams;",
            PARAMS_BINDING
        );
        out
    }

    /// Encode `params` into buffer bytes. Missing or wrongly shaped entries
    /// use the schema default.
    pub fn pack(&self, params: &ParameterState) -> Vec<u8> {
        let mut words = vec![0.0f32; self.buffer_size() as usize / 4];
        for field in &self.fields {
            let value = match params.get(&field.name) {
                Some(v) if v.shape() == field.default.shape() => v,
                Some(v) => {
                    log::warn!(
                        "Uniform '{}' has shape {}, packing default",
                        field.name,
                        v.shape()
                    );
                    &field.default
                }
                None => &field.default,
            };
            let base = field.offset / 4;
            match value {
                ParamValue::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        words[base + i * 4] = *item;
                    }
                }
                other => {
                    let comps = other.components();
                    words[base..base + comps.len()].copy_from_slice(comps);
                }
            }
        }
        bytemuck::cast_slice::<f32, u8>(&words).to_vec()
    }
}

/// Full WGSL program for one effect body.
pub fn assemble_shader(common: &str, layout: &UniformLayout, body: &str) -> String {
    format!("{}\n{}\n{}", common, layout.wgsl_declaration(), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EffectRegistry;

    fn schema(entries: &[(&str, ParamValue)]) -> ParameterState {
        entries.iter().cloned().collect()
    }

    fn floats(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn grayscale_layout() {
        let layout = UniformLayout::new(&schema(&[
            ("uIntensity", ParamValue::Float(1.0)),
            ("uRgbWeights", ParamValue::Vector(vec![0.2, 0.7, 0.1])),
        ]));
        let offsets: Vec<usize> = layout.fields().iter().map(|f| f.offset).collect();
        assert_eq!(offsets, vec![0, 16]);
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn scalar_packs_after_vec3() {
        let registry = EffectRegistry::builtin();
        let vignette = registry.find_effect("vignette").unwrap();
        let layout = UniformLayout::new(&vignette.defaults);
        let fields: Vec<(&str, usize)> = layout
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.offset))
            .collect();
        assert_eq!(
            fields,
            vec![("uColor", 0), ("uEdgeEnd", 12), ("uEdgeStart", 16), ("uIntensity", 20)]
        );
        assert_eq!(layout.size(), 32);
    }

    #[test]
    fn single_float_buffer_is_padded() {
        let layout = UniformLayout::new(&schema(&[("uIntensity", ParamValue::Float(2.0))]));
        assert_eq!(layout.size(), 4);
        assert_eq!(layout.buffer_size(), 16);
        assert_eq!(floats(&layout.pack(&ParameterState::new())), vec![2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn arrays_use_vec4_stride() {
        let layout = UniformLayout::new(&schema(&[
            ("uKernel", ParamValue::Array(vec![1.0, 2.0, 3.0])),
            ("uScale", ParamValue::Float(0.5)),
        ]));
        assert_eq!(layout.fields()[1].offset, 48);
        let words = floats(&layout.pack(&schema(&[("uKernel", ParamValue::Array(vec![4.0, 5.0, 6.0]))])));
        assert_eq!(words[0], 4.0);
        assert_eq!(words[4], 5.0);
        assert_eq!(words[8], 6.0);
        assert_eq!(words[12], 0.5);
        assert!(layout.wgsl_declaration().contains("uKernel: array<vec4<f32>, 3>,"));
    }

    #[test]
    fn pack_uses_live_values_and_ignores_mismatch() {
        let layout = UniformLayout::new(&schema(&[
            ("uIntensity", ParamValue::Float(1.0)),
            ("uRgbWeights", ParamValue::Vector(vec![0.2, 0.7, 0.1])),
        ]));
        let live = schema(&[
            ("uIntensity", ParamValue::Float(0.3)),
            ("uRgbWeights", ParamValue::Float(9.0)),
            ("uUnbound", ParamValue::Float(7.0)),
        ]);
        let words = floats(&layout.pack(&live));
        assert_eq!(words.len(), 8);
        assert_eq!(words[0], 0.3);
        assert_eq!(&words[4..7], &[0.2, 0.7, 0.1]);
    }

    #[test]
    fn parameterless_effect_declares_nothing() {
        let layout = UniformLayout::new(&ParameterState::new());
        assert!(layout.is_empty());
        assert_eq!(layout.wgsl_declaration(), "");
    }

    #[test]
    fn declaration_lists_fields_in_order() {
        let layout = UniformLayout::new(&schema(&[
            ("uPixelSize", ParamValue::Float(10.0)),
            ("uIntensity", ParamValue::Float(1.0)),
        ]));
        let decl = layout.wgsl_declaration();
        let intensity = decl.find("uIntensity: f32").unwrap();
        let pixel = decl.find("uPixelSize: f32").unwrap();
        assert!(intensity < pixel);
        assert!(decl.contains("@group(0) @binding(3) var<uniform> params: EffectParams;"));
    }
}
