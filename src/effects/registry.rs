use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use super::editor::{EditorSchema, ParamControl};
use super::embedded;
use super::error::EffectError;
use super::params::{ParamValue, ParameterState};

/// Id of the pass-through effect used for unknown or unset selections.
pub const FALLBACK_EFFECT_ID: &str = "none";

/// One selectable post-processing effect.
#[derive(Debug)]
pub struct EffectDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    /// Fragment stage body; compiled after the shared header.
    pub shader_source: Arc<str>,
    pub defaults: ParameterState,
    pub editor: Option<EditorSchema>,
}

impl EffectDescriptor {
    pub fn new(id: &'static str, label: &'static str, shader_source: &str) -> Self {
        Self {
            id,
            label,
            shader_source: Arc::from(shader_source),
            defaults: ParameterState::new(),
            editor: None,
        }
    }

    pub fn with_param(mut self, key: &str, value: ParamValue) -> Self {
        self.defaults.insert(key, value);
        self
    }

    pub fn with_editor(mut self, controls: Vec<ParamControl>) -> Self {
        self.editor = Some(EditorSchema::new(controls));
        self
    }

    fn validate(&self) -> Result<(), EffectError> {
        for (key, value) in self.defaults.iter() {
            let shape = value.shape();
            if !shape.is_supported() {
                return Err(EffectError::UnsupportedShape {
                    effect: self.id.to_string(),
                    key: key.to_string(),
                    shape,
                });
            }
        }
        if let Some(editor) = &self.editor {
            for control in &editor.controls {
                if self.defaults.get(control.key).is_none() {
                    return Err(EffectError::UnknownEditorKey {
                        effect: self.id.to_string(),
                        key: control.key.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Ordered, immutable catalog of effects.
#[derive(Debug)]
pub struct EffectRegistry {
    effects: Vec<Arc<EffectDescriptor>>,
    fallback: usize,
}

impl EffectRegistry {
    pub fn new(descriptors: Vec<EffectDescriptor>) -> Result<Self, EffectError> {
        let mut seen = HashSet::new();
        for d in &descriptors {
            if !seen.insert(d.id) {
                return Err(EffectError::DuplicateEffect(d.id.to_string()));
            }
            d.validate()?;
        }

        let fallback = descriptors
            .iter()
            .position(|d| d.id == FALLBACK_EFFECT_ID && d.defaults.is_empty())
            .ok_or(EffectError::MissingFallback(FALLBACK_EFFECT_ID))?;

        Ok(Self {
            effects: descriptors.into_iter().map(Arc::new).collect(),
            fallback,
        })
    }

    /// The effects compiled into the binary, shared process-wide.
    pub fn builtin() -> Arc<EffectRegistry> {
        static BUILTIN: OnceLock<Arc<EffectRegistry>> = OnceLock::new();
        BUILTIN
            .get_or_init(|| {
                Arc::new(
                    EffectRegistry::new(builtin_descriptors())
                        .expect("built-in effect table is valid"),
                )
            })
            .clone()
    }

    pub fn list_effects(&self) -> &[Arc<EffectDescriptor>] {
        &self.effects
    }

    pub fn find_effect(&self, id: &str) -> Option<&Arc<EffectDescriptor>> {
        self.effects.iter().find(|d| d.id == id)
    }

    pub fn fallback(&self) -> &Arc<EffectDescriptor> {
        &self.effects[self.fallback]
    }

    /// Look up `id`, degrading to the pass-through effect.
    pub fn resolve(&self, id: &str) -> &Arc<EffectDescriptor> {
        self.find_effect(id).unwrap_or_else(|| {
            log::debug!("Unknown effect '{}', using pass-through", id);
            self.fallback()
        })
    }
}

fn intensity(max: f32, step: f32) -> ParamControl {
    ParamControl::slider("uIntensity", "Intensity", 0.0, max, step)
}

fn builtin_descriptors() -> Vec<EffectDescriptor> {
    use ParamValue::{Float, Vector};

    vec![
        EffectDescriptor::new(FALLBACK_EFFECT_ID, "No effect", embedded::PLAIN_TEXTURE),
        EffectDescriptor::new("boxBlur", "Box Blur", embedded::BOX_BLUR)
            .with_param("uIntensity", Float(2.0))
            .with_editor(vec![ParamControl::slider("uIntensity", "Radius", 0.0, 8.0, 1.0)]),
        EffectDescriptor::new("gaussianBlur", "Gaussian Blur", embedded::GAUSSIAN_BLUR)
            .with_param("uIntensity", Float(2.0))
            .with_editor(vec![ParamControl::slider("uIntensity", "Sigma", 0.0, 4.0, 0.1)]),
        EffectDescriptor::new("grayscale", "Grayscale", embedded::GRAYSCALE)
            .with_param("uIntensity", Float(1.0))
            .with_param("uRgbWeights", Vector(vec![0.2126, 0.7152, 0.0722]))
            .with_editor(vec![
                intensity(1.0, 0.01),
                ParamControl::vector("uRgbWeights", "RGB weights", 0.0, 1.0, 0.0001),
            ]),
        EffectDescriptor::new("invert", "Invert", embedded::INVERT),
        EffectDescriptor::new("sepia", "Sepia", embedded::SEPIA)
            .with_param("uIntensity", Float(1.0))
            .with_editor(vec![intensity(1.0, 0.01)]),
        EffectDescriptor::new("sharpenFilter", "Sharpen Filter", embedded::SHARPEN_FILTER)
            .with_param("uIntensity", Float(1.0))
            .with_editor(vec![intensity(5.0, 0.1)]),
        EffectDescriptor::new("prewittOperator", "Prewitt Operator", embedded::PREWITT_OPERATOR)
            .with_param("uIntensity", Float(1.0))
            .with_editor(vec![intensity(5.0, 0.1)]),
        EffectDescriptor::new("sobelFilter", "Sobel Filter", embedded::SOBEL_FILTER)
            .with_param("uIntensity", Float(1.0))
            .with_editor(vec![intensity(5.0, 0.1)]),
        EffectDescriptor::new("vignette", "Vignette", embedded::VIGNETTE)
            .with_param("uEdgeStart", Float(0.7))
            .with_param("uEdgeEnd", Float(0.0))
            .with_param("uIntensity", Float(1.0))
            .with_param("uColor", Vector(vec![0.0, 0.0, 0.0]))
            .with_editor(vec![
                ParamControl::slider("uEdgeStart", "Edge start", 0.0, 1.5, 0.01),
                ParamControl::slider("uEdgeEnd", "Edge end", 0.0, 1.5, 0.01),
                intensity(1.0, 0.01),
                ParamControl::color("uColor", "Color"),
            ]),
        EffectDescriptor::new("pixelateFilter", "Pixelate Filter", embedded::PIXELATE_FILTER)
            .with_param("uPixelSize", Float(10.0))
            .with_param("uIntensity", Float(1.0))
            .with_editor(vec![
                ParamControl::slider("uPixelSize", "Pixel size", 1.0, 64.0, 1.0),
                intensity(1.0, 0.01),
            ]),
    ]
}
