use serde::Serialize;

use super::params::ParamValue;

/// Control set a host UI renders for one effect's parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorSchema {
    pub controls: Vec<ParamControl>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamControl {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ControlKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    Slider { min: f32, max: f32, step: f32 },
    /// One slider per component.
    Vector { min: f32, max: f32, step: f32 },
    /// RGB in 0..1.
    Color,
}

/// A control paired with the value currently bound to it.
#[derive(Debug, Clone, Serialize)]
pub struct ControlState<'a> {
    #[serde(flatten)]
    pub control: &'a ParamControl,
    pub value: Option<&'a ParamValue>,
}

impl EditorSchema {
    pub fn new(controls: Vec<ParamControl>) -> Self {
        Self { controls }
    }
}

impl ParamControl {
    pub fn slider(key: &'static str, label: &'static str, min: f32, max: f32, step: f32) -> Self {
        Self { key, label, kind: ControlKind::Slider { min, max, step } }
    }

    pub fn vector(key: &'static str, label: &'static str, min: f32, max: f32, step: f32) -> Self {
        Self { key, label, kind: ControlKind::Vector { min, max, step } }
    }

    pub fn color(key: &'static str, label: &'static str) -> Self {
        Self { key, label, kind: ControlKind::Color }
    }

    /// Clamp every component of `value` into this control's range.
    pub fn clamp(&self, value: &ParamValue) -> ParamValue {
        let (min, max) = match self.kind {
            ControlKind::Slider { min, max, .. } | ControlKind::Vector { min, max, .. } => (min, max),
            ControlKind::Color => (0.0, 1.0),
        };
        match value {
            ParamValue::Float(v) => ParamValue::Float(v.clamp(min, max)),
            ParamValue::Vector(v) => ParamValue::Vector(v.iter().map(|c| c.clamp(min, max)).collect()),
            ParamValue::Array(v) => ParamValue::Array(v.iter().map(|c| c.clamp(min, max)).collect()),
        }
    }
}
