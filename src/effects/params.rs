use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::error::EffectError;

/// A uniform value as the shader sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Float(f32),
    /// `vec2`..`vec4` depending on length.
    Vector(Vec<f32>),
    /// `array<vec4<f32>, N>`, one float per element in `.x`.
    Array(Vec<f32>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    Float,
    Vector(usize),
    Array(usize),
}

impl fmt::Display for ParamShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamShape::Float => write!(f, "f32"),
            ParamShape::Vector(n) => write!(f, "vec{}<f32>", n),
            ParamShape::Array(n) => write!(f, "array<f32, {}>", n),
        }
    }
}

impl ParamValue {
    pub fn shape(&self) -> ParamShape {
        match self {
            ParamValue::Float(_) => ParamShape::Float,
            ParamValue::Vector(v) => ParamShape::Vector(v.len()),
            ParamValue::Array(v) => ParamShape::Array(v.len()),
        }
    }

    pub fn components(&self) -> &[f32] {
        match self {
            ParamValue::Float(v) => std::slice::from_ref(v),
            ParamValue::Vector(v) | ParamValue::Array(v) => v,
        }
    }
}

impl ParamShape {
    /// Shapes the uniform packer knows how to lay out.
    pub fn is_supported(&self) -> bool {
        match *self {
            ParamShape::Float => true,
            ParamShape::Vector(n) => (2..=4).contains(&n),
            ParamShape::Array(n) => n >= 1,
        }
    }
}

/// A loosely typed value coming from the command line or a config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamInput {
    Scalar(f32),
    List(Vec<f32>),
}

impl ParamInput {
    /// Parse `0.5` or `1,0.5,0`.
    pub fn parse(text: &str) -> Result<Self, EffectError> {
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        let values: Vec<f32> = parts
            .iter()
            .map(|p| p.parse::<f32>())
            .collect::<Result<_, _>>()
            .map_err(|_| EffectError::InvalidInput(text.to_string()))?;
        match values.as_slice() {
            [single] if parts.len() == 1 => Ok(ParamInput::Scalar(*single)),
            [] => Err(EffectError::InvalidInput(text.to_string())),
            _ => Ok(ParamInput::List(values)),
        }
    }

    /// Convert into a value of the given shape.
    pub fn coerce(self, key: &str, shape: ParamShape) -> Result<ParamValue, EffectError> {
        let found = self.natural_shape();
        let mismatch = || EffectError::ShapeMismatch {
            key: key.to_string(),
            expected: shape,
            found,
        };
        match (self, shape) {
            (ParamInput::Scalar(v), ParamShape::Float) => Ok(ParamValue::Float(v)),
            (ParamInput::List(v), ParamShape::Vector(n)) if v.len() == n => {
                Ok(ParamValue::Vector(v))
            }
            (ParamInput::List(v), ParamShape::Array(n)) if v.len() == n => {
                Ok(ParamValue::Array(v))
            }
            (ParamInput::Scalar(v), ParamShape::Array(1)) => Ok(ParamValue::Array(vec![v])),
            _ => Err(mismatch()),
        }
    }

    /// The value this input becomes when there is no declared shape to follow.
    pub fn into_value(self) -> ParamValue {
        match self {
            ParamInput::Scalar(v) => ParamValue::Float(v),
            ParamInput::List(v) if (2..=4).contains(&v.len()) => ParamValue::Vector(v),
            ParamInput::List(v) => ParamValue::Array(v),
        }
    }

    fn natural_shape(&self) -> ParamShape {
        match self {
            ParamInput::Scalar(_) => ParamShape::Float,
            ParamInput::List(v) => ParamShape::Vector(v.len()),
        }
    }
}

/// Live uniform values keyed by uniform name, iterated in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterState {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    /// Replace one entry, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.values.insert(key.into(), value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, ParamValue)> for ParameterState {
    fn from_iter<I: IntoIterator<Item = (K, ParamValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalar_and_list() {
        assert_eq!(ParamInput::parse("0.5").unwrap(), ParamInput::Scalar(0.5));
        assert_eq!(
            ParamInput::parse("1, 0.5,0").unwrap(),
            ParamInput::List(vec![1.0, 0.5, 0.0])
        );
        assert!(ParamInput::parse("abc").is_err());
        assert!(ParamInput::parse("1,,2").is_err());
    }

    #[test]
    fn coerces_to_declared_shape() {
        let v = ParamInput::List(vec![1.0, 0.0, 0.0])
            .coerce("uColor", ParamShape::Vector(3))
            .unwrap();
        assert_eq!(v, ParamValue::Vector(vec![1.0, 0.0, 0.0]));

        let err = ParamInput::Scalar(1.0)
            .coerce("uColor", ParamShape::Vector(3))
            .unwrap_err();
        assert_eq!(
            err,
            EffectError::ShapeMismatch {
                key: "uColor".into(),
                expected: ParamShape::Vector(3),
                found: ParamShape::Float,
            }
        );
    }

    #[test]
    fn wrong_length_list_is_rejected() {
        assert!(ParamInput::List(vec![1.0, 2.0])
            .coerce("uRgbWeights", ParamShape::Vector(3))
            .is_err());
    }

    #[test]
    fn state_iterates_in_key_order() {
        let state: ParameterState = [
            ("uIntensity", ParamValue::Float(1.0)),
            ("uColor", ParamValue::Vector(vec![0.0, 0.0, 0.0])),
        ]
        .into_iter()
        .collect();
        let keys: Vec<&str> = state.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["uColor", "uIntensity"]);
    }

    #[test]
    fn vector_width_support() {
        assert!(ParamShape::Vector(3).is_supported());
        assert!(!ParamShape::Vector(5).is_supported());
        assert!(!ParamShape::Array(0).is_supported());
    }
}
