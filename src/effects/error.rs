use thiserror::Error;

use super::params::ParamShape;

#[derive(Debug, Error, PartialEq)]
pub enum EffectError {
    #[error("parameter '{key}' expects {expected}, got {found}")]
    ShapeMismatch {
        key: String,
        expected: ParamShape,
        found: ParamShape,
    },

    #[error("effect id '{0}' is registered more than once")]
    DuplicateEffect(String),

    #[error("registry has no parameterless '{0}' fallback effect")]
    MissingFallback(&'static str),

    #[error("effect '{effect}': parameter '{key}' has unsupported shape {shape}")]
    UnsupportedShape {
        effect: String,
        key: String,
        shape: ParamShape,
    },

    #[error("effect '{effect}': editor control '{key}' has no default value")]
    UnknownEditorKey { effect: String, key: String },

    #[error("cannot parse parameter value '{0}'")]
    InvalidInput(String),
}
