pub mod editor;
pub mod embedded;
pub mod error;
pub mod params;
pub mod registry;
pub mod runtime;

pub use params::{ParamInput, ParameterState};
pub use registry::{EffectDescriptor, EffectRegistry};
pub use runtime::{EffectRuntime, FrameAction, MaterialTracker, Selection};
