use std::sync::Arc;

use super::editor::ControlState;
use super::error::EffectError;
use super::params::{ParamInput, ParamValue, ParameterState};
use super::registry::{EffectDescriptor, EffectRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Nothing chosen yet, or the last choice was not a registered id.
    Unselected,
    Effect(&'static str),
}

/// Current effect selection and its live parameters.
///
/// The host drives this from its UI thread and hands it by reference to the
/// renderer each frame. Hosts that edit from another thread should wrap it in
/// a `Mutex` so a draw never sees a half-applied update.
pub struct EffectRuntime {
    registry: Arc<EffectRegistry>,
    selection: Selection,
    active: Arc<EffectDescriptor>,
    params: ParameterState,
    params_revision: u64,
}

impl EffectRuntime {
    pub fn new(registry: Arc<EffectRegistry>) -> Self {
        let active = registry.fallback().clone();
        Self {
            registry,
            selection: Selection::Unselected,
            active,
            params: ParameterState::new(),
            params_revision: 0,
        }
    }

    /// Switch effects. Parameters always restart from the effect's defaults.
    pub fn select_effect(&mut self, id: &str) {
        let descriptor = self.registry.resolve(id).clone();
        let selection = if descriptor.id == id {
            Selection::Effect(descriptor.id)
        } else {
            Selection::Unselected
        };
        log::debug!("Selected effect '{}' ({} params)", descriptor.id, descriptor.defaults.len());

        self.params = match selection {
            Selection::Effect(_) => descriptor.defaults.clone(),
            Selection::Unselected => ParameterState::new(),
        };
        self.selection = selection;
        self.active = descriptor;
        self.params_revision += 1;
    }

    /// Replace one parameter value.
    ///
    /// Values whose shape disagrees with the active effect's default are
    /// rejected and leave the state untouched. Keys the effect does not
    /// declare are stored as given.
    pub fn set_parameter(&mut self, key: &str, value: ParamValue) -> Result<(), EffectError> {
        if let Some(default) = self.active.defaults.get(key) {
            let expected = default.shape();
            let found = value.shape();
            if expected != found {
                log::warn!(
                    "Ignoring '{}' for effect '{}': expected {}, got {}",
                    key, self.active.id, expected, found
                );
                return Err(EffectError::ShapeMismatch {
                    key: key.to_string(),
                    expected,
                    found,
                });
            }
        } else {
            log::debug!("Effect '{}' does not declare '{}', storing anyway", self.active.id, key);
        }

        self.params.insert(key, value);
        self.params_revision += 1;
        Ok(())
    }

    /// Convert a loosely typed value to the shape the active effect declares
    /// for `key`. Undeclared keys take the value's natural shape.
    pub fn coerce_input(&self, key: &str, input: ParamInput) -> Result<ParamValue, EffectError> {
        match self.active.defaults.get(key) {
            Some(default) => input.coerce(key, default.shape()),
            None => Ok(input.into_value()),
        }
    }

    /// Coerce, then set.
    pub fn set_parameter_input(&mut self, key: &str, input: ParamInput) -> Result<(), EffectError> {
        let value = self.coerce_input(key, input).inspect_err(|e| {
            log::warn!("Ignoring parameter for effect '{}': {}", self.active.id, e);
        })?;
        self.set_parameter(key, value)
    }

    /// Clamp `value` to the range of the active editor's control for `key`.
    pub fn clamp_to_editor(&self, key: &str, value: ParamValue) -> ParamValue {
        let control = self
            .active
            .editor
            .as_ref()
            .and_then(|editor| editor.controls.iter().find(|c| c.key == key));
        match control {
            Some(control) => control.clamp(&value),
            None => value,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn active(&self) -> &Arc<EffectDescriptor> {
        &self.active
    }

    pub fn shader_source(&self) -> &Arc<str> {
        &self.active.shader_source
    }

    pub fn parameters(&self) -> &ParameterState {
        &self.params
    }

    /// Bumped on every selection or parameter change.
    pub fn params_revision(&self) -> u64 {
        self.params_revision
    }

    /// Editor controls of the active effect with their current values.
    pub fn editor_view(&self) -> Vec<ControlState<'_>> {
        self.active
            .editor
            .iter()
            .flat_map(|schema| schema.controls.iter())
            .map(|control| ControlState {
                control,
                value: self.params.get(control.key),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    /// Shader changed: compile a new program and release the old one.
    Rebuild,
    /// Same program, new uniform values.
    UpdateUniforms,
    /// Nothing changed since the last draw.
    Redraw,
}

/// Remembers what the last draw used so the next one can decide between
/// recompiling and patching uniforms.
#[derive(Debug, Default)]
pub struct MaterialTracker {
    shader: Option<Arc<str>>,
    params_revision: Option<u64>,
}

impl MaterialTracker {
    pub fn plan(&self, runtime: &EffectRuntime) -> FrameAction {
        match &self.shader {
            Some(last) if Arc::ptr_eq(last, runtime.shader_source()) => {
                if self.params_revision == Some(runtime.params_revision()) {
                    FrameAction::Redraw
                } else {
                    FrameAction::UpdateUniforms
                }
            }
            _ => FrameAction::Rebuild,
        }
    }

    pub fn commit(&mut self, runtime: &EffectRuntime) {
        self.shader = Some(runtime.shader_source().clone());
        self.params_revision = Some(runtime.params_revision());
    }
}
