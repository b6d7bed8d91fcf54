//! Undoable edits of a [`Scene`].
//!
//! Rendering is stateless: every edit produces a new scene snapshot that can be planned and
//! rendered again. Actions are looked up by name in an [`ActionRegistry`] and applied through an
//! [`ActionHistory`] that keeps the undo and redo stacks.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::foundation::error::{RenderError, RenderResult};
use crate::scene::Scene;

/// An edit that can be applied to a scene and reverted.
pub trait Action: fmt::Debug + Send {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Apply the edit. On error the scene is left unchanged.
    fn perform(&mut self, scene: &mut Scene) -> RenderResult<()>;

    /// Revert a previous [`Action::perform`].
    fn undo(&mut self, scene: &mut Scene) -> RenderResult<()>;
}

/// Replace the scene value at a JSON pointer, e.g. `/root/child/amount`.
#[derive(Clone, Debug, PartialEq)]
pub struct SetParam {
    pointer: String,
    value: Value,
    previous: Option<Value>,
}

impl SetParam {
    /// Edit setting `pointer` to `value`.
    pub fn new(pointer: impl Into<String>, value: Value) -> Self {
        Self {
            pointer: pointer.into(),
            value,
            previous: None,
        }
    }

    /// Target location.
    pub fn pointer(&self) -> &str {
        &self.pointer
    }

    fn swap(&self, scene: &mut Scene, value: Value) -> RenderResult<Value> {
        let mut doc =
            serde_json::to_value(&*scene).map_err(|e| RenderError::serde(e.to_string()))?;
        let slot = doc.pointer_mut(&self.pointer).ok_or_else(|| {
            RenderError::validation(format!("scene has no parameter at '{}'", self.pointer))
        })?;
        let old = std::mem::replace(slot, value);
        let next: Scene = serde_json::from_value(doc).map_err(|e| {
            RenderError::validation(format!("set '{}': {e}", self.pointer))
        })?;
        next.validate()?;
        *scene = next;
        Ok(old)
    }
}

impl Action for SetParam {
    fn name(&self) -> &'static str {
        "set_param"
    }

    fn perform(&mut self, scene: &mut Scene) -> RenderResult<()> {
        let old = self.swap(scene, self.value.clone())?;
        tracing::debug!(pointer = %self.pointer, "parameter set");
        self.previous = Some(old);
        Ok(())
    }

    fn undo(&mut self, scene: &mut Scene) -> RenderResult<()> {
        let old = self.previous.take().ok_or_else(|| {
            RenderError::structural(format!("undo of '{}' before perform", self.pointer))
        })?;
        if let Err(e) = self.swap(scene, old.clone()) {
            self.previous = Some(old);
            return Err(e);
        }
        Ok(())
    }
}

/// Builds an action from JSON parameters.
pub type ActionFactory = Box<dyn Fn(&Value) -> RenderResult<Box<dyn Action>> + Send + Sync>;

/// Name to factory map of available actions.
pub struct ActionRegistry {
    factories: BTreeMap<String, ActionFactory>,
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[derive(Deserialize)]
struct SetParamArgs {
    pointer: String,
    value: Value,
}

impl ActionRegistry {
    /// Registry without actions.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the built-in `set_param` action (`{"pointer": .., "value": ..}`).
    pub fn with_builtin() -> Self {
        let mut r = Self::new();
        r.register(
            "set_param",
            Box::new(|params: &Value| -> RenderResult<Box<dyn Action>> {
                let args = SetParamArgs::deserialize(params).map_err(|e| {
                    RenderError::validation(format!("set_param parameters: {e}"))
                })?;
                Ok(Box::new(SetParam::new(args.pointer, args.value)))
            }),
        );
        r
    }

    /// Register `factory` under `name`; returns `true` if an earlier factory was replaced.
    pub fn register(&mut self, name: impl Into<String>, factory: ActionFactory) -> bool {
        self.factories.insert(name.into(), factory).is_some()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Instantiate the action registered as `name`.
    pub fn create(&self, name: &str, params: &Value) -> RenderResult<Box<dyn Action>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| RenderError::validation(format!("unknown action '{name}'")))?;
        factory(params)
    }
}

/// Undo and redo stacks of performed actions.
#[derive(Debug, Default)]
pub struct ActionHistory {
    undo: Vec<Box<dyn Action>>,
    redo: Vec<Box<dyn Action>>,
}

impl ActionHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Perform `action` and record it; clears the redo stack.
    pub fn perform(&mut self, mut action: Box<dyn Action>, scene: &mut Scene) -> RenderResult<()> {
        action.perform(scene)?;
        self.undo.push(action);
        self.redo.clear();
        Ok(())
    }

    /// Undo the latest action. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, scene: &mut Scene) -> RenderResult<bool> {
        let Some(mut action) = self.undo.pop() else {
            return Ok(false);
        };
        if let Err(e) = action.undo(scene) {
            self.undo.push(action);
            return Err(e);
        }
        self.redo.push(action);
        Ok(true)
    }

    /// Perform the latest undone action again. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self, scene: &mut Scene) -> RenderResult<bool> {
        let Some(mut action) = self.redo.pop() else {
            return Ok(false);
        };
        if let Err(e) = action.perform(scene) {
            self.redo.push(action);
            return Err(e);
        }
        self.undo.push(action);
        Ok(true)
    }

    /// `true` when [`ActionHistory::undo`] would do something.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// `true` when [`ActionHistory::redo`] would do something.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Forget both stacks.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
#[path = "../tests/unit/action.rs"]
mod tests;
