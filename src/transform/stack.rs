use std::fmt;
use std::sync::Arc;

use crate::foundation::core::Point;
use crate::transform::transformation::{Transformation, TransformedPoint};

/// Shared handle to a transformation stage.
pub type TransformationRef = Arc<dyn Transformation>;

/// Listener called after every effective mutation of a [`TransformationStack`].
pub type ChangeListener = Arc<dyn Fn() + Send + Sync>;

/// How [`TransformationStack::insert`] treats the requested index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPolicy {
    /// Any index below the current count is moved to the end, so every insertion appends.
    /// This mirrors the long-standing observable behaviour of layer transformation stacks.
    #[default]
    Append,
    /// Insert at the requested index, clamped to `[0, count]`.
    Clamp,
}

/// Ordered chain of transformations applied first to last.
#[derive(Clone, Default)]
pub struct TransformationStack {
    stages: Vec<TransformationRef>,
    policy: InsertPolicy,
    listeners: Vec<ChangeListener>,
}

impl fmt::Debug for TransformationStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformationStack")
            .field("stages", &self.stages)
            .field("policy", &self.policy)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl TransformationStack {
    /// Empty stack with the default insert policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty stack with an explicit insert policy.
    pub fn with_policy(policy: InsertPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Insert policy in effect.
    pub fn policy(&self) -> InsertPolicy {
        self.policy
    }

    /// Register a change listener.
    pub fn on_changed(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }

    /// Number of stages.
    pub fn get_count(&self) -> usize {
        self.stages.len()
    }

    /// `true` when the stack has no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage at `index`.
    pub fn get(&self, index: usize) -> Option<&TransformationRef> {
        self.stages.get(index)
    }

    /// Iterate stages in application order.
    pub fn iter(&self) -> impl Iterator<Item = &TransformationRef> {
        self.stages.iter()
    }

    /// Map `p` through every stage in order.
    pub fn transform(&self, p: Point) -> TransformedPoint {
        let mut out = TransformedPoint::new(p);
        for stage in &self.stages {
            let step = stage.transform(out.p);
            out.p = step.p;
            out.depth += step.depth;
            out.visible &= step.visible;
        }
        out
    }

    /// Insert a stage. `None` is ignored. See [`InsertPolicy`] for index handling.
    pub fn insert(&mut self, index: usize, transformation: Option<TransformationRef>) {
        let Some(t) = transformation else {
            return;
        };
        let count = self.get_count();
        let index = match self.policy {
            InsertPolicy::Append => {
                if index < count {
                    count
                } else {
                    index.min(count)
                }
            }
            InsertPolicy::Clamp => index.min(count),
        };
        self.stages.insert(index, t);
        self.notify();
    }

    /// Append a stage.
    pub fn push(&mut self, transformation: TransformationRef) {
        let count = self.get_count();
        self.insert(count, Some(transformation));
    }

    /// Remove the stage at `index`; returns it when the index was in range.
    pub fn remove(&mut self, index: usize) -> Option<TransformationRef> {
        if index >= self.stages.len() {
            return None;
        }
        let removed = self.stages.remove(index);
        self.notify();
        Some(removed)
    }

    /// Remove every occurrence of `transformation` (compared by identity). Returns the number of
    /// removed stages.
    pub fn remove_value(&mut self, transformation: &TransformationRef) -> usize {
        let before = self.stages.len();
        self.stages.retain(|s| !Arc::ptr_eq(s, transformation));
        let removed = before - self.stages.len();
        if removed > 0 {
            self.notify();
        }
        removed
    }

    /// Remove all stages.
    pub fn clear(&mut self) {
        if self.stages.is_empty() {
            return;
        }
        self.stages.clear();
        self.notify();
    }

    fn notify(&self) {
        for l in &self.listeners {
            l();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/transform/stack.rs"]
mod tests;
