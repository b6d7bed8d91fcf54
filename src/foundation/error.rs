/// Convenience result type used across rendertask.
pub type RenderResult<T> = Result<T, RenderError>;

/// Top-level error taxonomy used by graph, optimizer and executor APIs.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// Invalid user-provided scene or configuration data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Broken structural invariant of a task graph or plan (programmer error).
    #[error("structural error: {0}")]
    Structural(String),

    /// No surface representation satisfies both sides of a task edge.
    #[error("capability error: {0}")]
    Capability(String),

    /// Surface backing memory could not be allocated.
    #[error("allocation error: {0}")]
    Allocation(String),

    /// Failure while running a task on a backend.
    #[error("execution error: {0}")]
    Execution(String),

    /// The progress callback asked to stop rendering.
    #[error("render aborted: {0}")]
    Aborted(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RenderError {
    /// Build a [`RenderError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`RenderError::Structural`] value.
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }

    /// Build a [`RenderError::Capability`] value.
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    /// Build a [`RenderError::Allocation`] value.
    pub fn allocation(msg: impl Into<String>) -> Self {
        Self::Allocation(msg.into())
    }

    /// Build a [`RenderError::Execution`] value.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Build a [`RenderError::Aborted`] value.
    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    /// Build a [`RenderError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
