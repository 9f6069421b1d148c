use std::fmt::Display;

/// Failure of an async task's operation, captured as data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TaskError {
    message: String,
}

impl TaskError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Captures any displayable error from an operation.
    pub fn failed(err: impl Display) -> Self {
        Self::new(err.to_string())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error("surface '{0}' has been disposed")]
    Disposed(String),
    #[error("surface '{0}' is already composing")]
    Reentrant(String),
}
