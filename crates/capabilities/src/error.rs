//! Error types for capability invocation.

use thiserror::Error;

/// Result type for capability invocations.
pub type InvokeResult<T> = Result<T, InvokeError>;

/// Errors a provider can return from `Capability::invoke`.
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The provider does not declare this method.
    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    /// A named argument the method needs was not supplied.
    #[error("missing required argument: {0}")]
    MissingArg(String),

    /// An argument was supplied with an unusable value.
    #[error("invalid argument: {field} - {reason}")]
    InvalidArg { field: String, reason: String },

    /// The method ran and failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InvokeError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArg {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::ExecutionFailed(message.into())
    }
}
