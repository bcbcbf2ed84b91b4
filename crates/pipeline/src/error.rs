//! Error types for pipeline resolution and execution.

use autoclass_capabilities::InvokeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single pipeline node. Never aborts sibling nodes.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Two calls in one pipeline share an identifier; none of them runs.
    #[error("duplicate node identifier '{0}'")]
    DuplicateNode(String),

    /// The provider does not declare the method.
    #[error("unknown method '{method}' on class '{class_name}'")]
    UnknownMethod { class_name: String, method: String },

    /// No provider is registered under the class name.
    #[error("no capability registered for class '{0}'")]
    MissingRegistration(String),

    /// The node sits on a reference cycle.
    #[error("dependency cycle between {}", .members.join(", "))]
    DependencyCycle { members: Vec<String> },

    /// A referenced node has no result yet.
    #[error("dependency '{0}' has not been computed")]
    DependencyUnavailable(String),

    /// The provider returned an error.
    #[error("invocation failed: {0}")]
    Invocation(#[from] InvokeError),

    /// The provider panicked during invocation.
    #[error("invocation panicked: {0}")]
    Panicked(String),

    #[error("invocation timed out after {0:?}")]
    Timeout(Duration),
}

/// Serializable classification of a node failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Structure,
    MissingRegistration,
    Cycle,
    Dependency,
    Invocation,
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::DuplicateNode(_) | Self::UnknownMethod { .. } => FailureKind::Structure,
            Self::MissingRegistration(_) => FailureKind::MissingRegistration,
            Self::DependencyCycle { .. } => FailureKind::Cycle,
            Self::DependencyUnavailable(_) => FailureKind::Dependency,
            Self::Invocation(_) | Self::Panicked(_) | Self::Timeout(_) => FailureKind::Invocation,
        }
    }
}

/// A model response that could not be turned into the expected structure.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response is empty")]
    Empty,

    #[error("response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("unexpected response shape: {0}")]
    UnexpectedShape(String),

    #[error("response structure differs from the request: {0}")]
    StructureDrift(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_members() {
        let err = PipelineError::DependencyCycle {
            members: vec!["A.f".to_string(), "B.g".to_string()],
        };
        assert_eq!(err.to_string(), "dependency cycle between A.f, B.g");
        assert_eq!(err.kind(), FailureKind::Cycle);
    }

    #[test]
    fn test_invoke_error_converts() {
        let err: PipelineError = InvokeError::MissingArg("a".to_string()).into();
        assert_eq!(err.kind(), FailureKind::Invocation);
        assert!(err.to_string().contains("missing required argument: a"));
    }
}
