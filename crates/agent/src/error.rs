//! Error types for the agent crate.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure talking to a decision or argument-filling service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("service did not answer within {0:?}")]
    Timeout(Duration),

    #[error("service returned an empty response")]
    Empty,

    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure loading an agent configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration in {path}: {message}")]
    Validation { path: PathBuf, message: String },
}
