//! Agent configuration.
//!
//! Loaded from a JSON file. Every field is optional; missing fields take
//! their defaults. Looks in:
//! 1. An explicit path, when given
//! 2. User config: <config_dir>/autoclass/config.json

use std::path::{Path, PathBuf};
use std::time::Duration;

use autoclass_pipeline::ExecutorConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::service::SelectionMode;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub llm: LlmConfig,
    pub executor: ExecutorSettings,
    pub selection_mode: SelectionMode,
}

/// Chat-completion endpoint settings shared by both services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Timeout for one service round trip.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    pub parallel: bool,
    pub invoke_timeout_secs: Option<u64>,
}

impl From<&ExecutorSettings> for ExecutorConfig {
    fn from(settings: &ExecutorSettings) -> Self {
        ExecutorConfig {
            parallel: settings.parallel,
            invoke_timeout: settings.invoke_timeout_secs.map(Duration::from_secs),
        }
    }
}

impl AgentConfig {
    /// Load from `path`, or from the user config file if it exists, or fall
    /// back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load_from(&path),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: AgentConfig = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate(path)?;
        info!(path = %path.display(), model = %config.llm.model, "Loaded agent config");
        Ok(config)
    }

    /// `<config_dir>/autoclass/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("autoclass").join("config.json"))
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::from(&self.executor)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::Validation {
            path: path.to_path_buf(),
            message: message.to_string(),
        };

        if self.llm.model.trim().is_empty() {
            return Err(invalid("llm.model must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(invalid("llm.temperature must be between 0 and 2"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(invalid("llm.timeout_secs must be positive"));
        }
        if self.executor.invoke_timeout_secs == Some(0) {
            return Err(invalid("executor.invoke_timeout_secs must be positive"));
        }
        Ok(())
    }
}
