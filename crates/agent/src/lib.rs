//! Query orchestration on top of the capability registry and the pipeline
//! engine.
//!
//! This crate provides:
//! - `DecisionService` and `ArgumentFiller`, the two model-backed seams
//! - `OpenAiChatClient`, a chat-completions client, and prompt builders
//! - `Agent`, which resolves and executes a query end to end
//! - `AgentConfig`, loaded from JSON

mod agent;
mod config;
mod error;
mod llm;
pub mod prompt_builder;
mod service;

pub use agent::{Agent, Diagnostic, DiagnosticKind, QueryOutcome};
pub use config::{
    AgentConfig, ExecutorSettings, LlmConfig, DEFAULT_API_KEY_ENV, DEFAULT_ENDPOINT,
    DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT_SECS,
};
pub use error::{ConfigError, ServiceError, ServiceResult};
pub use llm::{ChatModel, LlmArgumentFiller, LlmDecisionService, OpenAiChatClient};
pub use service::{
    ArgumentFiller, DecisionRequest, DecisionService, FillRequest, FixedResponse, SelectionMode,
};
