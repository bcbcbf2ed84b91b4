//! Service seams: the decision service picks capabilities for a query, the
//! argument filler populates a pruned pipeline. Both answer with raw text;
//! parsing and validation happen in the agent.

use async_trait::async_trait;
use autoclass_capabilities::Catalog;
use autoclass_pipeline::PipelineDescriptor;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// What the decision service is asked to select.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Classes and, per class, the relevant methods.
    #[default]
    ClassMethod,
    /// Whole classes only.
    ClassOnly,
}

#[derive(Debug, Clone, Copy)]
pub struct DecisionRequest<'a> {
    pub query: &'a str,
    pub catalog: &'a Catalog,
    pub mode: SelectionMode,
}

#[derive(Debug, Clone, Copy)]
pub struct FillRequest<'a> {
    pub query: &'a str,
    pub pipeline: &'a PipelineDescriptor,
}

#[async_trait]
pub trait DecisionService: Send + Sync {
    async fn decide(&self, request: &DecisionRequest<'_>) -> ServiceResult<String>;
}

#[async_trait]
pub trait ArgumentFiller: Send + Sync {
    async fn fill(&self, request: &FillRequest<'_>) -> ServiceResult<String>;
}

/// Answers every request with the same text. Used for offline runs and tests.
#[derive(Debug, Clone)]
pub struct FixedResponse {
    text: String,
}

impl FixedResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    fn respond(&self) -> ServiceResult<String> {
        if self.text.trim().is_empty() {
            return Err(ServiceError::Empty);
        }
        Ok(self.text.clone())
    }
}

#[async_trait]
impl DecisionService for FixedResponse {
    async fn decide(&self, _request: &DecisionRequest<'_>) -> ServiceResult<String> {
        self.respond()
    }
}

#[async_trait]
impl ArgumentFiller for FixedResponse {
    async fn fill(&self, _request: &FillRequest<'_>) -> ServiceResult<String> {
        self.respond()
    }
}
