//! Per-node execution results.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{FailureKind, PipelineError};

/// Final status of one pipeline node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NodeOutcome {
    Ok { value: Value },
    Error { kind: FailureKind, error: String },
    Skipped { reason: String },
}

impl NodeOutcome {
    pub fn failed(err: &PipelineError) -> Self {
        Self::Error {
            kind: err.kind(),
            error: err.to_string(),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Ok { value } => Some(value),
            _ => None,
        }
    }

    /// Status label as it appears in the serialized report.
    pub fn status(&self) -> &'static str {
        match self {
            Self::Ok { .. } => "ok",
            Self::Error { .. } => "error",
            Self::Skipped { .. } => "skipped",
        }
    }

    /// The value, error message or skip reason.
    pub fn detail(&self) -> Value {
        match self {
            Self::Ok { value } => value.clone(),
            Self::Error { error, .. } => Value::String(error.clone()),
            Self::Skipped { reason } => Value::String(reason.clone()),
        }
    }
}

/// Node identifier to outcome, for every node of a pipeline.
///
/// Serializes as a plain JSON object keyed by identifier. The order in which
/// nodes actually ran is kept separately and not serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionReport {
    outcomes: BTreeMap<String, NodeOutcome>,
    #[serde(skip)]
    execution_order: Vec<String>,
}

impl ExecutionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: &str) -> Option<&NodeOutcome> {
        self.outcomes.get(node)
    }

    pub fn outcomes(&self) -> &BTreeMap<String, NodeOutcome> {
        &self.outcomes
    }

    /// Nodes that were invoked, in invocation order.
    pub fn execution_order(&self) -> &[String] {
        &self.execution_order
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn ok_count(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Ok { .. }))
    }

    pub fn error_count(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Error { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Skipped { .. }))
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Default::default()))
    }

    pub(crate) fn record(&mut self, node: impl Into<String>, outcome: NodeOutcome) {
        self.outcomes.insert(node.into(), outcome);
    }

    pub(crate) fn mark_started(&mut self, node: &str) {
        self.execution_order.push(node.to_string());
    }

    fn count(&self, pred: impl Fn(&NodeOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }
}
