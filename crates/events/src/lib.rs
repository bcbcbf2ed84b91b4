//! Shared event contracts for pipeline observers.
//!
//! Defines the DTOs for events that flow from the agent and the executor to
//! whoever is watching (CLI, dashboard, tests). Using shared types prevents
//! mismatched field names between producers and consumers.
//!
//! Also provides the `EventBus` trait for decoupled event emission.

mod bus;

pub use bus::{EmittedEvent, EventBus, EventBusRef, InMemoryEventBus, NullEventBus, TracingEventBus};

use serde::{Deserialize, Serialize};

/// Emitted when a model response could not be used and the agent degraded.
///
/// Producers: agent
/// Consumers: frontend, CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineWarningEvent {
    /// Query run identifier.
    pub run_id: String,
    /// Machine-readable warning kind (e.g. "decision_service").
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Timestamp in milliseconds since epoch.
    pub ts_ms: i64,
}

/// Emitted right before a node is invoked.
///
/// Producers: executor
/// Consumers: frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStartedEvent {
    #[serde(default)]
    pub run_id: Option<String>,
    /// Node identifier (`ClassName.method_name`).
    pub node: String,
    /// Arguments after reference substitution.
    pub args: serde_json::Value,
    pub ts_ms: i64,
}

/// Emitted once per node with its final status.
///
/// Producers: executor
/// Consumers: frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeFinishedEvent {
    #[serde(default)]
    pub run_id: Option<String>,
    pub node: String,
    /// One of "ok", "error", "skipped".
    pub status: String,
    /// Result value or failure detail.
    pub detail: serde_json::Value,
    pub ts_ms: i64,
}

/// Emitted when a query run completes, whatever its outcome.
///
/// Producers: agent
/// Consumers: frontend, CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryFinishedEvent {
    pub run_id: String,
    pub query: String,
    pub ok: usize,
    pub failed: usize,
    pub skipped: usize,
    pub warnings: usize,
    pub duration_ms: u64,
}

/// Event names as constants to prevent typos.
pub mod event_names {
    /// A service response was unusable; the agent degraded.
    pub const PIPELINE_WARNING: &str = "pipeline:warning";
    /// Node invocation is about to start.
    pub const NODE_STARTED: &str = "pipeline:node_started";
    /// Node reached its final status.
    pub const NODE_FINISHED: &str = "pipeline:node_finished";
    /// Whole query run finished.
    pub const QUERY_FINISHED: &str = "pipeline:query_finished";
}

/// Serialize an event DTO and emit it on the bus.
pub fn emit_event<T: Serialize>(bus: &dyn EventBus, topic: &str, event: &T) {
    match serde_json::to_value(event) {
        Ok(payload) => bus.emit(topic, payload),
        Err(e) => tracing::warn!(topic, error = %e, "Failed to serialize event"),
    }
}

/// Generate a fresh identifier for a query run.
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time in milliseconds since epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
