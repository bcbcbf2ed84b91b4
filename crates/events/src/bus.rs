//! Sinks for pipeline progress events.
//!
//! The agent emits query-level events (`pipeline:warning`,
//! `pipeline:query_finished`) and the executor emits one
//! `pipeline:node_started` / `pipeline:node_finished` pair per invoked node.
//! Neither knows where the events end up: the CLI logs them, tests record
//! them, and library callers that pass nothing get them dropped.

use std::sync::{Arc, Mutex, MutexGuard};

/// Receiver of progress events.
pub trait EventBus: Send + Sync {
    /// Deliver one event. `topic` is one of the `event_names` constants and
    /// `payload` the serialized event struct.
    fn emit(&self, topic: &str, payload: serde_json::Value);
}

/// Shared handle held by the agent and the executor.
pub type EventBusRef = Arc<dyn EventBus>;

/// One recorded event.
#[derive(Debug, Clone)]
pub struct EmittedEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Records every event in emission order.
///
/// Tests use it to check which nodes ran, in what order, and what the final
/// query summary said.
#[derive(Default)]
pub struct InMemoryEventBus {
    recorded: Mutex<Vec<EmittedEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EmittedEvent> {
        self.recorded().clone()
    }

    /// Recorded events with the given topic, oldest first.
    pub fn events_for(&self, topic: &str) -> Vec<EmittedEvent> {
        self.recorded()
            .iter()
            .filter(|e| e.topic == topic)
            .cloned()
            .collect()
    }

    /// Topics in emission order.
    pub fn topics(&self) -> Vec<String> {
        self.recorded().iter().map(|e| e.topic.clone()).collect()
    }

    pub fn clear(&self) {
        self.recorded().clear();
    }

    pub fn len(&self) -> usize {
        self.recorded().len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded().is_empty()
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<EmittedEvent>> {
        // A panicking provider may poison the lock mid-run; the log stays usable.
        self.recorded.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventBus for InMemoryEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.recorded().push(EmittedEvent {
            topic: topic.to_string(),
            payload,
        });
    }
}

/// Drops everything. Default for `Agent` and `Executor`.
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _topic: &str, _payload: serde_json::Value) {}
}

/// Writes each event to the `tracing` log at debug level.
///
/// The CLI installs this one, so `RUST_LOG=autoclass_events=debug` shows
/// per-node progress next to the rest of the log.
pub struct TracingEventBus;

impl EventBus for TracingEventBus {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        tracing::debug!(topic, %payload, "event");
    }
}
