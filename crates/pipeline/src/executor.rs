//! Dependency-ordered pipeline execution.
//!
//! Every node of the pipeline ends up in the report exactly once. A node's
//! failure only affects the nodes that transitively reference it; everything
//! else still runs.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use autoclass_capabilities::{Args, Capability, CapabilityRegistry};
use autoclass_events::{
    emit_event, event_names, now_ms, EventBusRef, NodeFinishedEvent, NodeStartedEvent,
    NullEventBus,
};
use futures::future::join_all;
use futures::FutureExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::descriptor::PipelineDescriptor;
use crate::error::PipelineError;
use crate::graph::{CallGraph, CallNode};
use crate::report::{ExecutionReport, NodeOutcome};

const CANCELLED: &str = "cancelled";

/// Execution options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Run independent nodes of each dependency wave concurrently.
    pub parallel: bool,
    /// Upper bound for a single provider invocation.
    ///
    /// Only enforced at await points. `MethodTable` handlers run on the
    /// blocking pool and are covered; a custom `Capability` that blocks
    /// inside `invoke` without yielding is not.
    pub invoke_timeout: Option<Duration>,
}

/// Runs filled pipelines against a registry.
pub struct Executor {
    config: ExecutorConfig,
    event_bus: EventBusRef,
    run_id: Option<String>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            event_bus: Arc::new(NullEventBus),
            run_id: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: EventBusRef) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Tag emitted node events with a query run identifier.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub async fn execute(
        &self,
        pipeline: &PipelineDescriptor,
        registry: &CapabilityRegistry,
    ) -> ExecutionReport {
        self.execute_with_cancel(pipeline, registry, &CancellationToken::new())
            .await
    }

    /// Execute, checking `cancel` between nodes (or between waves in
    /// parallel mode). Nodes not started once cancellation is observed are
    /// reported as skipped.
    pub async fn execute_with_cancel(
        &self,
        pipeline: &PipelineDescriptor,
        registry: &CapabilityRegistry,
        cancel: &CancellationToken,
    ) -> ExecutionReport {
        let graph = CallGraph::build(pipeline);
        let plan = graph.plan();
        let mut report = ExecutionReport::new();

        tracing::info!(
            nodes = pipeline.node_count(),
            runnable = plan.order.len(),
            parallel = self.config.parallel,
            "Executing pipeline"
        );

        for id in graph.duplicates() {
            let err = PipelineError::DuplicateNode(id.clone());
            tracing::warn!(node = %id, "Duplicate node identifier");
            self.finish(&mut report, id, NodeOutcome::failed(&err));
        }
        for (index, members) in &plan.cyclic {
            let node = graph.node(*index);
            let err = PipelineError::DependencyCycle {
                members: members.clone(),
            };
            tracing::warn!(node = %node.id, error = %err, "Node is on a dependency cycle");
            self.finish(&mut report, &node.id, NodeOutcome::failed(&err));
        }
        for (index, blocker) in &plan.blocked {
            let node = graph.node(*index);
            let reason = format!("dependency failure: {blocker} did not run");
            self.finish(&mut report, &node.id, NodeOutcome::skipped(reason));
        }

        if self.config.parallel {
            for (wave_index, wave) in plan.waves.iter().enumerate() {
                if cancel.is_cancelled() {
                    for &i in plan.waves[wave_index..].iter().flatten() {
                        let id = &graph.node(i).id;
                        self.finish(&mut report, id, NodeOutcome::skipped(CANCELLED));
                    }
                    break;
                }
                self.run_wave(&graph, wave, registry, &mut report).await;
            }
        } else {
            for (position, &i) in plan.order.iter().enumerate() {
                if cancel.is_cancelled() {
                    for &rest in &plan.order[position..] {
                        let id = &graph.node(rest).id;
                        self.finish(&mut report, id, NodeOutcome::skipped(CANCELLED));
                    }
                    break;
                }
                let node = graph.node(i);
                let outcome = match self.prepare(node, registry, &report) {
                    Ok((provider, args)) => {
                        report.mark_started(&node.id);
                        self.invoke(node, provider, args).await
                    }
                    Err(outcome) => outcome,
                };
                self.finish(&mut report, &node.id, outcome);
            }
        }

        tracing::info!(
            ok = report.ok_count(),
            failed = report.error_count(),
            skipped = report.skipped_count(),
            "Pipeline finished"
        );
        report
    }

    async fn run_wave(
        &self,
        graph: &CallGraph,
        wave: &[usize],
        registry: &CapabilityRegistry,
        report: &mut ExecutionReport,
    ) {
        let mut ready = Vec::new();
        for &i in wave {
            let node = graph.node(i);
            match self.prepare(node, registry, report) {
                Ok((provider, args)) => {
                    report.mark_started(&node.id);
                    ready.push((node, provider, args));
                }
                Err(outcome) => self.finish(report, &node.id, outcome),
            }
        }

        let outcomes = join_all(
            ready
                .into_iter()
                .map(|(node, provider, args)| async move {
                    (node, self.invoke(node, provider, args).await)
                }),
        )
        .await;

        for (node, outcome) in outcomes {
            self.finish(report, &node.id, outcome);
        }
    }

    /// Resolve dependencies and the provider for a node. `Err` carries the
    /// final outcome when the node cannot be invoked.
    fn prepare(
        &self,
        node: &CallNode,
        registry: &CapabilityRegistry,
        report: &ExecutionReport,
    ) -> Result<(Arc<dyn Capability>, Args), NodeOutcome> {
        for reference in &node.references {
            match report.get(reference) {
                Some(NodeOutcome::Ok { .. }) => {}
                Some(_) => {
                    tracing::debug!(node = %node.id, dependency = %reference, "Skipping node");
                    return Err(NodeOutcome::skipped(format!(
                        "dependency failure: {reference}"
                    )));
                }
                None => {
                    let err = PipelineError::DependencyUnavailable(reference.clone());
                    return Err(NodeOutcome::failed(&err));
                }
            }
        }

        let args: Args = node
            .inputs
            .iter()
            .map(|(name, value)| (name.clone(), substitute(value, node, report)))
            .collect();

        let Some(provider) = registry.get(&node.class_name) else {
            let err = PipelineError::MissingRegistration(node.class_name.clone());
            tracing::warn!(node = %node.id, "No capability registered");
            return Err(NodeOutcome::failed(&err));
        };

        if !provider.has_method(&node.method) {
            let err = PipelineError::UnknownMethod {
                class_name: node.class_name.clone(),
                method: node.method.clone(),
            };
            tracing::warn!(node = %node.id, "Unknown method");
            return Err(NodeOutcome::failed(&err));
        }

        Ok((provider, args))
    }

    async fn invoke(
        &self,
        node: &CallNode,
        provider: Arc<dyn Capability>,
        args: Args,
    ) -> NodeOutcome {
        tracing::debug!(node = %node.id, "Invoking");
        emit_event(
            &*self.event_bus,
            event_names::NODE_STARTED,
            &NodeStartedEvent {
                run_id: self.run_id.clone(),
                node: node.id.clone(),
                args: Value::Object(args.clone()),
                ts_ms: now_ms(),
            },
        );

        let call = AssertUnwindSafe(provider.invoke(&node.method, &args)).catch_unwind();
        let result = match self.config.invoke_timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => {
                    let err = PipelineError::Timeout(limit);
                    tracing::warn!(node = %node.id, error = %err, "Invocation timed out");
                    return NodeOutcome::failed(&err);
                }
            },
            None => call.await,
        };

        match result {
            Ok(Ok(value)) => NodeOutcome::Ok { value },
            Ok(Err(e)) => {
                let err = PipelineError::Invocation(e);
                tracing::warn!(node = %node.id, error = %err, "Invocation failed");
                NodeOutcome::failed(&err)
            }
            Err(panic) => {
                let err = PipelineError::Panicked(panic_message(panic.as_ref()));
                tracing::warn!(node = %node.id, error = %err, "Provider panicked");
                NodeOutcome::failed(&err)
            }
        }
    }

    fn finish(&self, report: &mut ExecutionReport, node: &str, outcome: NodeOutcome) {
        emit_event(
            &*self.event_bus,
            event_names::NODE_FINISHED,
            &NodeFinishedEvent {
                run_id: self.run_id.clone(),
                node: node.to_string(),
                status: outcome.status().to_string(),
                detail: outcome.detail(),
                ts_ms: now_ms(),
            },
        );
        report.record(node, outcome);
    }
}

/// Execute with default options and no event sink.
pub async fn execute(
    pipeline: &PipelineDescriptor,
    registry: &CapabilityRegistry,
) -> ExecutionReport {
    Executor::default().execute(pipeline, registry).await
}

/// Replace a reference with the referenced node's result; other values pass
/// through untouched.
fn substitute(value: &Value, node: &CallNode, report: &ExecutionReport) -> Value {
    if let Value::String(reference) = value {
        if node.references.contains(reference) {
            if let Some(result) = report.get(reference).and_then(NodeOutcome::value) {
                return result.clone();
            }
        }
    }
    value.clone()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
