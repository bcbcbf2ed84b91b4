//! Query orchestration.
//!
//! # Query Flow
//!
//! ```text
//! query ──▶ decision service ──▶ Selection ──prune──▶ pruned pipeline
//!                                                          │
//!        QueryOutcome ◀── executor ◀── filled pipeline ◀───┘ (argument filler)
//! ```
//!
//! Service failures never abort a query: an unusable decision degrades to the
//! empty selection, an unusable fill degrades to the unfilled pipeline, and
//! each degradation is recorded as a diagnostic.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use autoclass_capabilities::{Capability, CapabilityRegistry, ClassDescriptor};
use autoclass_events::{
    emit_event, event_names, new_run_id, now_ms, EventBusRef, NullEventBus,
    PipelineWarningEvent, QueryFinishedEvent,
};
use autoclass_pipeline::{
    fill_from_response, parse_selection, prune, ExecutionReport, Executor, ExecutorConfig,
    PipelineDescriptor, Selection,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::llm::{ChatModel, LlmArgumentFiller, LlmDecisionService, OpenAiChatClient};
use crate::service::{
    ArgumentFiller, DecisionRequest, DecisionService, FillRequest, SelectionMode,
};

const DEFAULT_SERVICE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The decision response was unusable; the selection is empty.
    DecisionService,
    /// The argument-filling response was unusable; inputs stay unfilled.
    ArgumentFilling,
    /// Nothing was selected, so nothing ran.
    NoResults,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DecisionService => "decision_service",
            Self::ArgumentFilling => "argument_filling",
            Self::NoResults => "no_results",
        }
    }
}

/// A top-level warning attached to a query outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Everything a query produced.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub run_id: String,
    /// The filled pipeline that was executed.
    pub pipeline: PipelineDescriptor,
    pub report: ExecutionReport,
    pub diagnostics: Vec<Diagnostic>,
}

/// Owns the registry and the two services, and runs queries end to end.
pub struct Agent {
    registry: CapabilityRegistry,
    decision: Arc<dyn DecisionService>,
    filler: Arc<dyn ArgumentFiller>,
    selection_mode: SelectionMode,
    executor: ExecutorConfig,
    service_timeout: Duration,
    event_bus: EventBusRef,
}

impl Agent {
    pub fn new(decision: Arc<dyn DecisionService>, filler: Arc<dyn ArgumentFiller>) -> Self {
        Self {
            registry: CapabilityRegistry::new(),
            decision,
            filler,
            selection_mode: SelectionMode::default(),
            executor: ExecutorConfig::default(),
            service_timeout: DEFAULT_SERVICE_TIMEOUT,
            event_bus: Arc::new(NullEventBus),
        }
    }

    /// Build an agent that talks to the configured chat endpoint for both
    /// services.
    pub fn from_config(config: &AgentConfig) -> Self {
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatClient::from_config(&config.llm));
        Self::new(
            Arc::new(LlmDecisionService::new(model.clone())),
            Arc::new(LlmArgumentFiller::new(model)),
        )
        .with_config(config)
    }

    /// Apply the mode, executor and timeout settings of `config`.
    pub fn with_config(mut self, config: &AgentConfig) -> Self {
        self.selection_mode = config.selection_mode;
        self.executor = config.executor_config();
        self.service_timeout = config.llm.timeout();
        self
    }

    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    pub fn with_executor_config(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_service_timeout(mut self, timeout: Duration) -> Self {
        self.service_timeout = timeout;
        self
    }

    pub fn with_event_bus(mut self, event_bus: EventBusRef) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn with_registry(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register a provider under its type name or `alias`.
    pub fn register<C>(&mut self, provider: C, alias: Option<&str>) -> &ClassDescriptor
    where
        C: Capability + 'static,
    {
        self.registry.register(provider, alias)
    }

    pub fn register_shared(
        &mut self,
        provider: Arc<dyn Capability>,
        alias: Option<&str>,
    ) -> &ClassDescriptor {
        self.registry.register_shared(provider, alias)
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    /// Ask the decision service which classes are relevant.
    pub async fn choose_classes(&self, query: &str) -> Selection {
        let mut diagnostics = Vec::new();
        self.select(&new_run_id(), query, SelectionMode::ClassOnly, &mut diagnostics)
            .await
    }

    /// Ask the decision service which classes and methods are relevant.
    pub async fn choose_class_methods(&self, query: &str) -> Selection {
        let mut diagnostics = Vec::new();
        self.select(&new_run_id(), query, SelectionMode::ClassMethod, &mut diagnostics)
            .await
    }

    /// Ask the argument filler to populate `pruned`. Falls back to `pruned`
    /// unchanged when the response is unusable.
    pub async fn determine_input_parameters(
        &self,
        query: &str,
        pruned: &PipelineDescriptor,
    ) -> PipelineDescriptor {
        let mut diagnostics = Vec::new();
        self.fill(&new_run_id(), query, pruned, &mut diagnostics).await
    }

    pub async fn run_query(&self, query: &str) -> QueryOutcome {
        self.run_query_with_cancel(query, &CancellationToken::new())
            .await
    }

    /// Resolve and execute one query.
    pub async fn run_query_with_cancel(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> QueryOutcome {
        let run_id = new_run_id();
        let started = Instant::now();
        let mut diagnostics = Vec::new();

        info!(run_id = %run_id, query, mode = ?self.selection_mode, "Running query");

        let catalog = self.registry.catalog();
        let selection = if catalog.is_empty() {
            Selection::empty()
        } else {
            self.select(&run_id, query, self.selection_mode, &mut diagnostics)
                .await
        };
        let pruned = prune(&catalog, &selection);

        let (pipeline, report) = if pruned.is_empty() {
            self.warn(
                &run_id,
                &mut diagnostics,
                DiagnosticKind::NoResults,
                "no registered capability matched the query".to_string(),
            );
            (pruned, ExecutionReport::new())
        } else {
            let filled = self.fill(&run_id, query, &pruned, &mut diagnostics).await;
            let report = Executor::new(self.executor.clone())
                .with_event_bus(self.event_bus.clone())
                .with_run_id(run_id.clone())
                .execute_with_cancel(&filled, &self.registry, cancel)
                .await;
            (filled, report)
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        emit_event(
            &*self.event_bus,
            event_names::QUERY_FINISHED,
            &QueryFinishedEvent {
                run_id: run_id.clone(),
                query: query.to_string(),
                ok: report.ok_count(),
                failed: report.error_count(),
                skipped: report.skipped_count(),
                warnings: diagnostics.len(),
                duration_ms,
            },
        );
        info!(
            run_id = %run_id,
            ok = report.ok_count(),
            failed = report.error_count(),
            skipped = report.skipped_count(),
            duration_ms,
            "Query finished"
        );

        QueryOutcome {
            run_id,
            pipeline,
            report,
            diagnostics,
        }
    }

    async fn select(
        &self,
        run_id: &str,
        query: &str,
        mode: SelectionMode,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Selection {
        let catalog = self.registry.catalog();
        let request = DecisionRequest {
            query,
            catalog: &catalog,
            mode,
        };

        let text = match self.call(self.decision.decide(&request)).await {
            Ok(text) => text,
            Err(e) => {
                self.warn(
                    run_id,
                    diagnostics,
                    DiagnosticKind::DecisionService,
                    format!("decision service failed: {e}"),
                );
                return Selection::empty();
            }
        };

        match parse_selection(&text) {
            Ok(selection) => selection,
            Err(e) => {
                self.warn(
                    run_id,
                    diagnostics,
                    DiagnosticKind::DecisionService,
                    format!("decision response rejected: {e}"),
                );
                Selection::empty()
            }
        }
    }

    async fn fill(
        &self,
        run_id: &str,
        query: &str,
        pruned: &PipelineDescriptor,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> PipelineDescriptor {
        let request = FillRequest {
            query,
            pipeline: pruned,
        };

        let text = match self.call(self.filler.fill(&request)).await {
            Ok(text) => text,
            Err(e) => {
                self.warn(
                    run_id,
                    diagnostics,
                    DiagnosticKind::ArgumentFilling,
                    format!("argument filler failed: {e}"),
                );
                return pruned.clone();
            }
        };

        match fill_from_response(pruned, &text) {
            Ok(filled) => filled,
            Err(e) => {
                self.warn(
                    run_id,
                    diagnostics,
                    DiagnosticKind::ArgumentFilling,
                    format!("argument-filling response rejected: {e}"),
                );
                pruned.clone()
            }
        }
    }

    /// Bound a service round trip by the configured timeout.
    async fn call<F>(&self, fut: F) -> ServiceResult<String>
    where
        F: Future<Output = ServiceResult<String>>,
    {
        match tokio::time::timeout(self.service_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout(self.service_timeout)),
        }
    }

    fn warn(
        &self,
        run_id: &str,
        diagnostics: &mut Vec<Diagnostic>,
        kind: DiagnosticKind,
        message: String,
    ) {
        warn!(run_id, kind = kind.as_str(), "{message}");
        emit_event(
            &*self.event_bus,
            event_names::PIPELINE_WARNING,
            &PipelineWarningEvent {
                run_id: run_id.to_string(),
                kind: kind.as_str().to_string(),
                message: message.clone(),
                ts_ms: now_ms(),
            },
        );
        diagnostics.push(Diagnostic { kind, message });
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("registry", &self.registry)
            .field("selection_mode", &self.selection_mode)
            .field("executor", &self.executor)
            .field("service_timeout", &self.service_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::FixedResponse;
    use async_trait::async_trait;
    use autoclass_capabilities::MethodTable;
    use serde_json::json;

    struct Slow;

    #[async_trait]
    impl DecisionService for Slow {
        async fn decide(&self, _request: &DecisionRequest<'_>) -> ServiceResult<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("[]".to_string())
        }
    }

    fn agent(decision: &str, fill: &str) -> Agent {
        let mut agent = Agent::new(
            Arc::new(FixedResponse::new(decision)),
            Arc::new(FixedResponse::new(fill)),
        );
        agent.register(
            MethodTable::new("Echo")
                .with_description("Echoes input.")
                .method("say", "- description: Echo.\n- param x: value :type: any", |args| {
                    Ok(args.get("x").cloned().unwrap_or(serde_json::Value::Null))
                }),
            None,
        );
        agent
    }

    #[tokio::test]
    async fn test_choose_class_methods() {
        let selection = agent(r#"{"Echo": ["say"]}"#, "{}").choose_class_methods("q").await;
        assert!(selection.allows("Echo", "say"));
    }

    #[tokio::test]
    async fn test_choose_classes_degrades_to_empty() {
        let selection = agent("no json here", "{}").choose_classes("q").await;
        assert!(selection.is_empty());
    }

    #[tokio::test]
    async fn test_determine_input_parameters_falls_back() {
        let agent = agent("[]", "garbage");
        let pruned = prune(
            &agent.registry().catalog(),
            &Selection::Classes(["Echo".to_string()].into()),
        );

        let filled = agent.determine_input_parameters("q", &pruned).await;
        assert_eq!(filled, pruned);
        assert_eq!(filled.classes[0].methods[0].inputs["x"], json!(null));
    }

    #[tokio::test]
    async fn test_service_timeout() {
        let agent = Agent::new(Arc::new(Slow), Arc::new(FixedResponse::new("{}")))
            .with_service_timeout(Duration::from_millis(20));
        let mut diagnostics = Vec::new();

        let selection = agent
            .select("run", "q", SelectionMode::ClassOnly, &mut diagnostics)
            .await;

        assert!(selection.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("did not answer"));
    }

    #[tokio::test]
    async fn test_empty_registry_skips_services() {
        let agent = Agent::new(
            Arc::new(FixedResponse::new(r#"["Echo"]"#)),
            Arc::new(FixedResponse::new("{}")),
        );
        let outcome = agent.run_query("q").await;

        assert!(outcome.report.is_empty());
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::NoResults);
    }
}
