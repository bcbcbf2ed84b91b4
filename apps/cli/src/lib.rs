//! `autoclass` command-line front end.
//!
//! Registers the demo capabilities, then either prints their catalog or runs
//! a query through the decision service, the argument filler and the
//! executor. `--selection` and `--inputs` replace the model responses with
//! canned text, which makes offline runs possible.

pub mod demo;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use autoclass_agent::{
    Agent, AgentConfig, ArgumentFiller, ChatModel, DecisionService, FixedResponse,
    LlmArgumentFiller, LlmDecisionService, OpenAiChatClient, QueryOutcome, SelectionMode,
};
use autoclass_capabilities::CapabilityRegistry;
use autoclass_events::TracingEventBus;
use autoclass_pipeline::PipelineDescriptor;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "autoclass",
    about = "Route natural-language queries to registered capabilities",
    version
)]
pub struct Cli {
    /// Configuration file (defaults to <config_dir>/autoclass/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the catalog of registered capabilities
    Catalog {
        /// Print the catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Resolve and execute a query
    Run {
        /// The natural-language query
        query: String,

        /// Chat model name
        #[arg(long)]
        model: Option<String>,

        /// Chat completions endpoint URL
        #[arg(long)]
        endpoint: Option<String>,

        /// Run independent calls concurrently
        #[arg(long)]
        parallel: bool,

        /// Select whole classes instead of individual methods
        #[arg(long)]
        class_only: bool,

        /// Use this text as the decision service response
        #[arg(long, value_name = "JSON")]
        selection: Option<String>,

        /// Use this text as the argument-filling response
        #[arg(long, value_name = "JSON")]
        inputs: Option<String>,

        /// Print the executed pipeline
        #[arg(long)]
        show_pipeline: bool,

        /// Print the dependency edges of the executed pipeline
        #[arg(long)]
        graph: bool,
    },
}

/// Registry with the demo capabilities.
pub fn demo_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(demo::arithmetic(), None);
    registry.register(demo::string_utils(), None);
    registry
}

pub async fn run(cli: Cli) -> Result<()> {
    let mut config = AgentConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    match cli.command {
        Command::Catalog { json } => {
            print!("{}", render_catalog(&demo_registry(), json)?);
            Ok(())
        }
        Command::Run {
            query,
            model,
            endpoint,
            parallel,
            class_only,
            selection,
            inputs,
            show_pipeline,
            graph,
        } => {
            if let Some(model) = model {
                config.llm.model = model;
            }
            if let Some(endpoint) = endpoint {
                config.llm.endpoint = endpoint;
            }
            if parallel {
                config.executor.parallel = true;
            }
            if class_only {
                config.selection_mode = SelectionMode::ClassOnly;
            }

            let agent = build_agent(&config, selection, inputs);
            let outcome = agent.run_query(&query).await;
            print!("{}", render_outcome(&outcome, show_pipeline, graph)?);
            Ok(())
        }
    }
}

/// Wire the services: canned text where given, the chat endpoint otherwise.
pub fn build_agent(
    config: &AgentConfig,
    selection: Option<String>,
    inputs: Option<String>,
) -> Agent {
    let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatClient::from_config(&config.llm));

    let decision: Arc<dyn DecisionService> = match selection {
        Some(text) => Arc::new(FixedResponse::new(text)),
        None => Arc::new(LlmDecisionService::new(model.clone())),
    };
    let filler: Arc<dyn ArgumentFiller> = match inputs {
        Some(text) => Arc::new(FixedResponse::new(text)),
        None => Arc::new(LlmArgumentFiller::new(model)),
    };

    Agent::new(decision, filler)
        .with_config(config)
        .with_registry(demo_registry())
        .with_event_bus(Arc::new(TracingEventBus))
}

pub fn render_catalog(registry: &CapabilityRegistry, json: bool) -> Result<String> {
    if json {
        let text = serde_json::to_string_pretty(&registry.catalog())
            .context("Failed to serialize catalog")?;
        return Ok(format!("{text}\n"));
    }

    let mut out = String::new();
    for class in registry.list_classes() {
        out.push_str(&format!("{}: {}\n", class.class_name, class.class_description));
        for method in registry
            .list_methods()
            .into_iter()
            .filter(|m| m.class == class.class_name)
        {
            let params = method
                .inputs
                .iter()
                .map(|(name, ty)| format!("{name}: {ty}"))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!(
                "  {}({}) -> {}  {}\n",
                method.method, params, method.output, method.description
            ));
        }
    }
    Ok(out)
}

pub fn render_outcome(outcome: &QueryOutcome, show_pipeline: bool, graph: bool) -> Result<String> {
    let mut out = String::new();

    if show_pipeline {
        let text = serde_json::to_string_pretty(&outcome.pipeline)
            .context("Failed to serialize pipeline")?;
        out.push_str(&format!("{text}\n"));
    }
    if graph {
        out.push_str(&render_graph(&outcome.pipeline));
    }
    for diagnostic in &outcome.diagnostics {
        out.push_str(&format!("warning: {}\n", diagnostic.message));
    }

    let report = serde_json::to_string_pretty(&outcome.report)
        .context("Failed to serialize execution report")?;
    out.push_str(&format!("{report}\n"));
    Ok(out)
}

/// One `from -> to` line per dependency edge.
pub fn render_graph(pipeline: &PipelineDescriptor) -> String {
    pipeline
        .dependency_edges()
        .into_iter()
        .map(|(from, to)| format!("{from} -> {to}\n"))
        .collect()
}
