//! Pipeline resolution and execution.
//!
//! # Pipeline Flow
//!
//! ```text
//! Catalog ──prune(selection)──▶ pruned pipeline ──fill(response)──▶ filled pipeline
//!                                                                       │
//!                                        ExecutionReport ◀──execute─────┘
//! ```
//!
//! A pipeline is a flat list of `ClassName.method_name` calls. An input value
//! that is exactly another call's identifier is a data dependency: the call
//! runs after the referenced one and receives its result in that argument.

mod descriptor;
mod error;
mod executor;
mod filling;
mod graph;
mod pruner;
mod report;
mod selection;

pub use descriptor::{node_id, PipelineClass, PipelineDescriptor, PipelineMethod};
pub use error::{FailureKind, PipelineError, ResponseError};
pub use executor::{execute, Executor, ExecutorConfig};
pub use filling::{apply_filled, check_structure, fill_from_response, parse_filled_pipeline};
pub use graph::{CallGraph, CallNode, ExecutionPlan};
pub use pruner::prune;
pub use report::{ExecutionReport, NodeOutcome};
pub use selection::{extract_json, parse_selection, Selection};
