//! Capability providers and the method catalog derived from them.
//!
//! This crate provides:
//! - The `Capability` trait: a provider declares its methods (name + doc text)
//!   and can be invoked by method name with named JSON arguments
//! - Parsing of method documentation into structured descriptors
//! - The `CapabilityRegistry`, which keys providers by class name and keeps
//!   the catalog the decision service chooses from
//!
//! # Example
//!
//! ```ignore
//! use autoclass_capabilities::{CapabilityRegistry, MethodTable};
//!
//! let mut registry = CapabilityRegistry::new();
//! registry.register(arithmetic_table(), Some("Arithmetic"));
//! for method in registry.list_methods() {
//!     println!("{}.{} -> {}", method.class, method.method, method.output);
//! }
//! ```

mod docstring;
mod error;
mod provider;
mod registry;
mod table;
mod types;

pub use docstring::{parse_docstring, ParsedDoc};
pub use error::{InvokeError, InvokeResult};
pub use provider::{optional_arg, required_arg, required_str, Args, Capability, MethodDoc};
pub use registry::{describe, CapabilityRegistry};
pub use table::MethodTable;
pub use types::{Catalog, ClassDescriptor, ClassSummary, ListedMethod, MethodDescriptor};
