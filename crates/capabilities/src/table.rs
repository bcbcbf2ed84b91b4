//! Table-driven capability provider.
//!
//! Builds a provider from closures keyed by method name, each with its
//! documentation text. Convenient for small providers and for tests.
//!
//! Handlers are plain synchronous closures and run on tokio's blocking pool,
//! so a slow handler never stalls the runtime and the executor's invocation
//! timeout still applies to it.

use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

use crate::error::{InvokeError, InvokeResult};
use crate::provider::{Args, Capability, MethodDoc};

type Handler = Arc<dyn Fn(&Args) -> InvokeResult<Value> + Send + Sync>;

struct TableEntry {
    doc: MethodDoc,
    handler: Handler,
}

/// A capability backed by a table of `name -> (doc, closure)` entries.
pub struct MethodTable {
    type_name: String,
    description: String,
    entries: Vec<TableEntry>,
}

impl MethodTable {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            description: String::new(),
            entries: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a documented method. Re-adding a name replaces the earlier entry.
    pub fn method<F>(self, name: &str, doc: &str, handler: F) -> Self
    where
        F: Fn(&Args) -> InvokeResult<Value> + Send + Sync + 'static,
    {
        self.insert(MethodDoc::documented(name, doc), Arc::new(handler))
    }

    /// Add a method that is callable but hidden from the catalog.
    pub fn undocumented<F>(self, name: &str, handler: F) -> Self
    where
        F: Fn(&Args) -> InvokeResult<Value> + Send + Sync + 'static,
    {
        self.insert(MethodDoc::undocumented(name), Arc::new(handler))
    }

    fn insert(mut self, doc: MethodDoc, handler: Handler) -> Self {
        match self.entries.iter_mut().find(|e| e.doc.name == doc.name) {
            Some(entry) => {
                entry.doc = doc;
                entry.handler = handler;
            }
            None => self.entries.push(TableEntry { doc, handler }),
        }
        self
    }
}

#[async_trait]
impl Capability for MethodTable {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Owned(self.type_name.clone())
    }

    fn description(&self) -> Cow<'static, str> {
        Cow::Owned(self.description.clone())
    }

    fn methods(&self) -> Vec<MethodDoc> {
        self.entries.iter().map(|e| e.doc.clone()).collect()
    }

    fn has_method(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.doc.name == name)
    }

    async fn invoke(&self, method: &str, args: &Args) -> InvokeResult<Value> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.doc.name == method)
            .ok_or_else(|| InvokeError::UnknownMethod(method.to_string()))?;

        let handler = Arc::clone(&entry.handler);
        let args = args.clone();
        match tokio::task::spawn_blocking(move || handler(&args)).await {
            Ok(result) => result,
            // Re-raise handler panics on the calling task so callers see them as panics.
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(InvokeError::failed(format!("handler task failed: {e}"))),
        }
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodTable")
            .field("type_name", &self.type_name)
            .field(
                "methods",
                &self.entries.iter().map(|e| e.doc.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
