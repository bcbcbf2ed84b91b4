//! The `Capability` trait and argument helpers.
//!
//! A capability is any provider of named methods: it declares a manifest of
//! method names with their documentation text and can be invoked by method
//! name with a map of named JSON arguments. The executor never needs to know
//! the concrete provider type.

use async_trait::async_trait;
use serde_json::Value;
use std::borrow::Cow;

use crate::error::{InvokeError, InvokeResult};

/// Named arguments passed to a method.
pub type Args = serde_json::Map<String, Value>;

/// Manifest entry for one method a provider exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDoc {
    /// Method name. Names starting with `_` are internal and never catalogued.
    pub name: String,
    /// Documentation text following the line grammar. `None` keeps the method
    /// callable but hidden from the catalog.
    pub doc: Option<String>,
}

impl MethodDoc {
    pub fn documented(name: impl Into<String>, doc: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: Some(doc.into()),
        }
    }

    pub fn undocumented(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc: None,
        }
    }

    /// Whether the method is internal (leading underscore).
    pub fn is_internal(&self) -> bool {
        self.name.starts_with('_')
    }

    /// Documentation text, if any non-blank text was supplied.
    pub fn doc_text(&self) -> Option<&str> {
        self.doc.as_deref().filter(|d| !d.trim().is_empty())
    }
}

/// Trait for invokable capability providers.
///
/// Uses async_trait to make the trait dyn-compatible.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Stable type identifier, used as the class name when no alias is given.
    fn type_name(&self) -> Cow<'static, str>;

    /// Human-readable description of the provider as a whole.
    fn description(&self) -> Cow<'static, str> {
        Cow::Borrowed("")
    }

    /// Every method this provider can be invoked with, documented or not.
    fn methods(&self) -> Vec<MethodDoc>;

    /// Check whether `invoke` accepts this method name.
    fn has_method(&self, name: &str) -> bool {
        self.methods().iter().any(|m| m.name == name)
    }

    /// Invoke a method by name with named arguments.
    async fn invoke(&self, method: &str, args: &Args) -> InvokeResult<Value>;
}

impl std::fmt::Debug for dyn Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Capability({})", self.type_name())
    }
}

/// Get a required argument.
pub fn required_arg<'a>(args: &'a Args, name: &str) -> InvokeResult<&'a Value> {
    match args.get(name) {
        Some(Value::Null) | None => Err(InvokeError::MissingArg(name.to_string())),
        Some(value) => Ok(value),
    }
}

/// Get a required string argument.
pub fn required_str<'a>(args: &'a Args, name: &str) -> InvokeResult<&'a str> {
    required_arg(args, name)?
        .as_str()
        .ok_or_else(|| InvokeError::invalid(name, "expected a string"))
}

/// Get an optional argument; JSON null counts as absent.
pub fn optional_arg<'a>(args: &'a Args, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}
