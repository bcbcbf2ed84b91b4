//! Catalog types: what the registry knows about each provider.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured metadata for one documented method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// Method name (e.g., "add").
    pub method: String,

    /// One-line description from the `- description:` line.
    #[serde(default)]
    pub description: String,

    /// Parameter name to declared type text. Types are hints, never enforced.
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,

    /// Declared return type (or return description).
    #[serde(default)]
    pub output: String,

    /// Documentation text the descriptor was parsed from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_doc: String,
}

/// One registered provider as seen by the decision service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDescriptor {
    /// Alias or provider type name; unique within a registry.
    pub class_name: String,

    #[serde(default)]
    pub class_description: String,

    /// Documented, public methods in declaration order.
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

impl ClassDescriptor {
    /// Get a method by name.
    pub fn get_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.method == name)
    }
}

/// Snapshot of every registered class and its documented methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub classes: Vec<ClassDescriptor>,
}

impl Catalog {
    pub fn get_class(&self, class_name: &str) -> Option<&ClassDescriptor> {
        self.classes.iter().find(|c| c.class_name == class_name)
    }

    pub fn get_method(&self, class_name: &str, method: &str) -> Option<&MethodDescriptor> {
        self.get_class(class_name)?.get_method(method)
    }

    pub fn method_count(&self) -> usize {
        self.classes.iter().map(|c| c.methods.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Class name plus description, as listed for class-only selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub class_name: String,
    pub class_description: String,
}

/// A method flattened out of its class, with the class name attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedMethod {
    pub class: String,
    pub method: String,
    pub description: String,
    pub inputs: BTreeMap<String, String>,
    pub output: String,
}

impl ListedMethod {
    /// Fully-qualified identifier, `ClassName.method_name`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.class, self.method)
    }
}
