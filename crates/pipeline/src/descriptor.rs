//! Pipeline descriptor: the query-specific call plan.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Build a node identifier, `ClassName.method_name`.
pub fn node_id(class_name: &str, method: &str) -> String {
    format!("{class_name}.{method}")
}

/// Pruned, then argument-filled, call plan for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDescriptor {
    #[serde(default)]
    pub classes: Vec<PipelineClass>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineClass {
    pub class_name: String,
    #[serde(default)]
    pub methods: Vec<PipelineMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMethod {
    pub method: String,

    /// Parameter name to value. Null until filled; a string equal to another
    /// node's identifier means "that node's result".
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,

    #[serde(default)]
    pub output: String,

    /// Declared parameter types, carried along for prompt construction.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_types: BTreeMap<String, String>,
}

impl PipelineMethod {
    /// A call with the given literal inputs and no declared types.
    pub fn call(method: impl Into<String>, inputs: BTreeMap<String, Value>) -> Self {
        Self {
            method: method.into(),
            inputs,
            output: String::new(),
            input_types: BTreeMap::new(),
        }
    }
}

impl PipelineDescriptor {
    pub fn is_empty(&self) -> bool {
        self.classes.iter().all(|c| c.methods.is_empty())
    }

    /// Iterate `(class_name, method)` in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &PipelineMethod)> {
        self.classes
            .iter()
            .flat_map(|c| c.methods.iter().map(move |m| (c.class_name.as_str(), m)))
    }

    pub fn node_count(&self) -> usize {
        self.classes.iter().map(|c| c.methods.len()).sum()
    }

    /// Node identifiers in declaration order (duplicates included).
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes().map(|(class, m)| node_id(class, &m.method)).collect()
    }

    /// `(from, to)` pairs: `to` has an input referencing `from`.
    pub fn dependency_edges(&self) -> Vec<(String, String)> {
        let ids: HashSet<String> = self.node_ids().into_iter().collect();
        let mut edges = Vec::new();
        for (class, m) in self.nodes() {
            let to = node_id(class, &m.method);
            for value in m.inputs.values() {
                if let Value::String(reference) = value {
                    if ids.contains(reference) {
                        edges.push((reference.clone(), to.clone()));
                    }
                }
            }
        }
        edges
    }

    /// Mutable access to a method by class and method name.
    pub fn method_mut(&mut self, class_name: &str, method: &str) -> Option<&mut PipelineMethod> {
        self.classes
            .iter_mut()
            .find(|c| c.class_name == class_name)?
            .methods
            .iter_mut()
            .find(|m| m.method == method)
    }
}
