//! Decision service responses.
//!
//! The decision service answers with free text that should contain one of two
//! JSON shapes:
//!
//! - class-only: `["Arithmetic", "StringUtils"]`
//! - class+method: `{"Arithmetic": ["add", "multiply"]}`
//!
//! Anything else is rejected. The text is deserialized, never evaluated.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ResponseError;

/// Which classes (and optionally which of their methods) a query needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Whole classes; every catalogued method of each is kept.
    Classes(BTreeSet<String>),
    /// Class name to the selected method names, order preserved, no repeats.
    Methods(BTreeMap<String, Vec<String>>),
}

impl Default for Selection {
    fn default() -> Self {
        Self::Methods(BTreeMap::new())
    }
}

impl Selection {
    /// The empty selection ("nothing relevant").
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Classes(classes) => classes.is_empty(),
            Self::Methods(methods) => methods.values().all(Vec::is_empty),
        }
    }

    /// Whether `class_name.method` is selected.
    pub fn allows(&self, class_name: &str, method: &str) -> bool {
        match self {
            Self::Classes(classes) => classes.contains(class_name),
            Self::Methods(methods) => methods
                .get(class_name)
                .is_some_and(|names| names.iter().any(|m| m == method)),
        }
    }
}

/// Parse a decision service response into a selection.
pub fn parse_selection(text: &str) -> Result<Selection, ResponseError> {
    let json = extract_json(text).ok_or(ResponseError::Empty)?;
    let value: Value = serde_json::from_str(json).map_err(ResponseError::InvalidJson)?;

    match value {
        Value::Array(items) => {
            let mut classes = BTreeSet::new();
            for item in items {
                match item {
                    Value::String(name) => {
                        classes.insert(name.trim().to_string());
                    }
                    other => {
                        return Err(ResponseError::UnexpectedShape(format!(
                            "class list entries must be strings, got {other}"
                        )))
                    }
                }
            }
            Ok(Selection::Classes(classes))
        }
        Value::Object(map) => {
            let mut methods = BTreeMap::new();
            for (class_name, names) in map {
                let Value::Array(names) = names else {
                    return Err(ResponseError::UnexpectedShape(format!(
                        "methods for '{class_name}' must be a list"
                    )));
                };
                let mut selected: Vec<String> = Vec::with_capacity(names.len());
                for name in names {
                    let Value::String(name) = name else {
                        return Err(ResponseError::UnexpectedShape(format!(
                            "method names for '{class_name}' must be strings"
                        )));
                    };
                    let name = name.trim().to_string();
                    if !selected.contains(&name) {
                        selected.push(name);
                    }
                }
                methods.insert(class_name.trim().to_string(), selected);
            }
            Ok(Selection::Methods(methods))
        }
        other => Err(ResponseError::UnexpectedShape(format!(
            "expected a list or an object, got {other}"
        ))),
    }
}

/// Extract the JSON payload from a model response.
///
/// Handles ```json fenced blocks and a single JSON value surrounded by
/// chatter. Every `{` or `[` is tried as a start in turn; the first one that
/// opens a complete object or array wins. When none does, the widest span
/// is returned so the caller reports the parse error. Returns `None` when
/// nothing JSON-like is present.
pub fn extract_json(response: &str) -> Option<&str> {
    let body = strip_code_fences(response.trim());
    if body.is_empty() {
        return None;
    }
    if body.starts_with('{') || body.starts_with('[') {
        return Some(body);
    }

    let mut starts = body
        .match_indices(|c: char| c == '{' || c == '[')
        .map(|(i, _)| i)
        .peekable();
    let first = *starts.peek()?;
    for start in starts {
        if let Some(len) = leading_value_len(&body[start..]) {
            return Some(&body[start..start + len]);
        }
    }

    let close = if body[first..].starts_with('{') { '}' } else { ']' };
    let end = body.rfind(close)?;
    (end > first).then(|| &body[first..=end])
}

/// Byte length of the object or array at the start of `text`, if it parses.
fn leading_value_len(text: &str) -> Option<usize> {
    let mut stream = serde_json::Deserializer::from_str(text).into_iter::<Value>();
    match stream.next() {
        Some(Ok(Value::Object(_) | Value::Array(_))) => Some(stream.byte_offset()),
        _ => None,
    }
}

fn strip_code_fences(trimmed: &str) -> &str {
    let Some(after_open) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Skip the optional language tag on the opening fence line.
    let body = match after_open.find('\n') {
        Some(idx) => &after_open[idx + 1..],
        None => "",
    };

    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}
