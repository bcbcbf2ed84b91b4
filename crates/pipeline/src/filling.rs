//! Argument-filling responses.
//!
//! The argument-filling service returns the pruned pipeline with input values
//! populated. It must not rename, add or drop classes, methods or parameters;
//! a response that drifts is rejected as a whole.

use std::collections::{BTreeMap, BTreeSet};

use crate::descriptor::PipelineDescriptor;
use crate::error::ResponseError;
use crate::selection::extract_json;

type Shape = BTreeMap<(String, String), BTreeSet<String>>;

/// Parse a filled pipeline out of a model response.
pub fn parse_filled_pipeline(text: &str) -> Result<PipelineDescriptor, ResponseError> {
    let json = extract_json(text).ok_or(ResponseError::Empty)?;
    let value: serde_json::Value = serde_json::from_str(json).map_err(ResponseError::InvalidJson)?;
    if !value.is_object() {
        return Err(ResponseError::UnexpectedShape(
            "expected a pipeline object".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|e| ResponseError::UnexpectedShape(e.to_string()))
}

/// Verify two pipelines have the same classes, methods and parameter names.
pub fn check_structure(
    expected: &PipelineDescriptor,
    actual: &PipelineDescriptor,
) -> Result<(), ResponseError> {
    if expected.node_count() != actual.node_count() {
        return Err(ResponseError::StructureDrift(format!(
            "expected {} calls, got {}",
            expected.node_count(),
            actual.node_count()
        )));
    }

    let expected_shape = shape(expected);
    let actual_shape = shape(actual);

    if actual_shape.len() != actual.node_count() {
        return Err(ResponseError::StructureDrift(
            "response repeats a call".to_string(),
        ));
    }

    for ((class_name, method), params) in &expected_shape {
        let key = (class_name.clone(), method.clone());
        match actual_shape.get(&key) {
            None => {
                return Err(ResponseError::StructureDrift(format!(
                    "missing call {class_name}.{method}"
                )))
            }
            Some(actual_params) if actual_params != params => {
                return Err(ResponseError::StructureDrift(format!(
                    "parameters of {class_name}.{method} changed: expected {:?}, got {:?}",
                    params, actual_params
                )))
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Copy the filled values into the template after checking its structure.
///
/// Everything except input values comes from the template, so a response
/// cannot alter output types or declared parameter types.
pub fn apply_filled(
    template: &PipelineDescriptor,
    filled: &PipelineDescriptor,
) -> Result<PipelineDescriptor, ResponseError> {
    check_structure(template, filled)?;

    let mut result = template.clone();
    for (class_name, filled_method) in filled.nodes() {
        if let Some(target) = result.method_mut(class_name, &filled_method.method) {
            for (param, value) in &filled_method.inputs {
                if let Some(slot) = target.inputs.get_mut(param) {
                    *slot = value.clone();
                }
            }
        }
    }
    Ok(result)
}

/// Parse a response and apply it to the template in one step.
pub fn fill_from_response(
    template: &PipelineDescriptor,
    text: &str,
) -> Result<PipelineDescriptor, ResponseError> {
    let filled = parse_filled_pipeline(text)?;
    apply_filled(template, &filled)
}

fn shape(pipeline: &PipelineDescriptor) -> Shape {
    pipeline
        .nodes()
        .map(|(class_name, m)| {
            (
                (class_name.to_string(), m.method.clone()),
                m.inputs.keys().cloned().collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn template() -> PipelineDescriptor {
        serde_json::from_value(json!({
            "classes": [{
                "class_name": "Arithmetic",
                "methods": [
                    {"method": "add", "inputs": {"a": null, "b": null}, "output": "int or float",
                     "input_types": {"a": "int or float", "b": "int or float"}},
                    {"method": "multiply", "inputs": {"a": null, "b": null},
                     "output": "int or float"}
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_fill_accepts_identical_structure() {
        let response = r#"{"classes": [{"class_name": "Arithmetic", "methods": [
            {"method": "multiply", "inputs": {"a": "Arithmetic.add", "b": 4}, "output": "whatever"},
            {"method": "add", "inputs": {"a": 2, "b": 3}}
        ]}]}"#;

        let filled = fill_from_response(&template(), response).unwrap();
        let add = &filled.classes[0].methods[0];
        let multiply = &filled.classes[0].methods[1];

        assert_eq!(add.inputs["a"], json!(2));
        assert_eq!(add.input_types["a"], "int or float");
        assert_eq!(multiply.inputs["a"], json!("Arithmetic.add"));
        assert_eq!(multiply.output, "int or float");
    }

    #[test]
    fn test_fill_rejects_renamed_parameter() {
        let response = r#"{"classes": [{"class_name": "Arithmetic", "methods": [
            {"method": "add", "inputs": {"x": 2, "b": 3}},
            {"method": "multiply", "inputs": {"a": 1, "b": 4}}
        ]}]}"#;

        assert!(matches!(
            fill_from_response(&template(), response),
            Err(ResponseError::StructureDrift(_))
        ));
    }

    #[test]
    fn test_fill_rejects_added_method() {
        let response = r#"{"classes": [{"class_name": "Arithmetic", "methods": [
            {"method": "add", "inputs": {"a": 2, "b": 3}},
            {"method": "multiply", "inputs": {"a": 1, "b": 4}},
            {"method": "divide", "inputs": {"a": 1, "b": 4}}
        ]}]}"#;

        assert!(matches!(
            fill_from_response(&template(), response),
            Err(ResponseError::StructureDrift(_))
        ));
    }

    #[test]
    fn test_fill_rejects_repeated_call() {
        let response = r#"{"classes": [{"class_name": "Arithmetic", "methods": [
            {"method": "add", "inputs": {"a": 2, "b": 3}},
            {"method": "add", "inputs": {"a": 1, "b": 4}}
        ]}]}"#;

        assert!(matches!(
            fill_from_response(&template(), response),
            Err(ResponseError::StructureDrift(_))
        ));
    }

    #[test]
    fn test_fill_rejects_renamed_class() {
        let response = r#"{"classes": [{"class_name": "Math", "methods": [
            {"method": "add", "inputs": {"a": 2, "b": 3}},
            {"method": "multiply", "inputs": {"a": 1, "b": 4}}
        ]}]}"#;

        assert!(fill_from_response(&template(), response).is_err());
    }

    #[test]
    fn test_fill_rejects_non_object() {
        assert!(matches!(
            fill_from_response(&template(), "[1, 2, 3]"),
            Err(ResponseError::UnexpectedShape(_))
        ));
        assert!(matches!(
            fill_from_response(&template(), "no idea"),
            Err(ResponseError::Empty)
        ));
    }

    #[test]
    fn test_unfilled_values_stay_null() {
        let response = r#"{"classes": [{"class_name": "Arithmetic", "methods": [
            {"method": "add", "inputs": {"a": 2, "b": null}},
            {"method": "multiply", "inputs": {"a": null, "b": null}}
        ]}]}"#;

        let filled = fill_from_response(&template(), response).unwrap();
        assert_eq!(filled.classes[0].methods[0].inputs["b"], Value::Null);
    }
}
