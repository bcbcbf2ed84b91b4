use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use autoclass_capabilities::{
    required_arg, Args, Capability, CapabilityRegistry, InvokeError, InvokeResult, MethodDoc,
    MethodTable,
};
use autoclass_pipeline::{
    execute, Executor, ExecutorConfig, FailureKind, NodeOutcome, PipelineDescriptor,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

fn number(args: &Args, name: &str) -> InvokeResult<i64> {
    required_arg(args, name)?
        .as_i64()
        .ok_or_else(|| InvokeError::invalid(name, "expected an integer"))
}

fn arithmetic() -> MethodTable {
    MethodTable::new("Arithmetic")
        .method(
            "add",
            "- description: Adds two numbers.\n\
             - param a: first :type: int\n\
             - param b: second :type: int\n\
             :return: sum :rtype: int",
            |args| Ok(json!(number(args, "a")? + number(args, "b")?)),
        )
        .method(
            "divide",
            "- description: Divides a by b.\n\
             - param a: numerator :type: int\n\
             - param b: denominator :type: int",
            |args| {
                let b = number(args, "b")?;
                if b == 0 {
                    return Err(InvokeError::failed("division by zero"));
                }
                Ok(json!(number(args, "a")? / b))
            },
        )
}

/// A.f(x) = x * 10, B.g(x) = x + 1, C.h(x) = x
fn letters() -> Vec<MethodTable> {
    vec![
        MethodTable::new("A").method("f", "- description: f", |args| {
            Ok(json!(number(args, "x")? * 10))
        }),
        MethodTable::new("B").method("g", "- description: g", |args| {
            Ok(json!(number(args, "x")? + 1))
        }),
        MethodTable::new("C").method("h", "- description: h", |args| {
            Ok(required_arg(args, "x")?.clone())
        }),
        MethodTable::new("D").method("k", "- description: k", |args| {
            Ok(required_arg(args, "x")?.clone())
        }),
    ]
}

fn registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(arithmetic(), None);
    for table in letters() {
        registry.register(table, None);
    }
    registry
}

fn pipeline(value: Value) -> PipelineDescriptor {
    serde_json::from_value(value).unwrap()
}

struct Faulty;

#[async_trait]
impl Capability for Faulty {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Faulty")
    }

    fn methods(&self) -> Vec<MethodDoc> {
        vec![
            MethodDoc::documented("explode", "- description: Panics."),
            MethodDoc::documented("stall", "- description: Never finishes in time."),
        ]
    }

    async fn invoke(&self, method: &str, _args: &Args) -> InvokeResult<Value> {
        match method {
            "explode" => panic!("provider exploded"),
            "stall" => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Value::Null)
            }
            other => Err(InvokeError::UnknownMethod(other.to_string())),
        }
    }
}

/// Cancels the token as soon as it is invoked.
struct Canceller(CancellationToken);

#[async_trait]
impl Capability for Canceller {
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed("Canceller")
    }

    fn methods(&self) -> Vec<MethodDoc> {
        vec![MethodDoc::documented("stop", "- description: Stops the run.")]
    }

    async fn invoke(&self, _method: &str, _args: &Args) -> InvokeResult<Value> {
        self.0.cancel();
        Ok(json!("stopped"))
    }
}

#[tokio::test]
async fn test_single_call_report() {
    let report = execute(
        &pipeline(json!({"classes": [{"class_name": "Arithmetic", "methods": [
            {"method": "add", "inputs": {"a": 2, "b": 3}, "output": "int"}
        ]}]})),
        &registry(),
    )
    .await;

    assert_eq!(
        report.to_json(),
        json!({"Arithmetic.add": {"status": "ok", "value": 5}})
    );
}

#[tokio::test]
async fn test_reference_orders_and_substitutes() {
    let report = execute(
        &pipeline(json!({"classes": [
            {"class_name": "B", "methods": [{"method": "g", "inputs": {"x": "A.f"}}]},
            {"class_name": "A", "methods": [{"method": "f", "inputs": {"x": 4}}]}
        ]})),
        &registry(),
    )
    .await;

    assert_eq!(report.execution_order(), ["A.f".to_string(), "B.g".to_string()]);
    assert_eq!(report.get("A.f").and_then(NodeOutcome::value), Some(&json!(40)));
    assert_eq!(report.get("B.g").and_then(NodeOutcome::value), Some(&json!(41)));
}

#[tokio::test]
async fn test_cycle_does_not_block_independent_nodes() {
    let report = execute(
        &pipeline(json!({"classes": [
            {"class_name": "A", "methods": [{"method": "f", "inputs": {"x": "B.g"}}]},
            {"class_name": "B", "methods": [{"method": "g", "inputs": {"x": "A.f"}}]},
            {"class_name": "C", "methods": [{"method": "h", "inputs": {"x": "hi"}}]},
            {"class_name": "D", "methods": [{"method": "k", "inputs": {"x": "B.g"}}]}
        ]})),
        &registry(),
    )
    .await;

    for id in ["A.f", "B.g"] {
        match report.get(id) {
            Some(NodeOutcome::Error { kind, error }) => {
                assert_eq!(*kind, FailureKind::Cycle);
                assert!(error.contains("A.f"));
                assert!(error.contains("B.g"));
            }
            other => panic!("Expected cycle error for {id}, got {other:?}"),
        }
    }
    assert_eq!(report.get("C.h").and_then(NodeOutcome::value), Some(&json!("hi")));
    assert!(matches!(report.get("D.k"), Some(NodeOutcome::Skipped { .. })));
    assert_eq!(report.execution_order(), ["C.h".to_string()]);
}

#[tokio::test]
async fn test_failure_only_skips_dependents() {
    let report = execute(
        &pipeline(json!({"classes": [
            {"class_name": "Arithmetic", "methods": [
                {"method": "divide", "inputs": {"a": 1, "b": 0}},
                {"method": "add", "inputs": {"a": 1, "b": 1}}
            ]},
            {"class_name": "B", "methods": [{"method": "g", "inputs": {"x": "Arithmetic.divide"}}]},
            {"class_name": "C", "methods": [{"method": "h", "inputs": {"x": "B.g"}}]}
        ]})),
        &registry(),
    )
    .await;

    match report.get("Arithmetic.divide") {
        Some(NodeOutcome::Error { kind, error }) => {
            assert_eq!(*kind, FailureKind::Invocation);
            assert!(error.contains("division by zero"));
        }
        other => panic!("Expected invocation error, got {other:?}"),
    }
    assert_eq!(
        report.get("B.g"),
        Some(&NodeOutcome::skipped("dependency failure: Arithmetic.divide"))
    );
    assert_eq!(
        report.get("C.h"),
        Some(&NodeOutcome::skipped("dependency failure: B.g"))
    );
    assert_eq!(report.get("Arithmetic.add").and_then(NodeOutcome::value), Some(&json!(2)));
    assert_eq!(report.len(), 4);
}

#[tokio::test]
async fn test_execution_is_repeatable() {
    let pipeline = pipeline(json!({"classes": [
        {"class_name": "A", "methods": [{"method": "f", "inputs": {"x": 1}}]},
        {"class_name": "B", "methods": [{"method": "g", "inputs": {"x": "A.f"}}]},
        {"class_name": "Arithmetic", "methods": [
            {"method": "add", "inputs": {"a": "A.f", "b": "B.g"}}
        ]}
    ]}));
    let registry = registry();

    let first = execute(&pipeline, &registry).await;
    let second = execute(&pipeline, &registry).await;

    assert_eq!(first, second);
    assert_eq!(first.get("Arithmetic.add").and_then(NodeOutcome::value), Some(&json!(21)));
}

#[tokio::test]
async fn test_missing_registration_is_per_node() {
    let report = execute(
        &pipeline(json!({"classes": [
            {"class_name": "Weather", "methods": [
                {"method": "forecast", "inputs": {"city": "Oslo"}}
            ]},
            {"class_name": "C", "methods": [{"method": "h", "inputs": {"x": 3}}]}
        ]})),
        &registry(),
    )
    .await;

    assert!(matches!(
        report.get("Weather.forecast"),
        Some(NodeOutcome::Error { kind: FailureKind::MissingRegistration, .. })
    ));
    assert!(report.get("C.h").is_some_and(NodeOutcome::is_ok));
}

#[tokio::test]
async fn test_duplicate_identifier_runs_no_copy() {
    let report = execute(
        &pipeline(json!({"classes": [
            {"class_name": "A", "methods": [
                {"method": "f", "inputs": {"x": 1}},
                {"method": "f", "inputs": {"x": 2}}
            ]},
            {"class_name": "B", "methods": [{"method": "g", "inputs": {"x": "A.f"}}]}
        ]})),
        &registry(),
    )
    .await;

    assert!(matches!(
        report.get("A.f"),
        Some(NodeOutcome::Error { kind: FailureKind::Structure, .. })
    ));
    assert!(matches!(report.get("B.g"), Some(NodeOutcome::Skipped { .. })));
    assert!(report.execution_order().is_empty());
}

#[tokio::test]
async fn test_provider_panic_is_captured() {
    let mut registry = registry();
    registry.register(Faulty, None);

    let report = execute(
        &pipeline(json!({"classes": [
            {"class_name": "Faulty", "methods": [{"method": "explode", "inputs": {}}]},
            {"class_name": "C", "methods": [{"method": "h", "inputs": {"x": 1}}]}
        ]})),
        &registry,
    )
    .await;

    match report.get("Faulty.explode") {
        Some(NodeOutcome::Error { kind, error }) => {
            assert_eq!(*kind, FailureKind::Invocation);
            assert!(error.contains("provider exploded"));
        }
        other => panic!("Expected panic to be captured, got {other:?}"),
    }
    assert!(report.get("C.h").is_some_and(NodeOutcome::is_ok));
}

#[tokio::test]
async fn test_invoke_timeout() {
    let mut registry = registry();
    registry.register(Faulty, None);
    let executor = Executor::new(ExecutorConfig {
        parallel: false,
        invoke_timeout: Some(Duration::from_millis(50)),
    });

    let report = executor
        .execute(
            &pipeline(json!({"classes": [
                {"class_name": "Faulty", "methods": [{"method": "stall", "inputs": {}}]}
            ]})),
            &registry,
        )
        .await;

    match report.get("Faulty.stall") {
        Some(NodeOutcome::Error { kind, error }) => {
            assert_eq!(*kind, FailureKind::Invocation);
            assert!(error.contains("timed out"));
        }
        other => panic!("Expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_blocking_table_handler_times_out() {
    let mut registry = registry();
    registry.register(
        MethodTable::new("Sleepy").method("nap", "- description: Blocks.", |_| {
            std::thread::sleep(Duration::from_millis(400));
            Ok(json!("rested"))
        }),
        None,
    );
    let executor = Executor::new(ExecutorConfig {
        parallel: false,
        invoke_timeout: Some(Duration::from_millis(50)),
    });

    let report = executor
        .execute(
            &pipeline(json!({"classes": [
                {"class_name": "Sleepy", "methods": [{"method": "nap", "inputs": {}}]},
                {"class_name": "C", "methods": [{"method": "h", "inputs": {"x": 1}}]}
            ]})),
            &registry,
        )
        .await;

    match report.get("Sleepy.nap") {
        Some(NodeOutcome::Error { kind, error }) => {
            assert_eq!(*kind, FailureKind::Invocation);
            assert!(error.contains("timed out"));
        }
        other => panic!("Expected timeout, got {other:?}"),
    }
    assert_eq!(report.get("C.h").and_then(NodeOutcome::value), Some(&json!(1)));
}

#[tokio::test]
async fn test_parallel_matches_sequential() {
    let pipeline = pipeline(json!({"classes": [
        {"class_name": "A", "methods": [{"method": "f", "inputs": {"x": 2}}]},
        {"class_name": "B", "methods": [{"method": "g", "inputs": {"x": 5}}]},
        {"class_name": "Arithmetic", "methods": [
            {"method": "add", "inputs": {"a": "A.f", "b": "B.g"}},
            {"method": "divide", "inputs": {"a": "Arithmetic.add", "b": 0}}
        ]},
        {"class_name": "C", "methods": [{"method": "h", "inputs": {"x": "Arithmetic.divide"}}]}
    ]}));
    let registry = registry();

    let sequential = execute(&pipeline, &registry).await;
    let parallel = Executor::new(ExecutorConfig {
        parallel: true,
        invoke_timeout: None,
    })
    .execute(&pipeline, &registry)
    .await;

    assert_eq!(sequential.outcomes(), parallel.outcomes());
    assert_eq!(parallel.get("Arithmetic.add").and_then(NodeOutcome::value), Some(&json!(26)));
    let order = parallel.execution_order();
    let pos = |id: &str| order.iter().position(|n| n == id).unwrap();
    assert!(pos("A.f") < pos("Arithmetic.add"));
    assert!(pos("B.g") < pos("Arithmetic.add"));
}

#[tokio::test]
async fn test_cancelled_before_start_skips_everything() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = Executor::default()
        .execute_with_cancel(
            &pipeline(json!({"classes": [
                {"class_name": "A", "methods": [{"method": "f", "inputs": {"x": 1}}]},
                {"class_name": "C", "methods": [{"method": "h", "inputs": {"x": 1}}]}
            ]})),
            &registry(),
            &cancel,
        )
        .await;

    assert_eq!(report.skipped_count(), 2);
    assert_eq!(report.get("A.f"), Some(&NodeOutcome::skipped("cancelled")));
}

#[tokio::test]
async fn test_cancel_observed_between_nodes() {
    let cancel = CancellationToken::new();
    let mut registry = registry();
    registry.register(Canceller(cancel.clone()), None);

    let report = Executor::default()
        .execute_with_cancel(
            &pipeline(json!({"classes": [
                {"class_name": "Canceller", "methods": [{"method": "stop", "inputs": {}}]},
                {"class_name": "C", "methods": [{"method": "h", "inputs": {"x": 1}}]}
            ]})),
            &registry,
            &cancel,
        )
        .await;

    assert!(report.get("Canceller.stop").is_some_and(NodeOutcome::is_ok));
    assert_eq!(report.get("C.h"), Some(&NodeOutcome::skipped("cancelled")));
}
