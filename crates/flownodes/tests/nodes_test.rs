use flowcore::{
    CompositeDefinition, ExecutionContext, ExecutionSettings, Node, NodeCatalog, NodeError,
    NodeSpec, Value,
};
use flownodes::{register_all, AddNode, DelayNode, JsonParseNode, JsonStringifyNode};
use flowruntime::{build_composite, FlowRuntime, NodeRegistry, RuntimeConfig};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

fn registry() -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    register_all(&mut registry);
    registry
}

#[test]
fn test_register_all_exposes_standard_types() {
    let registry = registry();

    assert_eq!(
        registry.list_node_types(),
        vec![
            "debug.log",
            "http.request",
            "math.add",
            "time.delay",
            "transform.json_parse",
            "transform.json_stringify",
        ]
    );
    assert_eq!(registry.metadata("math.add").unwrap().category, "math");
}

#[tokio::test]
async fn test_add_uses_configured_amount() {
    let ctx = ExecutionContext::new("add")
        .with_input("value", 2.0)
        .with_config("amount", 3.0);

    let output = AddNode.execute(ctx).await.unwrap();
    assert_eq!(output.outputs.get("result"), Some(&Value::Number(5.0)));
}

#[tokio::test]
async fn test_add_rejects_non_numeric_input() {
    let ctx = ExecutionContext::new("add").with_input("value", "two");

    let err = AddNode.execute(ctx).await.unwrap_err();
    assert!(matches!(err, NodeError::InvalidInputType { ref field, .. } if field == "value"));
}

#[tokio::test]
async fn test_raw_json_inputs_are_accepted_by_shape() {
    let ctx = ExecutionContext::new("add").with_input("value", serde_json::json!(4));
    let output = AddNode.execute(ctx).await.unwrap();
    assert_eq!(output.outputs.get("result"), Some(&Value::Number(4.0)));

    let ctx = ExecutionContext::new("parse").with_input("json", serde_json::json!("[true]"));
    let output = JsonParseNode.execute(ctx).await.unwrap();
    assert_eq!(
        output.outputs.get("parsed"),
        Some(&Value::Array(vec![Value::Bool(true)]))
    );

    let ctx = ExecutionContext::new("parse").with_input("json", serde_json::json!({"a": 1}));
    let err = JsonParseNode.execute(ctx).await.unwrap_err();
    assert_eq!(
        err,
        NodeError::InvalidInputType {
            field: "json".to_string(),
            expected: "string".to_string(),
            actual: "json".to_string(),
        }
    );
}

#[test]
fn test_add_validates_amount() {
    let mut config = HashMap::new();
    config.insert("amount".to_string(), Value::from("lots"));
    assert!(AddNode.validate_config(&config).is_err());

    config.insert("amount".to_string(), Value::Number(1.0));
    assert!(AddNode.validate_config(&config).is_ok());
}

#[tokio::test]
async fn test_json_parse_builds_structured_values() {
    let ctx = ExecutionContext::new("parse").with_input("json", r#"{"items": [1, 2]}"#);

    let output = JsonParseNode.execute(ctx).await.unwrap();
    let parsed = output.outputs.get("parsed").unwrap();
    let items = parsed.as_object().unwrap().get("items").unwrap();
    assert_eq!(
        items.as_array().unwrap(),
        &[Value::Number(1.0), Value::Number(2.0)]
    );
}

#[tokio::test]
async fn test_json_parse_reports_bad_input() {
    let ctx = ExecutionContext::new("parse").with_input("json", "{not json");

    let err = JsonParseNode.execute(ctx).await.unwrap_err();
    assert!(err.to_string().contains("JSON parse error"));
}

#[tokio::test]
async fn test_json_stringify_renders_compact_json() {
    let ctx = ExecutionContext::new("stringify").with_input("value", vec![Value::from(1.0)]);

    let output = JsonStringifyNode.execute(ctx).await.unwrap();
    assert_eq!(output.outputs.get("json"), Some(&Value::from("[1.0]")));
}

#[tokio::test]
async fn test_delay_passes_inputs_through() {
    let ctx = ExecutionContext::new("delay")
        .with_input("value", "kept")
        .with_config("delay_ms", 5.0);

    let output = DelayNode.execute(ctx).await.unwrap();
    assert_eq!(output.outputs.get("value"), Some(&Value::from("kept")));
}

#[tokio::test]
async fn test_delay_stops_when_cancelled() {
    let token = CancellationToken::new();
    let ctx = ExecutionContext::new("delay")
        .with_config("delay_ms", 10_000.0)
        .with_cancellation(token.clone());

    let started = Instant::now();
    let handle = tokio::spawn(async move { DelayNode.execute(ctx).await });
    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    let result = handle.await.unwrap();
    assert_eq!(result.unwrap_err(), NodeError::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

fn pipeline() -> CompositeDefinition {
    let mut def = CompositeDefinition::new("pipeline", "Pipeline");
    def.add_node(NodeSpec::new("parse", "transform.json_parse"));
    def.add_node(NodeSpec::new("wait", "time.delay").with_config("delay_ms", 1));
    def.add_node(NodeSpec::new("bump", "math.add").with_config("amount", 10));
    def.add_node(NodeSpec::new("render", "transform.json_stringify"));
    def.connect("parse", "parsed", "wait", "value");
    def.connect("wait", "value", "bump", "value");
    def.connect("bump", "result", "render", "value");
    def
}

#[tokio::test]
async fn test_definition_runs_through_standard_nodes() {
    let registry = registry();
    let composite = build_composite(&pipeline(), &registry).unwrap();

    let inputs: Vec<String> = composite.input_ports().into_iter().map(|p| p.id).collect();
    assert_eq!(inputs, vec!["parse_json"]);

    let result = composite
        .run(ExecutionContext::new("pipeline").with_input("parse_json", "32"))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.execution_order, vec!["parse", "wait", "bump", "render"]);
    assert_eq!(
        result.result("render").unwrap().output("json"),
        Some(&Value::from("42.0"))
    );
}

#[tokio::test]
async fn test_runtime_runs_pipeline_in_parallel_mode() {
    let mut def = pipeline();
    def.settings = Some(ExecutionSettings::parallel(4));

    let runtime = FlowRuntime::with_registry(Arc::new(registry()), RuntimeConfig::default());
    let mut inputs = HashMap::new();
    inputs.insert("parse_json".to_string(), Value::from("1"));

    let result = runtime.execute(&def, inputs).await.unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(
        result.result("bump").unwrap().output("result"),
        Some(&Value::Number(11.0))
    );
}

#[test]
fn test_singletons_resolve_by_type() {
    let registry = registry();
    let node = registry.resolve("time.delay").unwrap();

    assert_eq!(node.node_type(), "time.delay");
    assert!(!node.is_composite());
}

#[tokio::test]
async fn test_debug_streams_message_to_listeners() {
    let bus = flowcore::EventBus::new(16);
    let mut events = bus.subscribe();
    let emitter = bus.create_emitter(flowcore::ExecutionId::new_v4(), "log");
    let ctx = ExecutionContext::with_events("log", emitter).with_input("message", "hello");

    let output = flownodes::DebugNode.execute(ctx).await.unwrap();
    assert_eq!(output.outputs.get("message"), Some(&Value::from("hello")));

    let mut streamed = None;
    while let Ok(event) = events.try_recv() {
        if let flowcore::ExecutionEvent::NodeEvent {
            event: flowcore::NodeEvent::Data { port, value },
            ..
        } = event
        {
            streamed = Some((port, value));
        }
    }
    assert_eq!(streamed, Some(("message".to_string(), Value::from("hello"))));
}
