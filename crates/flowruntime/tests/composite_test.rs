mod common;

use common::*;
use flowcore::{
    Edge, ExecutionContext, ExecutionSettings, GraphError, Node, NodeKind, Value,
};
use flowruntime::{CompositeGraph, CompositeNode};
use std::sync::Arc;

fn chain() -> CompositeNode {
    let mut composite = CompositeNode::new("chain", "Chain");
    composite.add_child(AddNode::new("A", 1.0)).unwrap();
    composite.add_child(AddNode::new("B", 2.0)).unwrap();
    composite.connect("A", "result", "B", "value").unwrap();
    composite
}

#[test]
fn test_only_unconnected_inputs_are_exposed() {
    let composite = chain();

    let inputs = composite.input_ports();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].id, "A_value");
    assert_eq!(inputs[0].name, "A - Value");
    assert!(inputs[0].required, "attributes are copied");

    let outputs: Vec<String> = composite.output_ports().into_iter().map(|p| p.id).collect();
    assert_eq!(outputs, vec!["A_result", "B_result"]);
}

#[test]
fn test_ports_follow_graph_edits() {
    let mut composite = chain();
    let edge_id = composite.edges()[0].id.clone();

    composite.disconnect(&edge_id).unwrap();
    let inputs: Vec<String> = composite.input_ports().into_iter().map(|p| p.id).collect();
    assert_eq!(inputs, vec!["A_value", "B_value"]);

    composite.remove_child("A").unwrap();
    let inputs: Vec<String> = composite.input_ports().into_iter().map(|p| p.id).collect();
    assert_eq!(inputs, vec!["B_value"]);
}

#[test]
fn test_removing_child_removes_its_edges() {
    let mut composite = chain();
    composite.add_child(AddNode::new("C", 3.0)).unwrap();
    composite.connect("B", "result", "C", "value").unwrap();
    assert_eq!(composite.edges().len(), 2);

    composite.remove_child("B").unwrap();

    assert!(composite.edges().is_empty());
    let report = composite.validate();
    assert!(report.valid, "unexpected errors: {:?}", report.errors);
}

#[test]
fn test_connect_rejects_unknown_children() {
    let mut composite = chain();

    assert_eq!(
        composite.connect("A", "result", "missing", "value"),
        Err(GraphError::ChildNotFound("missing".to_string()))
    );
    assert_eq!(composite.edges().len(), 1);
}

#[test]
fn test_duplicate_child_is_rejected() {
    let mut composite = chain();
    assert_eq!(
        composite.add_child(AddNode::new("A", 9.0)),
        Err(GraphError::DuplicateChild("A".to_string()))
    );
}

#[test]
fn test_set_children_prunes_dangling_edges() {
    let mut composite = chain();
    composite
        .set_children(vec![AddNode::new("A", 1.0), AddNode::new("Z", 1.0)])
        .unwrap();

    assert!(composite.edges().is_empty());
    assert_eq!(composite.children().len(), 2);
}

#[test]
fn test_validate_collects_child_and_edge_errors() {
    let graph = CompositeGraph::from_parts(
        vec![AddNode::new("A", 1.0), AddNode::new("", 1.0)],
        vec![Edge::new("A", "result", "ghost", "value").with_id("e1")],
    )
    .unwrap();
    let composite = CompositeNode::new("broken", "Broken").with_graph(graph);

    let report = composite.validate();

    assert!(!report.valid);
    assert!(report
        .errors
        .iter()
        .any(|e| e.starts_with("Child ''") && e.contains("Node id is required")));
    assert!(report
        .errors
        .contains(&"Edge e1 references unknown target node ghost".to_string()));
}

#[test]
fn test_composite_identifies_itself() {
    let composite = chain();
    assert_eq!(composite.kind(), NodeKind::Composite);
    assert!(composite.is_composite());
    assert!(!AddNode::new("x", 0.0).is_composite());
}

#[tokio::test]
async fn test_execute_exposes_child_outputs() {
    let composite = chain();
    let ctx = ExecutionContext::new("chain").with_input("A_value", 10.0);

    let output = composite.execute(ctx).await.unwrap();

    assert_eq!(output.outputs.get("A_result"), Some(&Value::Number(11.0)));
    assert_eq!(output.outputs.get("B_result"), Some(&Value::Number(13.0)));
    assert_eq!(output.metadata.get("completed_nodes"), Some(&Value::Number(2.0)));
}

#[tokio::test]
async fn test_failed_run_is_a_failed_execute() {
    let mut composite = CompositeNode::new("bad", "Bad");
    composite.add_child(FailNode::new("F", "nope")).unwrap();

    let err = composite
        .execute(ExecutionContext::new("bad"))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("Node F failed"));
}

#[tokio::test]
async fn test_composites_nest_without_special_casing() {
    let inner: Arc<dyn Node> = Arc::new(chain());

    let mut outer = CompositeNode::new("outer", "Outer")
        .with_settings(ExecutionSettings::parallel(2));
    outer.add_child(ConstNode::new("seed", 5.0)).unwrap();
    outer.add_child(inner).unwrap();
    outer.add_child(AddNode::new("tail", 100.0)).unwrap();
    outer.connect("seed", "out", "chain", "A_value").unwrap();
    outer.connect("chain", "B_result", "tail", "value").unwrap();

    assert!(outer.input_ports().is_empty());

    let result = outer.run(ExecutionContext::new("outer")).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.execution_order, vec!["seed", "chain", "tail"]);
    assert_eq!(
        result.result("tail").unwrap().output("result"),
        Some(&Value::Number(108.0))
    );
}

#[tokio::test]
async fn test_edits_between_runs_are_honoured() {
    let mut composite = chain();
    let ctx = || ExecutionContext::new("chain").with_input("A_value", 0.0);

    let first = composite.run(ctx()).await;
    assert_eq!(first.execution_order, vec!["A", "B"]);

    composite.add_child(AddNode::new("C", 10.0)).unwrap();
    composite.connect("B", "result", "C", "value").unwrap();
    let second = composite.run(ctx()).await;

    assert_eq!(second.execution_order, vec!["A", "B", "C"]);
    assert_eq!(
        second.result("C").unwrap().output("result"),
        Some(&Value::Number(13.0))
    );
}

#[tokio::test]
async fn test_cycle_introduced_by_edit_fails_next_run() {
    let mut composite = chain();
    composite.connect("B", "result", "A", "value").unwrap();

    let result = composite.run(ExecutionContext::new("chain")).await;

    assert!(!result.success);
    assert!(result.node_results.is_empty());
    assert!(result.error.unwrap().contains("Circular dependency"));
}

#[tokio::test]
async fn test_dispose_is_recursive_and_idempotent() {
    let leaf = DisposableNode::new("leaf");
    let mut inner = CompositeNode::new("inner", "Inner");
    inner.add_child(leaf.clone()).unwrap();

    let mut outer = CompositeNode::new("outer", "Outer");
    outer.add_child(Arc::new(inner)).unwrap();

    outer.dispose().await.unwrap();
    outer.dispose().await.unwrap();

    assert_eq!(leaf.dispose_count(), 1);
    assert!(outer.is_disposed());

    let result = outer.run(ExecutionContext::new("outer")).await;
    assert!(!result.success);
}

#[tokio::test]
async fn test_variables_reach_children() {
    use async_trait::async_trait;
    use flowcore::{NodeError, NodeOutput};
    use std::collections::HashMap;

    struct ReadVar;

    #[async_trait]
    impl Node for ReadVar {
        fn id(&self) -> &str {
            "read"
        }
        fn name(&self) -> &str {
            "Read"
        }
        fn node_type(&self) -> &str {
            "test.read_var"
        }
        async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
            let value = ctx.variables.get("greeting").cloned().unwrap_or(Value::Null);
            Ok(NodeOutput::new().with_output("greeting", value))
        }
    }

    let mut variables = HashMap::new();
    variables.insert("greeting".to_string(), Value::from("hello"));
    let mut composite = CompositeNode::new("vars", "Vars").with_variables(variables);
    composite.add_child(Arc::new(ReadVar)).unwrap();

    let output = composite.execute(ExecutionContext::new("vars")).await.unwrap();
    assert_eq!(output.outputs.get("read_greeting"), Some(&Value::from("hello")));
}
