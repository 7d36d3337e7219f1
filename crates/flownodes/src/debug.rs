use async_trait::async_trait;
use flowcore::{
    DataType, ExecutionContext, Node, NodeError, NodeMetadata, NodeOutput, PortDefinition,
    Value,
};

/// Simple debug node that logs its inputs
pub struct DebugNode;

#[async_trait]
impl Node for DebugNode {
    fn id(&self) -> &str {
        "debug.log"
    }

    fn name(&self) -> &str {
        "Debug Log"
    }

    fn node_type(&self) -> &str {
        "debug.log"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("debug", "Logs input values for debugging").with_tags(["log", "inspect"])
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::input("message", "Message", DataType::Any)]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("message", "Message", DataType::String)]
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        let message = match ctx.inputs.get("message") {
            Some(value) => value
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| value.to_json().to_string()),
            None => "(no message)".to_string(),
        };

        ctx.events.info(format!("DEBUG: {}", message));

        // Also log all inputs for visibility
        for (key, value) in &ctx.inputs {
            ctx.events.info(format!("  {}: {:?}", key, value));
        }

        ctx.events.data("message", Value::String(message.clone()));
        Ok(NodeOutput::new().with_output("message", message))
    }
}
