use async_trait::async_trait;
use flowcore::{
    DataType, ExecutionContext, Node, NodeError, NodeMetadata, NodeOutput, PortDefinition,
    Value,
};
use std::collections::HashMap;

/// Adds a configured `amount` to its numeric input
pub struct AddNode;

#[async_trait]
impl Node for AddNode {
    fn id(&self) -> &str {
        "math.add"
    }

    fn name(&self) -> &str {
        "Add"
    }

    fn node_type(&self) -> &str {
        "math.add"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("math", "Add a constant to a number").with_tags(["sum", "plus"])
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::input("value", "Value", DataType::Number)
            .required()
            .with_default(0.0)]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("result", "Result", DataType::Number)]
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), NodeError> {
        match config.get("amount") {
            Some(amount) if !amount.matches(DataType::Number) => Err(NodeError::Configuration(format!(
                "amount must be a number, got {}",
                amount.type_name()
            ))),
            _ => Ok(()),
        }
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        let value = ctx.require_number("value")?;

        let amount = ctx
            .get_config_or("amount", Value::Number(0.0))
            .as_f64()
            .unwrap_or_default();

        Ok(NodeOutput::new().with_output("result", value + amount))
    }
}
