use async_trait::async_trait;
use flowcore::{
    DataType, ExecutionContext, Node, NodeError, NodeMetadata, NodeOutput, PortDefinition,
    Value,
};

/// Parse JSON string to Value
pub struct JsonParseNode;

#[async_trait]
impl Node for JsonParseNode {
    fn id(&self) -> &str {
        "transform.json_parse"
    }

    fn name(&self) -> &str {
        "JSON Parse"
    }

    fn node_type(&self) -> &str {
        "transform.json_parse"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("transform", "Parse JSON string").with_tags(["json", "decode"])
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::input("json", "JSON", DataType::String).required()]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("parsed", "Parsed", DataType::Any)]
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        let text = ctx.require_str("json")?;

        let parsed: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| NodeError::ExecutionFailed(format!("JSON parse error: {}", e)))?;

        Ok(NodeOutput::new().with_output("parsed", Value::from_json(parsed)))
    }
}

/// Stringify Value to JSON
pub struct JsonStringifyNode;

#[async_trait]
impl Node for JsonStringifyNode {
    fn id(&self) -> &str {
        "transform.json_stringify"
    }

    fn name(&self) -> &str {
        "JSON Stringify"
    }

    fn node_type(&self) -> &str {
        "transform.json_stringify"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("transform", "Convert value to JSON string")
            .with_tags(["json", "encode"])
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::input("value", "Value", DataType::Any).required()]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("json", "JSON", DataType::String)]
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        let value = ctx.require_input("value")?;

        let pretty = ctx
            .get_config_or("pretty", Value::Bool(false))
            .as_bool()
            .unwrap_or(false);
        let rendered = if pretty {
            serde_json::to_string_pretty(&value.to_json())
        } else {
            serde_json::to_string(&value.to_json())
        }
        .map_err(|e| NodeError::ExecutionFailed(format!("JSON stringify error: {}", e)))?;

        Ok(NodeOutput::new().with_output("json", rendered))
    }
}
