use async_trait::async_trait;
use flowcore::{
    DataType, ExecutionContext, Node, NodeError, NodeMetadata, NodeOutput, PortDefinition,
};
use tokio::time::{sleep, Duration};

/// Delay execution for a specified duration
pub struct DelayNode;

#[async_trait]
impl Node for DelayNode {
    fn id(&self) -> &str {
        "time.delay"
    }

    fn name(&self) -> &str {
        "Delay"
    }

    fn node_type(&self) -> &str {
        "time.delay"
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::new("time", "Delay execution for specified milliseconds")
            .with_tags(["wait", "sleep"])
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::input("value", "Value", DataType::Any)]
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        vec![PortDefinition::output("value", "Value", DataType::Any)]
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        let delay_ms = ctx
            .config
            .get("delay_ms")
            .and_then(|v| v.as_f64())
            .unwrap_or(1000.0) as u64; // Default to 1 second if not specified

        ctx.events.info(format!("Delaying for {}ms", delay_ms));

        tokio::select! {
            _ = sleep(Duration::from_millis(delay_ms)) => {}
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        }
        ctx.report_progress(100.0, None);

        // Pass through any inputs
        Ok(NodeOutput {
            outputs: ctx.inputs.clone(),
            metadata: Default::default(),
        })
    }
}
