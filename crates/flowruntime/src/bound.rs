use async_trait::async_trait;
use flowcore::{
    ExecutionContext, Node, NodeError, NodeKind, NodeMetadata, NodeOutput, PortDefinition,
    ValidationReport, Value,
};
use std::collections::HashMap;
use std::sync::Arc;

/// A catalog node placed into a specific graph.
///
/// Leaf nodes are shared per type, so the id, display name and config of a
/// particular placement live here and the rest is delegated. The shared
/// instance belongs to the catalog: disposing a `BoundNode` leaves it alone.
pub struct BoundNode {
    id: String,
    name: String,
    config: HashMap<String, Value>,
    inner: Arc<dyn Node>,
}

impl BoundNode {
    pub fn new(id: impl Into<String>, inner: Arc<dyn Node>) -> Self {
        Self {
            id: id.into(),
            name: inner.name().to_string(),
            config: HashMap::new(),
            inner,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach placement config after checking it with the wrapped node.
    pub fn with_config(mut self, config: HashMap<String, Value>) -> Result<Self, NodeError> {
        self.inner.validate_config(&config)?;
        self.config = config;
        Ok(self)
    }

    pub fn inner(&self) -> &Arc<dyn Node> {
        &self.inner
    }

    pub fn config(&self) -> &HashMap<String, Value> {
        &self.config
    }
}

#[async_trait]
impl Node for BoundNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn node_type(&self) -> &str {
        self.inner.node_type()
    }

    fn metadata(&self) -> NodeMetadata {
        self.inner.metadata()
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        self.inner.input_ports()
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        self.inner.output_ports()
    }

    fn kind(&self) -> NodeKind {
        self.inner.kind()
    }

    async fn execute(&self, mut ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        for (key, value) in &self.config {
            ctx.config.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self.inner.execute(ctx).await
    }

    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::check_identity(&self.id, &self.name, self.node_type());
        report.merge(self.inner.validate());
        report
    }

    fn validate_config(&self, config: &HashMap<String, Value>) -> Result<(), NodeError> {
        self.inner.validate_config(config)
    }
}
