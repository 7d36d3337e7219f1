use crate::executor::CompositeExecutor;
use crate::graph::CompositeGraph;
use crate::ports::{collect_outputs, collect_unconnected_inputs};
use async_trait::async_trait;
use flowcore::{
    CompositeExecutionResult, Edge, ExecutionContext, ExecutionSettings, GraphError, Node,
    NodeError, NodeKind, NodeMetadata, NodeOutput, PortDefinition, ValidationReport, Value,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

pub const COMPOSITE_NODE_TYPE: &str = "composite";

/// A node whose work is running a graph of child nodes.
///
/// The graph is read afresh on every run, so edits made between runs are
/// always honoured. Ports are derived from the children on every call.
pub struct CompositeNode {
    id: String,
    name: String,
    node_type: String,
    metadata: NodeMetadata,
    settings: ExecutionSettings,
    variables: HashMap<String, Value>,
    graph: CompositeGraph,
    disposed: AtomicBool,
}

impl std::fmt::Debug for CompositeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeNode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("node_type", &self.node_type)
            .finish_non_exhaustive()
    }
}

impl CompositeNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type: COMPOSITE_NODE_TYPE.to_string(),
            metadata: NodeMetadata::new("composite", ""),
            settings: ExecutionSettings::default(),
            variables: HashMap::new(),
            graph: CompositeGraph::new(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Register under a custom type name, e.g. when exposed through a catalog.
    pub fn with_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = node_type.into();
        self
    }

    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_variables(mut self, variables: HashMap<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_graph(mut self, graph: CompositeGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn settings(&self) -> &ExecutionSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ExecutionSettings) {
        self.settings = settings;
    }

    pub fn graph(&self) -> &CompositeGraph {
        &self.graph
    }

    pub fn children(&self) -> &[Arc<dyn Node>] {
        self.graph.children()
    }

    pub fn edges(&self) -> &[Edge] {
        self.graph.edges()
    }

    pub fn add_child(&mut self, child: Arc<dyn Node>) -> Result<(), GraphError> {
        self.graph.add_child(child)
    }

    pub fn remove_child(&mut self, id: &str) -> Result<Arc<dyn Node>, GraphError> {
        self.graph.remove_child(id)
    }

    pub fn set_children(&mut self, children: Vec<Arc<dyn Node>>) -> Result<(), GraphError> {
        self.graph.set_children(children)
    }

    pub fn connect(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Result<String, GraphError> {
        self.graph.connect(source, source_port, target, target_port)
    }

    pub fn disconnect(&mut self, edge_id: &str) -> Option<Edge> {
        self.graph.disconnect(edge_id)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Run the children and keep the per-child detail.
    pub async fn run(&self, ctx: ExecutionContext) -> CompositeExecutionResult {
        if self.is_disposed() {
            return CompositeExecutionResult::failure(NodeError::Disposed.to_string(), Duration::ZERO);
        }

        let mut ctx = ctx;
        if !self.variables.is_empty() {
            let mut variables = self.variables.clone();
            variables.extend(ctx.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
            ctx.variables = Arc::new(variables);
        }

        let span = ctx.span.clone();
        CompositeExecutor::new(self.settings.clone())
            .execute(self.graph.children(), self.graph.edges(), &ctx)
            .instrument(span)
            .await
    }
}

#[async_trait]
impl Node for CompositeNode {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn node_type(&self) -> &str {
        &self.node_type
    }

    fn metadata(&self) -> NodeMetadata {
        self.metadata.clone()
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        collect_unconnected_inputs(self.graph.children(), self.graph.edges())
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        collect_outputs(self.graph.children())
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Composite
    }

    async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError> {
        self.run(ctx).await.into_output()
    }

    fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::check_identity(&self.id, &self.name, &self.node_type);
        for child in self.graph.children() {
            let label = format!("Child '{}'", child.id());
            report.merge(child.validate().prefixed(&label));
        }
        report.merge(self.graph.validate_edges());
        report
    }

    async fn dispose(&self) -> Result<(), NodeError> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        tracing::debug!(composite_id = %self.id, "Disposing composite");
        let mut first_error = None;
        for child in self.graph.children() {
            if let Err(e) = child.dispose().await {
                tracing::warn!(child_id = child.id(), "Failed to dispose child: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
