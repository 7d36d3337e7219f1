use crate::{ExecutionContext, NodeError, NodeMetadata, PortDefinition, Value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a node, unique within its parent's child set.
pub type NodeId = String;

/// Discriminates leaf nodes from nodes that orchestrate a child graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Atomic,
    Composite,
}

/// Core trait that all executable nodes implement.
///
/// Atomic and composite nodes share this contract, so a composite can hold
/// other composites as children and a conductor never needs to tell them
/// apart.
#[async_trait]
pub trait Node: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Unique type identifier (e.g., "http.request", "transform.json_parse")
    fn node_type(&self) -> &str;

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata::default()
    }

    fn input_ports(&self) -> Vec<PortDefinition> {
        Vec::new()
    }

    fn output_ports(&self) -> Vec<PortDefinition> {
        Vec::new()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Atomic
    }

    fn is_composite(&self) -> bool {
        self.kind() == NodeKind::Composite
    }

    /// Execute the node with given context
    async fn execute(&self, ctx: ExecutionContext) -> Result<NodeOutput, NodeError>;

    /// Structural self-check. Must not panic.
    fn validate(&self) -> ValidationReport {
        ValidationReport::check_identity(self.id(), self.name(), self.node_type())
    }

    /// Optional: Validate configuration at graph build time
    fn validate_config(&self, _config: &HashMap<String, Value>) -> Result<(), NodeError> {
        Ok(())
    }

    /// Release held resources. Calling it again is a no-op.
    async fn dispose(&self) -> Result<(), NodeError> {
        Ok(())
    }
}

/// Output from node execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOutput {
    /// Output port values
    pub outputs: HashMap<String, Value>,

    /// Free-form execution metadata
    pub metadata: HashMap<String, Value>,
}

impl NodeOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, port: impl Into<String>, value: impl Into<Value>) -> Self {
        self.outputs.insert(port.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }

    pub fn check_identity(id: &str, name: &str, node_type: &str) -> Self {
        let mut errors = Vec::new();
        if id.trim().is_empty() {
            errors.push("Node id is required".to_string());
        }
        if name.trim().is_empty() {
            errors.push(format!("Node '{}' has no name", id));
        }
        if node_type.trim().is_empty() {
            errors.push(format!("Node '{}' has no type", id));
        }
        Self::from_errors(errors)
    }

    pub fn push(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.valid = false;
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
    }

    /// Prefix every error with a label, e.g. the child it came from.
    pub fn prefixed(self, label: &str) -> Self {
        Self {
            valid: self.valid,
            errors: self
                .errors
                .into_iter()
                .map(|e| format!("{}: {}", label, e))
                .collect(),
        }
    }
}
