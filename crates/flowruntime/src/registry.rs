use flowcore::{Node, NodeCatalog, NodeMetadata};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of available node types, one shared instance per type.
///
/// Pass it to whatever builds graphs; there is no process-wide instance.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn Node>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Register a node under its `node_type`, replacing any previous entry.
    pub fn register(&mut self, node: Arc<dyn Node>) -> Option<Arc<dyn Node>> {
        let node_type = node.node_type().to_string();
        tracing::info!("Registering node type: {}", node_type);
        self.nodes.insert(node_type, node)
    }

    pub fn unregister(&mut self, node_type: &str) -> Option<Arc<dyn Node>> {
        self.nodes.remove(node_type)
    }

    /// Get all registered node types, sorted
    pub fn list_node_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.nodes.keys().cloned().collect();
        types.sort();
        types
    }

    /// Get metadata for a node type
    pub fn metadata(&self, node_type: &str) -> Option<NodeMetadata> {
        self.nodes.get(node_type).map(|n| n.metadata())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forget every registration.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Dispose every registered instance. Failures are logged, not returned.
    pub async fn dispose_all(&self) {
        for (node_type, node) in &self.nodes {
            if let Err(e) = node.dispose().await {
                tracing::warn!("Failed to dispose node type {}: {}", node_type, e);
            }
        }
    }
}

impl NodeCatalog for NodeRegistry {
    fn resolve(&self, type_name: &str) -> Option<Arc<dyn Node>> {
        self.nodes.get(type_name).cloned()
    }
}
