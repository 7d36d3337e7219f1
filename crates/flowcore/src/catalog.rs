use crate::Node;
use std::sync::Arc;

/// Resolves a node-type name to a live node.
///
/// Whoever builds composite graphs receives a catalog explicitly; the core
/// never looks node types up on its own.
pub trait NodeCatalog: Send + Sync {
    fn resolve(&self, type_name: &str) -> Option<Arc<dyn Node>>;

    fn contains(&self, type_name: &str) -> bool {
        self.resolve(type_name).is_some()
    }
}
