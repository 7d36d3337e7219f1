use flowcore::{Edge, GraphError, Node, ValidationReport};
use std::collections::HashSet;
use std::sync::Arc;

/// Children and edges owned by a composite node.
///
/// Children keep insertion order and unique ids. Edges must always name
/// current children; removing a child removes every edge touching it.
/// Cycles are allowed here and rejected when the graph is executed.
#[derive(Clone, Default)]
pub struct CompositeGraph {
    children: Vec<Arc<dyn Node>>,
    edges: Vec<Edge>,
}

impl CompositeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a graph from loaded parts. Child ids must be unique, but
    /// edges are taken as-is so a persisted graph with dangling edges can
    /// still be loaded and reported on by `validate_edges`.
    pub fn from_parts(children: Vec<Arc<dyn Node>>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        for child in children {
            graph.add_child(child)?;
        }
        graph.edges = edges;
        Ok(graph)
    }

    pub fn children(&self) -> &[Arc<dyn Node>] {
        &self.children
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn child(&self, id: &str) -> Option<&Arc<dyn Node>> {
        self.children.iter().find(|c| c.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.child(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn add_child(&mut self, child: Arc<dyn Node>) -> Result<(), GraphError> {
        if self.contains(child.id()) {
            return Err(GraphError::DuplicateChild(child.id().to_string()));
        }
        tracing::debug!(child_id = child.id(), node_type = child.node_type(), "Adding child");
        self.children.push(child);
        Ok(())
    }

    /// Remove a child and every edge that references it.
    pub fn remove_child(&mut self, id: &str) -> Result<Arc<dyn Node>, GraphError> {
        let position = self
            .children
            .iter()
            .position(|c| c.id() == id)
            .ok_or_else(|| GraphError::ChildNotFound(id.to_string()))?;

        let removed = self.children.remove(position);
        let before = self.edges.len();
        self.edges.retain(|e| !e.touches(id));
        tracing::debug!(
            child_id = id,
            removed_edges = before - self.edges.len(),
            "Removed child"
        );
        Ok(removed)
    }

    /// Replace every child at once. Edges left without an endpoint are dropped.
    pub fn set_children(&mut self, children: Vec<Arc<dyn Node>>) -> Result<(), GraphError> {
        let mut seen = HashSet::new();
        for child in &children {
            if !seen.insert(child.id().to_string()) {
                return Err(GraphError::DuplicateChild(child.id().to_string()));
            }
        }

        self.edges
            .retain(|e| seen.contains(&e.source.node_id) && seen.contains(&e.target.node_id));
        self.children = children;
        Ok(())
    }

    /// Connect an output of one child to an input of another.
    pub fn connect(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> Result<String, GraphError> {
        let edge = Edge::new(source, source_port, target, target_port);
        let id = edge.id.clone();
        self.add_edge(edge)?;
        Ok(id)
    }

    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if !self.contains(&edge.source.node_id) {
            return Err(GraphError::ChildNotFound(edge.source.node_id));
        }
        if !self.contains(&edge.target.node_id) {
            return Err(GraphError::ChildNotFound(edge.target.node_id));
        }
        if self.edges.iter().any(|e| e.id == edge.id) {
            return Err(GraphError::InvalidEdge(format!(
                "duplicate edge id {}",
                edge.id
            )));
        }
        self.edges.push(edge);
        Ok(())
    }

    pub fn disconnect(&mut self, edge_id: &str) -> Option<Edge> {
        let position = self.edges.iter().position(|e| e.id == edge_id)?;
        Some(self.edges.remove(position))
    }

    /// Referential integrity of the edge set.
    pub fn validate_edges(&self) -> ValidationReport {
        let mut report = ValidationReport::ok();
        for edge in &self.edges {
            if !self.contains(&edge.source.node_id) {
                report.push(format!(
                    "Edge {} references unknown source node {}",
                    edge.id, edge.source.node_id
                ));
            }
            if !self.contains(&edge.target.node_id) {
                report.push(format!(
                    "Edge {} references unknown target node {}",
                    edge.id, edge.target.node_id
                ));
            }
        }
        report
    }
}
