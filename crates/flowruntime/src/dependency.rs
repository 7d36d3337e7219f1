use flowcore::{Edge, GraphError, NodeId};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Dependency structure of a composite's children.
///
/// Graph edges point from upstream to downstream, matching data flow; the
/// dependencies of a node are its incoming neighbours. The petgraph graph
/// only lives through `build`; both directions are resolved once there.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    node_to_index: HashMap<NodeId, NodeIndex>,
    order: Vec<NodeId>,
    upstream: HashMap<NodeId, Vec<NodeId>>,
    downstream: HashMap<NodeId, Vec<NodeId>>,
}

impl DependencyGraph {
    /// Build the graph from child ids (in their given order) and edges.
    pub fn build<I, S>(node_ids: I, edges: &[Edge]) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        let mut graph = DiGraph::new();
        let mut node_to_index = HashMap::new();
        let mut order = Vec::new();

        for id in node_ids {
            let id = id.into();
            if node_to_index.contains_key(&id) {
                return Err(GraphError::DuplicateChild(id));
            }
            let idx = graph.add_node(id.clone());
            node_to_index.insert(id.clone(), idx);
            order.push(id);
        }

        for edge in edges {
            let from_idx = node_to_index.get(&edge.source.node_id).ok_or_else(|| {
                GraphError::InvalidEdge(format!(
                    "edge {} references unknown source node {}",
                    edge.id, edge.source.node_id
                ))
            })?;
            let to_idx = node_to_index.get(&edge.target.node_id).ok_or_else(|| {
                GraphError::InvalidEdge(format!(
                    "edge {} references unknown target node {}",
                    edge.id, edge.target.node_id
                ))
            })?;

            graph.add_edge(*from_idx, *to_idx, ());
        }

        let mut upstream = HashMap::with_capacity(order.len());
        let mut downstream = HashMap::with_capacity(order.len());
        for id in &order {
            let idx = node_to_index[id];
            upstream.insert(id.clone(), neighbours(&graph, idx, Direction::Incoming));
            downstream.insert(id.clone(), neighbours(&graph, idx, Direction::Outgoing));
        }

        Ok(Self {
            node_to_index,
            order,
            upstream,
            downstream,
        })
    }

    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.node_to_index.contains_key(node_id)
    }

    /// Upstream nodes `node_id` waits for, in edge order.
    pub fn dependencies(&self, node_id: &str) -> &[NodeId] {
        self.upstream.get(node_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Downstream nodes waiting on `node_id`.
    pub fn dependents(&self, node_id: &str) -> &[NodeId] {
        self.downstream.get(node_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Reverse adjacency map: every child to its dependency list.
    pub fn to_map(&self) -> HashMap<NodeId, Vec<NodeId>> {
        self.upstream.clone()
    }

    /// Depth-first ordering with dependencies ahead of their dependents.
    ///
    /// Children are visited in their given order so the result is
    /// deterministic. Fails with the first node found on a cycle. The walk
    /// keeps its own stack, so chain depth is bounded by memory only.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut visiting: HashSet<&NodeId> = HashSet::new();
        let mut visited: HashSet<&NodeId> = HashSet::new();
        let mut sorted = Vec::with_capacity(self.order.len());
        // (node, index of the next dependency to look at)
        let mut stack: Vec<(&NodeId, usize)> = Vec::new();

        for root in &self.order {
            if visited.contains(root) {
                continue;
            }
            visiting.insert(root);
            stack.push((root, 0));

            while let Some(top) = stack.last_mut() {
                let node_id: &NodeId = top.0;

                if let Some(dependency) = self.dependencies(node_id).get(top.1) {
                    top.1 += 1;
                    if visited.contains(dependency) {
                        continue;
                    }
                    if !visiting.insert(dependency) {
                        return Err(GraphError::CyclicDependency {
                            node_id: dependency.clone(),
                        });
                    }
                    stack.push((dependency, 0));
                } else {
                    stack.pop();
                    visiting.remove(node_id);
                    visited.insert(node_id);
                    sorted.push(node_id.clone());
                }
            }
        }

        Ok(sorted)
    }
}

fn neighbours(graph: &DiGraph<NodeId, ()>, idx: NodeIndex, direction: Direction) -> Vec<NodeId> {
    // petgraph walks adjacency lists newest first
    let mut edges: Vec<_> = graph.edges_directed(idx, direction).collect();
    edges.sort_by_key(|e| e.id());

    let mut ids: Vec<NodeId> = Vec::new();
    for edge in edges {
        let other = match direction {
            Direction::Incoming => edge.source(),
            Direction::Outgoing => edge.target(),
        };
        let id = &graph[other];
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str) -> Edge {
        Edge::new(from, "out", to, "in")
    }

    #[test]
    fn nodes_without_incoming_edges_have_no_dependencies() {
        let graph = DependencyGraph::build(["a", "b"], &[edge("a", "b")]).unwrap();
        let map = graph.to_map();
        assert!(map["a"].is_empty());
        assert_eq!(map["b"], vec!["a".to_string()]);
    }

    #[test]
    fn parallel_edges_count_once() {
        let edges = [edge("a", "b"), Edge::new("a", "other", "b", "second")];
        let graph = DependencyGraph::build(["a", "b"], &edges).unwrap();
        assert_eq!(graph.dependencies("b"), ["a".to_string()]);
        assert_eq!(graph.dependents("a"), ["b".to_string()]);
    }

    #[test]
    fn order_follows_dependencies_not_insertion() {
        let edges = [edge("c", "b"), edge("b", "a")];
        let graph = DependencyGraph::build(["a", "b", "c"], &edges).unwrap();
        assert_eq!(graph.topological_order().unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn independent_nodes_keep_given_order() {
        let graph = DependencyGraph::build(["x", "y", "z"], &[]).unwrap();
        assert_eq!(graph.topological_order().unwrap(), vec!["x", "y", "z"]);
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let graph = DependencyGraph::build(["a"], &[edge("a", "a")]).unwrap();
        assert_eq!(
            graph.topological_order(),
            Err(GraphError::CyclicDependency {
                node_id: "a".to_string()
            })
        );
    }

    #[test]
    fn unknown_endpoint_is_rejected() {
        let err = DependencyGraph::build(["a"], &[edge("a", "ghost")]).unwrap_err();
        assert!(matches!(err, GraphError::InvalidEdge(msg) if msg.contains("ghost")));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = DependencyGraph::build(["a", "a"], &[]).unwrap_err();
        assert_eq!(err, GraphError::DuplicateChild("a".to_string()));
    }

    #[test]
    fn long_chain_does_not_exhaust_the_stack() {
        let ids: Vec<String> = (0..50_000).map(|i| format!("n{}", i)).collect();
        let edges: Vec<Edge> = ids.windows(2).map(|w| edge(&w[0], &w[1])).collect();
        // last node first, so the walk has to descend the whole chain
        let graph = DependencyGraph::build(ids.iter().rev().cloned(), &edges).unwrap();

        assert_eq!(graph.topological_order().unwrap(), ids);
    }

    #[test]
    fn cycle_reached_through_a_chain_names_the_reentered_node() {
        let edges = [edge("a", "b"), edge("b", "c"), edge("c", "a")];
        let graph = DependencyGraph::build(["a", "b", "c"], &edges).unwrap();
        assert_eq!(
            graph.topological_order(),
            Err(GraphError::CyclicDependency {
                node_id: "a".to_string()
            })
        );
    }
}
