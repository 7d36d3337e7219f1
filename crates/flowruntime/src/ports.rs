//! Port aggregation for composite nodes.
//!
//! A composite exposes the union of its children's ports: every child input
//! that no internal edge feeds, and every child output. Nothing is cached,
//! so edits to the graph show up on the next read.

use flowcore::port::{exposed_port_id, exposed_port_name};
use flowcore::{Edge, Node, PortDefinition};
use std::sync::Arc;

fn expose(child: &dyn Node, port: PortDefinition) -> PortDefinition {
    PortDefinition {
        id: exposed_port_id(child.id(), &port.id),
        name: exposed_port_name(child.name(), &port.name),
        ..port
    }
}

fn is_connected(edges: &[Edge], child_id: &str, port_id: &str) -> bool {
    edges
        .iter()
        .any(|e| e.target.node_id == child_id && e.target.port_id == port_id)
}

/// Child inputs not targeted by any edge, in child order then port order.
pub fn collect_unconnected_inputs(
    children: &[Arc<dyn Node>],
    edges: &[Edge],
) -> Vec<PortDefinition> {
    children
        .iter()
        .flat_map(|child| {
            child
                .input_ports()
                .into_iter()
                .filter(|port| !is_connected(edges, child.id(), &port.id))
                .map(|port| expose(child.as_ref(), port))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Every child output, connected or not.
pub fn collect_outputs(children: &[Arc<dyn Node>]) -> Vec<PortDefinition> {
    children
        .iter()
        .flat_map(|child| {
            child
                .output_ports()
                .into_iter()
                .map(|port| expose(child.as_ref(), port))
                .collect::<Vec<_>>()
        })
        .collect()
}
