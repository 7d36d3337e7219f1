use crate::bound::BoundNode;
use crate::composite::CompositeNode;
use crate::graph::CompositeGraph;
use flowcore::{CompositeDefinition, GraphError, Node, NodeCatalog, NodeMetadata, Value};
use std::collections::HashMap;
use std::sync::Arc;

fn convert(map: &HashMap<String, serde_json::Value>) -> HashMap<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), Value::from_json(v.clone())))
        .collect()
}

/// Turn a definition into a runnable composite, resolving node types
/// through `catalog`.
///
/// Unknown types and rejected config fail the build. Edges are loaded
/// as-is; dangling ones show up in `validate()` and abort execution.
pub fn build_composite(
    definition: &CompositeDefinition,
    catalog: &dyn NodeCatalog,
) -> Result<CompositeNode, GraphError> {
    let mut children: Vec<Arc<dyn Node>> = Vec::with_capacity(definition.nodes.len());

    for spec in &definition.nodes {
        let node = catalog
            .resolve(&spec.node_type)
            .ok_or_else(|| GraphError::UnknownNodeType(spec.node_type.clone()))?;

        let mut bound = BoundNode::new(spec.id.clone(), node)
            .with_config(convert(&spec.config))
            .map_err(|e| GraphError::Invalid(format!("node {}: {}", spec.id, e)))?;
        if let Some(name) = &spec.name {
            bound = bound.with_name(name.clone());
        }

        children.push(Arc::new(bound));
    }

    let graph = CompositeGraph::from_parts(children, definition.edges.clone())?;

    let mut metadata = NodeMetadata::new(
        definition
            .category
            .clone()
            .unwrap_or_else(|| "composite".to_string()),
        definition.description.clone().unwrap_or_default(),
    );
    if let Some(version) = &definition.version {
        metadata = metadata.with_version(version.clone());
    }

    tracing::debug!(
        composite_id = %definition.id,
        nodes = definition.nodes.len(),
        edges = definition.edges.len(),
        "Built composite from definition"
    );

    Ok(CompositeNode::new(definition.id.clone(), definition.name.clone())
        .with_metadata(metadata)
        .with_settings(definition.settings.clone().unwrap_or_default())
        .with_variables(convert(&definition.variables))
        .with_graph(graph))
}
