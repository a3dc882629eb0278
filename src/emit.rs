use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::{
    bypass::{trace_through_bypassed, GraphIndex},
    classify::classify_nodes,
    expand::FlatGraph,
    registry::NodeRegistry,
    widgets::decode_widgets,
};

/// Flat, execution-ready program: node key → class, resolved inputs, metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Program(pub IndexMap<String, ProgramNode>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramNode {
    pub inputs: IndexMap<String, Value>,
    pub class_type: String,
    #[serde(rename = "_meta")]
    pub meta: NodeMeta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMeta {
    pub title: String,
}

/// Assemble the program from a flattened graph: classify every node, resolve
/// each surviving node's connections, and merge widgets, folded constants and
/// connections in the schema's declared order.
pub fn emit_program(graph: &FlatGraph, registry: &dyn NodeRegistry) -> Program {
    let classes = classify_nodes(&graph.nodes, registry);
    let index = GraphIndex::build(&graph.nodes, &graph.links);
    let mut program = Program::default();

    for flat in &graph.nodes {
        let node = &flat.node;
        if node.node_type.is_empty() {
            continue;
        }
        if classes.bypassed.contains(&flat.key) || classes.excluded.contains(&flat.key) {
            continue;
        }

        let mut link_inputs: IndexMap<String, Value> = IndexMap::new();
        let mut primitive_inputs: IndexMap<String, Value> = IndexMap::new();

        for input in &node.inputs {
            if input.name.is_empty() {
                continue;
            }
            let Some(link) = input.link.and_then(|id| index.links.get(&id).copied()) else {
                continue;
            };
            let (origin, slot) = trace_through_bypassed(
                &index,
                &classes.bypassed,
                link.origin.clone(),
                link.origin_slot,
            );
            if let Some(value) = classes.primitives.get(&origin) {
                // Folded constant: lands as a literal, ordered like a widget.
                primitive_inputs.insert(input.name.clone(), value.clone());
            } else if classes.excluded.contains(&origin) {
                debug!(node = %flat.key, input = %input.name, source = %origin,
                    "dropping input fed by excluded node");
            } else if classes.bypassed.contains(&origin) {
                warn!(node = %flat.key, input = %input.name, source = %origin,
                    "bypass chain has no live source; dropping connection");
            } else if !index.nodes.contains_key(&origin) {
                debug!(node = %flat.key, input = %input.name, source = %origin,
                    "dropping input referencing a missing node");
            } else {
                if origin != link.origin {
                    debug!(node = %flat.key, input = %input.name, from = %link.origin, to = %origin,
                        "rerouted input around bypassed node(s)");
                }
                link_inputs.insert(
                    input.name.clone(),
                    Value::Array(vec![Value::String(origin.to_string()), Value::from(slot)]),
                );
            }
        }

        let connected: HashSet<String> = link_inputs
            .keys()
            .chain(primitive_inputs.keys())
            .cloned()
            .collect();
        let widget_inputs = decode_widgets(&flat.key, node, &connected, registry);

        // Widgets and folded constants first, then connections, both in the
        // declared order; leftovers keep encounter order so unknown or legacy
        // inputs are never silently lost.
        let order = registry.input_order(node.schema_type());
        let mut inputs: IndexMap<String, Value> = IndexMap::new();
        for name in &order {
            if let Some(value) = widget_inputs.get(name) {
                inputs.insert(name.clone(), value.clone());
            } else if let Some(value) = primitive_inputs.get(name) {
                inputs.insert(name.clone(), value.clone());
            }
        }
        for name in &order {
            if inputs.contains_key(name) {
                continue;
            }
            if let Some(value) = link_inputs.get(name) {
                inputs.insert(name.clone(), value.clone());
            }
        }
        for (name, value) in widget_inputs
            .iter()
            .chain(&primitive_inputs)
            .chain(&link_inputs)
        {
            if !inputs.contains_key(name) {
                inputs.insert(name.clone(), value.clone());
            }
        }

        let title = node
            .title
            .clone()
            .or_else(|| registry.display_name(node.schema_type()))
            .unwrap_or_else(|| node.node_type.clone());

        program.0.insert(
            flat.key.to_string(),
            ProgramNode {
                inputs,
                class_type: node.node_type.clone(),
                meta: NodeMeta { title },
            },
        );
    }

    program
}
