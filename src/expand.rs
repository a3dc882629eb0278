use std::collections::HashMap;
use tracing::{debug, warn};

use crate::{
    model::{GraphDoc, GraphNode, Link, NodeKey, SubgraphDef, INPUT_PSEUDO_NODE, OUTPUT_PSEUDO_NODE},
    util::is_subgraph_type,
};

/// Expansion passes before assuming a circular subgraph reference.
const MAX_EXPANSION_PASSES: usize = 10;

/// A node of the flattened graph, keyed by its expansion path.
#[derive(Debug, Clone)]
pub struct FlatNode {
    pub key: NodeKey,
    pub node: GraphNode,
}

/// A link of the flattened graph, with path-keyed endpoints.
#[derive(Debug, Clone)]
pub struct FlatLink {
    pub id: i64,
    pub origin: NodeKey,
    pub origin_slot: i64,
    pub target: NodeKey,
    pub target_slot: i64,
}

#[derive(Debug, Clone, Default)]
pub struct FlatGraph {
    pub nodes: Vec<FlatNode>,
    pub links: Vec<FlatLink>,
}

type SlotMap = HashMap<i64, (NodeKey, i64)>;

/// Inline every subgraph instance until none remain, then point every
/// boundary-crossing link at the concrete internal node it reaches.
pub fn expand_graph(graph: GraphDoc) -> FlatGraph {
    let GraphDoc {
        nodes,
        links,
        definitions,
    } = graph;
    let defs: HashMap<&str, &SubgraphDef> = definitions
        .subgraphs
        .iter()
        .map(|def| (def.id.as_str(), def))
        .collect();

    let mut nodes: Vec<FlatNode> = nodes
        .into_iter()
        .map(|node| FlatNode {
            key: NodeKey::root(node.id),
            node,
        })
        .collect();
    let mut links: Vec<FlatLink> = links
        .iter()
        .map(|link| FlatLink {
            id: link.id,
            origin: NodeKey::root(link.origin_id),
            origin_slot: link.origin_slot,
            target: NodeKey::root(link.target_id),
            target_slot: link.target_slot,
        })
        .collect();

    // Copied internal links get fresh ids. Subgraph definitions number their
    // links from 1 just like the outer workflow, so keeping the originals
    // would alias distinct links in the id index.
    let mut next_link_id = links.iter().map(|link| link.id).max().unwrap_or(0) + 1;

    // Per-instance boundary maps, used afterwards to rewrite links that cross
    // into or out of an inlined subgraph.
    let mut input_maps: HashMap<NodeKey, SlotMap> = HashMap::new();
    let mut output_maps: HashMap<NodeKey, SlotMap> = HashMap::new();

    let mut pass = 0;
    loop {
        pass += 1;
        let mut kept: Vec<FlatNode> = Vec::with_capacity(nodes.len());
        let mut found = false;
        for flat in nodes {
            let def = is_subgraph_type(&flat.node.node_type)
                .then(|| defs.get(flat.node.node_type.as_str()).copied())
                .flatten();
            match def {
                Some(def) => {
                    found = true;
                    debug!(instance = %flat.key, subgraph = %def.id, pass, "inlining subgraph instance");
                    expand_instance(
                        &flat.key,
                        def,
                        &mut kept,
                        &mut links,
                        &mut next_link_id,
                        &mut input_maps,
                        &mut output_maps,
                    );
                }
                None => kept.push(flat),
            }
        }
        nodes = kept;
        if !found {
            break;
        }
        if pass >= MAX_EXPANSION_PASSES {
            warn!(
                "subgraph expansion did not settle after {MAX_EXPANSION_PASSES} passes; \
                 possible circular subgraph reference"
            );
            break;
        }
    }

    // Rewrite links through the boundary maps. A rewritten target means the
    // consuming node's input slot must pick up the external link id.
    let mut input_updates: HashMap<NodeKey, HashMap<i64, i64>> = HashMap::new();
    for link in &mut links {
        let (origin, origin_slot) =
            resolve_through(&output_maps, link.origin.clone(), link.origin_slot);
        link.origin = origin;
        link.origin_slot = origin_slot;

        let (target, target_slot) =
            resolve_through(&input_maps, link.target.clone(), link.target_slot);
        if target != link.target {
            input_updates
                .entry(target.clone())
                .or_default()
                .insert(target_slot, link.id);
        }
        link.target = target;
        link.target_slot = target_slot;
    }

    for flat in &mut nodes {
        let Some(slots) = input_updates.get(&flat.key) else {
            continue;
        };
        for (slot, link_id) in slots {
            if let Some(input) = flat.node.inputs.get_mut(*slot as usize) {
                input.link = Some(*link_id);
            }
        }
    }

    FlatGraph { nodes, links }
}

#[allow(clippy::too_many_arguments)]
fn expand_instance(
    parent: &NodeKey,
    def: &SubgraphDef,
    out_nodes: &mut Vec<FlatNode>,
    links: &mut Vec<FlatLink>,
    next_link_id: &mut i64,
    input_maps: &mut HashMap<NodeKey, SlotMap>,
    output_maps: &mut HashMap<NodeKey, SlotMap>,
) {
    let by_id: HashMap<i64, &Link> = def.links.iter().map(|link| (link.id, link)).collect();

    // Input port N is wired to whichever internal slot its boundary link
    // reaches; output port N to whichever internal slot feeds it.
    let mut input_map = SlotMap::new();
    for (slot, port) in def.inputs.iter().enumerate() {
        for link_id in &port.link_ids {
            if let Some(link) = by_id.get(link_id) {
                input_map.insert(slot as i64, (parent.child(link.target_id), link.target_slot));
            }
        }
    }
    let mut output_map = SlotMap::new();
    for (slot, port) in def.outputs.iter().enumerate() {
        for link_id in &port.link_ids {
            if let Some(link) = by_id.get(link_id) {
                output_map.insert(slot as i64, (parent.child(link.origin_id), link.origin_slot));
            }
        }
    }

    let mut id_remap: HashMap<i64, i64> = HashMap::new();
    for link in &def.links {
        if link.origin_id == INPUT_PSEUDO_NODE
            || link.origin_id == OUTPUT_PSEUDO_NODE
            || link.target_id == INPUT_PSEUDO_NODE
            || link.target_id == OUTPUT_PSEUDO_NODE
        {
            continue;
        }
        let fresh = *next_link_id;
        *next_link_id += 1;
        id_remap.insert(link.id, fresh);
        links.push(FlatLink {
            id: fresh,
            origin: parent.child(link.origin_id),
            origin_slot: link.origin_slot,
            target: parent.child(link.target_id),
            target_slot: link.target_slot,
        });
    }

    for node in &def.nodes {
        let mut clone = node.clone();
        for input in &mut clone.inputs {
            let Some(link_id) = input.link else {
                continue;
            };
            let from_boundary = by_id
                .get(&link_id)
                .is_some_and(|link| link.origin_id == INPUT_PSEUDO_NODE);
            if from_boundary {
                // The rewrite step attaches the external link in its place.
                input.link = None;
            } else if let Some(fresh) = id_remap.get(&link_id) {
                input.link = Some(*fresh);
            }
        }
        out_nodes.push(FlatNode {
            key: parent.child(node.id),
            node: clone,
        });
    }

    input_maps.insert(parent.clone(), input_map);
    output_maps.insert(parent.clone(), output_map);
}

/// Follow a boundary map chain to the concrete endpoint. Nested instances
/// resolve through one map layer per nesting level.
fn resolve_through(maps: &HashMap<NodeKey, SlotMap>, key: NodeKey, slot: i64) -> (NodeKey, i64) {
    match maps.get(&key).and_then(|map| map.get(&slot)) {
        Some((inner, inner_slot)) => resolve_through(maps, inner.clone(), *inner_slot),
        None => (key, slot),
    }
}
