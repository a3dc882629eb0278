use std::collections::{HashMap, HashSet};

use crate::{
    expand::{FlatLink, FlatNode},
    model::NodeKey,
};

/// Node and link indices, built once per conversion so the resolution steps
/// never rescan the flat lists.
pub struct GraphIndex<'a> {
    pub nodes: HashMap<&'a NodeKey, &'a FlatNode>,
    pub links: HashMap<i64, &'a FlatLink>,
}

impl<'a> GraphIndex<'a> {
    pub fn build(nodes: &'a [FlatNode], links: &'a [FlatLink]) -> Self {
        GraphIndex {
            nodes: nodes.iter().map(|flat| (&flat.key, flat)).collect(),
            links: links.iter().map(|link| (link.id, link)).collect(),
        }
    }
}

/// Walk upstream through bypassed nodes to the first live producer.
///
/// A bypassed node passes its first linked input through, whatever the input
/// kind. When the chain has no linked input (or cycles), the original pair
/// comes back unchanged and the caller drops the connection.
pub fn trace_through_bypassed(
    index: &GraphIndex<'_>,
    bypassed: &HashSet<NodeKey>,
    origin: NodeKey,
    slot: i64,
) -> (NodeKey, i64) {
    let mut visited = HashSet::new();
    trace(index, bypassed, origin, slot, &mut visited)
}

fn trace(
    index: &GraphIndex<'_>,
    bypassed: &HashSet<NodeKey>,
    origin: NodeKey,
    slot: i64,
    visited: &mut HashSet<NodeKey>,
) -> (NodeKey, i64) {
    if !bypassed.contains(&origin) || visited.contains(&origin) {
        return (origin, slot);
    }
    visited.insert(origin.clone());

    let Some(flat) = index.nodes.get(&origin) else {
        return (origin, slot);
    };
    for input in &flat.node.inputs {
        let Some(link) = input.link.and_then(|id| index.links.get(&id)) else {
            continue;
        };
        return trace(index, bypassed, link.origin.clone(), link.origin_slot, visited);
    }
    (origin, slot)
}
