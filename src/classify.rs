use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::{
    expand::FlatNode,
    model::{NodeKey, NodeMode, WidgetValues},
    registry::NodeRegistry,
};

/// Constant-holder node folded into its consumers instead of being emitted.
const PRIMITIVE_TYPE: &str = "PrimitiveNode";

/// Freeform annotations with no executable counterpart.
const ANNOTATION_TYPES: &[&str] = &["Note"];

/// UI conveniences for browsing prior results; never part of a program.
const UI_ONLY_TYPES: &[&str] = &["LoadImageOutput"];

/// Per-node keep/fold/exclude decisions for one conversion.
#[derive(Debug, Default)]
pub struct Classification {
    /// Dropped from the program outright; links touching them are dropped too.
    pub excluded: HashSet<NodeKey>,
    /// Dropped from the program but traversable as upstream pass-through hops.
    pub bypassed: HashSet<NodeKey>,
    /// Literals substituted at every consumer as if authored there.
    pub primitives: HashMap<NodeKey, Value>,
}

pub fn classify_nodes(nodes: &[FlatNode], registry: &dyn NodeRegistry) -> Classification {
    let mut out = Classification::default();

    for flat in nodes {
        let node = &flat.node;
        match node.mode {
            NodeMode::Muted => {
                debug!(node = %flat.key, ty = %node.node_type, "excluding muted node");
                out.excluded.insert(flat.key.clone());
                continue;
            }
            NodeMode::Bypassed => {
                debug!(node = %flat.key, ty = %node.node_type, "tracking bypassed node");
                out.bypassed.insert(flat.key.clone());
                continue;
            }
            NodeMode::Normal => {}
        }

        if node.node_type == PRIMITIVE_TYPE {
            if let Some(WidgetValues::List(values)) = &node.widgets_values {
                if let Some(first) = values.first() {
                    out.primitives.insert(flat.key.clone(), first.clone());
                }
            }
            out.excluded.insert(flat.key.clone());
            continue;
        }

        if ANNOTATION_TYPES.contains(&node.node_type.as_str()) {
            out.excluded.insert(flat.key.clone());
            continue;
        }

        if UI_ONLY_TYPES.contains(&node.node_type.as_str()) {
            debug!(node = %flat.key, ty = %node.node_type, "excluding UI-only node");
            out.excluded.insert(flat.key.clone());
            continue;
        }

        // Dead ends are dropped unless the type is a declared terminal whose
        // side effect is the point. Covers both "no output sockets at all"
        // and "sockets present but none connected".
        if !node.has_connected_output() && !registry.is_output_node(node.schema_type()) {
            debug!(node = %flat.key, ty = %node.node_type, "excluding node with no connected outputs");
            out.excluded.insert(flat.key.clone());
        }
    }

    out
}
