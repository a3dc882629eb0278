//! Lower editor-authored node graphs into flat, execution-ready API programs.
//!
//! The editor format is a drawing: a node list, positional links, and nested
//! subgraph definitions. The API format is a program: node id → class name,
//! resolved inputs, metadata. Lowering inlines subgraph instances, reaches
//! through bypassed nodes to their live upstream producers, folds constant
//! nodes into their consumers, strips non-executable nodes, and rebuilds each
//! surviving node's named inputs in schema order.
#![forbid(unsafe_code)]

pub mod bypass;
pub mod classify;
pub mod emit;
pub mod error;
pub mod expand;
pub mod model;
pub mod registry;
pub mod util;
pub mod widgets;

pub use emit::{NodeMeta, Program, ProgramNode};
pub use error::{ConvertError, Result};
pub use registry::{EmptyRegistry, NodeRegistry, StaticRegistry};

use crate::model::GraphDoc;
use serde_json::Value;

/// Top-level keys that are transport envelope, not program entries.
const RESERVED_DOC_KEYS: &[&str] = &["prompt", "extra_data", "client_id"];

/// Whether a parsed document is already a flat API program.
///
/// Editor documents carry top-level `nodes` and `links`; a program carries
/// node entries with a `class_type` under non-reserved keys.
pub fn is_api_format(doc: &Value) -> bool {
    let Some(map) = doc.as_object() else {
        return false;
    };
    if map.contains_key("nodes") && map.contains_key("links") {
        return false;
    }
    map.iter().any(|(key, value)| {
        !RESERVED_DOC_KEYS.contains(&key.as_str())
            && value
                .as_object()
                .is_some_and(|entry| entry.contains_key("class_type"))
    })
}

/// Convert a workflow document to API format.
///
/// Documents already in API format pass through unchanged, which makes the
/// conversion idempotent. A document that is neither editor format nor API
/// format is an error; no partial program is returned.
pub fn convert_workflow(doc: &Value, registry: &dyn NodeRegistry) -> Result<Value> {
    if is_api_format(doc) {
        return Ok(doc.clone());
    }
    let program = lower_graph(parse_graph(doc)?, registry)?;
    serde_json::to_value(&program).map_err(|e| ConvertError::Internal(e.to_string()))
}

/// Decode an editor-format document into the typed graph model.
///
/// Fails with [`ConvertError::UnrecognizedFormat`] when the document has no
/// node entries at all, and [`ConvertError::Malformed`] when it has them but
/// does not decode.
pub fn parse_graph(doc: &Value) -> Result<GraphDoc> {
    let has_nodes = doc
        .as_object()
        .is_some_and(|map| map.contains_key("nodes"));
    if !has_nodes {
        return Err(ConvertError::UnrecognizedFormat);
    }
    serde_json::from_value(doc.clone()).map_err(|e| ConvertError::Malformed(e.to_string()))
}

/// Typed core of the conversion: expand subgraphs, then emit the program.
pub fn lower_graph(graph: GraphDoc, registry: &dyn NodeRegistry) -> Result<Program> {
    let flat = expand::expand_graph(graph);
    Ok(emit::emit_program(&flat, registry))
}
