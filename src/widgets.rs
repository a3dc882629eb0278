use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, warn};

use crate::{
    model::{GraphNode, NodeKey, WidgetValues},
    registry::NodeRegistry,
};

/// Companion tokens stored after a seed-like value to control regeneration
/// between runs. Editor-only affordances with no API counterpart.
const CONTROL_TOKENS: &[&str] = &["fixed", "increment", "decrement", "randomize"];

/// Name-keyed entries that carry UI preview state rather than input data.
const RESERVED_WIDGET_KEYS: &[&str] = &["videopreview", "preview"];

/// Display name the editor gives the trailing "add entry" affordance.
const ADD_ENTRY_KEY: &str = "➕ Add Lora";

/// Recover the name → value mapping for a node's literal inputs from its
/// stored widget values. Names already satisfied by a connection or a folded
/// constant are skipped; those sources are live, the stored copy is not.
pub fn decode_widgets(
    key: &NodeKey,
    node: &GraphNode,
    connected: &HashSet<String>,
    registry: &dyn NodeRegistry,
) -> IndexMap<String, Value> {
    let mut out = IndexMap::new();
    let Some(values) = &node.widgets_values else {
        return out;
    };

    match values {
        WidgetValues::Map(map) => {
            for (name, value) in map {
                if RESERVED_WIDGET_KEYS.contains(&name.as_str()) {
                    continue;
                }
                if connected.contains(name) {
                    continue;
                }
                out.insert(name.clone(), value.clone());
            }
        }
        WidgetValues::List(values) if values.iter().any(Value::is_object) => {
            decode_self_describing(values, connected, &mut out);
        }
        WidgetValues::List(values) => {
            decode_positional(key, node, values, connected, registry, &mut out);
        }
    }

    out
}

fn decode_positional(
    key: &NodeKey,
    node: &GraphNode,
    values: &[Value],
    connected: &HashSet<String>,
    registry: &dyn NodeRegistry,
    out: &mut IndexMap<String, Value>,
) {
    let filtered = filter_control_tokens(values);
    let names = widget_names(node, registry);
    if names.is_empty() {
        if !filtered.is_empty() {
            warn!(
                node = %key,
                ty = node.schema_type(),
                "cannot map {} widget value(s) for unknown node type",
                filtered.len()
            );
        }
        return;
    }
    for (value, name) in filtered.into_iter().zip(names) {
        if !name.is_empty() && !connected.contains(&name) {
            out.insert(name, value);
        }
    }
}

/// Drop a regenerate-control token only where it trails a numeric value; a
/// standalone occurrence is a legitimate combo value and survives.
pub fn filter_control_tokens(values: &[Value]) -> Vec<Value> {
    let mut filtered = Vec::with_capacity(values.len());
    for (idx, value) in values.iter().enumerate() {
        let is_control = value
            .as_str()
            .is_some_and(|s| CONTROL_TOKENS.contains(&s));
        if is_control && idx > 0 && values[idx - 1].is_number() {
            continue;
        }
        filtered.push(value.clone());
    }
    filtered
}

/// Widget values that carry dictionaries describe their own input names: a
/// `type` field names the entry itself, a `lora` entry gets a synthesized
/// `lora_N` name in encounter order.
fn decode_self_describing(
    values: &[Value],
    connected: &HashSet<String>,
    out: &mut IndexMap<String, Value>,
) {
    let mut lora_counter = 0;
    for value in values {
        match value {
            Value::Object(map) if map.is_empty() => {}
            Value::Object(map) if map.contains_key("type") => {
                let Some(name) = map.get("type").and_then(Value::as_str) else {
                    continue;
                };
                if !connected.contains(name) {
                    out.insert(name.to_string(), value.clone());
                }
            }
            Value::Object(map) if map.contains_key("lora") => {
                lora_counter += 1;
                let name = format!("lora_{lora_counter}");
                if !connected.contains(&name) {
                    let mut clean = map.clone();
                    if clean.get("strengthTwo").is_some_and(Value::is_null) {
                        clean.remove("strengthTwo");
                    }
                    out.insert(name, Value::Object(clean));
                }
            }
            Value::Object(_) => {
                debug!("unrecognized self-describing widget value: {value}");
            }
            Value::String(s) if s.is_empty() => {
                // The editor's "add entry" button; kept under a fixed name so
                // the information is not silently lost.
                out.insert(ADD_ENTRY_KEY.to_string(), value.clone());
            }
            _ => {}
        }
    }
}

/// Ordered widget names to zip positional values against: the registry's
/// widget-classified inputs, or a best-effort inference from the node's own
/// declared inputs when the type is unknown.
fn widget_names(node: &GraphNode, registry: &dyn NodeRegistry) -> Vec<String> {
    let names = registry.widget_order(node.schema_type());
    if !names.is_empty() {
        return names;
    }

    // Widget-flagged inputs first, then whatever declared inputs are not
    // fed by a connection.
    let mut flagged = Vec::new();
    let mut unconnected = Vec::new();
    for input in &node.inputs {
        if input.name.is_empty() {
            continue;
        }
        if input.widget.is_some() {
            flagged.push(input.name.clone());
        } else if input.link.is_none() {
            unconnected.push(input.name.clone());
        }
    }
    flagged.extend(unconnected);
    flagged
}
