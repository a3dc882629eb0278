use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Synthetic node id the editor uses for a subgraph's input boundary.
pub const INPUT_PSEUDO_NODE: i64 = -10;
/// Synthetic node id the editor uses for a subgraph's output boundary.
pub const OUTPUT_PSEUDO_NODE: i64 = -20;

/// Property key under which the editor pins the authoritative class name,
/// overriding the node's displayed type.
pub const TYPE_OVERRIDE_PROPERTY: &str = "Node name for S&R";

/// Editor-format workflow document: a node list, a link list, and the
/// subgraph definitions that instance nodes refer to by UUID.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphDoc {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default, deserialize_with = "deserialize_links")]
    pub links: Vec<Link>,
    #[serde(default)]
    pub definitions: Definitions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub subgraphs: Vec<SubgraphDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphNode {
    pub id: i64,
    #[serde(default, rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub mode: NodeMode,
    #[serde(default)]
    pub inputs: Vec<InputSlot>,
    #[serde(default)]
    pub outputs: Vec<OutputSlot>,
    #[serde(default)]
    pub widgets_values: Option<WidgetValues>,
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
    #[serde(default)]
    pub title: Option<String>,
}

impl GraphNode {
    /// Class name to use for schema lookups. The editor may store the
    /// authoritative name in the properties map when the visible type differs.
    pub fn schema_type(&self) -> &str {
        self.properties
            .get(TYPE_OVERRIDE_PROPERTY)
            .and_then(Value::as_str)
            .unwrap_or(&self.node_type)
    }

    /// Whether at least one output socket has a link attached.
    pub fn has_connected_output(&self) -> bool {
        self.outputs
            .iter()
            .any(|output| output.links.as_ref().is_some_and(|links| !links.is_empty()))
    }
}

/// Execution state of a node. The wire format stores this as an integer;
/// values the converter does not distinguish decode as `Normal`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeMode {
    #[default]
    Normal,
    /// Removed from the program entirely, along with its connections.
    Muted,
    /// Removed from the program, but consumers reach through to its upstream.
    Bypassed,
}

impl<'de> Deserialize<'de> for NodeMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match i64::deserialize(deserializer)? {
            2 => NodeMode::Muted,
            4 => NodeMode::Bypassed,
            _ => NodeMode::Normal,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputSlot {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub link: Option<i64>,
    /// Present when the editor promoted a widget into a connectable input.
    #[serde(default)]
    pub widget: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputSlot {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub links: Option<Vec<i64>>,
}

/// Stored literal inputs. The editor writes either a positional list or a
/// name-keyed map depending on the node implementation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WidgetValues {
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
}

/// A connection between two node slots. Top-level links are stored as
/// 6-tuples `[id, origin, origin_slot, target, target_slot, type]`; links
/// inside subgraph definitions are stored as objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: i64,
    pub origin_id: i64,
    pub origin_slot: i64,
    pub target_id: i64,
    pub target_slot: i64,
}

impl Link {
    fn from_value(value: &Value) -> Option<Link> {
        match value {
            Value::Array(parts) if parts.len() >= 6 => Some(Link {
                id: parts[0].as_i64()?,
                origin_id: parts[1].as_i64()?,
                origin_slot: parts[2].as_i64()?,
                target_id: parts[3].as_i64()?,
                target_slot: parts[4].as_i64()?,
            }),
            Value::Object(map) => Some(Link {
                id: map.get("id")?.as_i64()?,
                origin_id: map.get("origin_id")?.as_i64()?,
                origin_slot: map.get("origin_slot")?.as_i64()?,
                target_id: map.get("target_id")?.as_i64()?,
                target_slot: map.get("target_slot")?.as_i64()?,
            }),
            _ => None,
        }
    }
}

/// Decode a link list, dropping entries that do not match either wire shape.
/// A single malformed link is not worth failing the whole conversion.
fn deserialize_links<'de, D>(deserializer: D) -> Result<Vec<Link>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .filter_map(|value| {
            let link = Link::from_value(value);
            if link.is_none() {
                warn!("dropping malformed link entry: {value}");
            }
            link
        })
        .collect())
}

/// Reusable nested graph, referenced by UUID from instance nodes.
#[derive(Debug, Clone, Deserialize)]
pub struct SubgraphDef {
    pub id: String,
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default, deserialize_with = "deserialize_links")]
    pub links: Vec<Link>,
    #[serde(default)]
    pub inputs: Vec<PortDef>,
    #[serde(default)]
    pub outputs: Vec<PortDef>,
}

/// Boundary port of a subgraph. `link_ids` names the internal links that
/// touch the synthetic boundary pseudo-node on this port's side.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortDef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "linkIds")]
    pub link_ids: Vec<i64>,
}

/// Identity of a node in the flattened graph: the path of ids walked through
/// subgraph instances to reach it. Kept structured so ids never have to be
/// parsed back out of a string; rendering happens once, at the program edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(Vec<i64>);

impl NodeKey {
    pub fn root(id: i64) -> Self {
        NodeKey(vec![id])
    }

    /// Key of a subgraph member inlined under this instance.
    pub fn child(&self, id: i64) -> Self {
        let mut path = self.0.clone();
        path.push(id);
        NodeKey(path)
    }

    pub fn path(&self) -> &[i64] {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, id) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(":")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}
