use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// How a declared input receives its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Authored directly on the node as a literal.
    Widget,
    /// Supplied by a link from another node's output.
    Connection,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InputDef {
    pub name: String,
    pub kind: InputKind,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeSchema {
    #[serde(default)]
    pub inputs: Vec<InputDef>,
    /// Terminal node whose side effect justifies keeping it without consumers.
    #[serde(default)]
    pub output_node: bool,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Read-only lookup service describing node classes. The converter works
/// without an entry for a type, degrading to best-effort name inference.
pub trait NodeRegistry {
    /// Declared input names, required before optional. Empty for unknown types.
    fn input_order(&self, node_type: &str) -> Vec<String>;

    /// Widget or connection classification; `None` for unknown inputs.
    fn classify_input(&self, node_type: &str, input: &str) -> Option<InputKind>;

    fn is_output_node(&self, node_type: &str) -> bool;

    fn display_name(&self, node_type: &str) -> Option<String>;

    /// Widget-classified inputs in declared order, required before optional.
    fn widget_order(&self, node_type: &str) -> Vec<String> {
        self.input_order(node_type)
            .into_iter()
            .filter(|name| matches!(self.classify_input(node_type, name), Some(InputKind::Widget)))
            .collect()
    }
}

/// Immutable snapshot of node schemas. Built once and handed to the
/// converter, so conversions stay reentrant with no shared cache.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StaticRegistry {
    #[serde(default)]
    pub nodes: IndexMap<String, NodeSchema>,
}

impl StaticRegistry {
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("unable to parse node-schema registry")
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let txt = fs::read_to_string(path)
            .with_context(|| format!("unable to read node-schema registry at {}", path.display()))?;
        Self::from_json(&txt)
            .with_context(|| format!("invalid node-schema registry at {}", path.display()))
    }

    fn schema(&self, node_type: &str) -> Option<&NodeSchema> {
        self.nodes.get(node_type)
    }
}

impl NodeRegistry for StaticRegistry {
    fn input_order(&self, node_type: &str) -> Vec<String> {
        let Some(schema) = self.schema(node_type) else {
            return Vec::new();
        };
        let mut names: Vec<String> = schema
            .inputs
            .iter()
            .filter(|input| input.required)
            .map(|input| input.name.clone())
            .collect();
        names.extend(
            schema
                .inputs
                .iter()
                .filter(|input| !input.required)
                .map(|input| input.name.clone()),
        );
        names
    }

    fn classify_input(&self, node_type: &str, input: &str) -> Option<InputKind> {
        self.schema(node_type)?
            .inputs
            .iter()
            .find(|def| def.name == input)
            .map(|def| def.kind)
    }

    fn is_output_node(&self, node_type: &str) -> bool {
        self.schema(node_type).is_some_and(|schema| schema.output_node)
    }

    fn display_name(&self, node_type: &str) -> Option<String> {
        self.schema(node_type)?.display_name.clone()
    }
}

/// Registry with no entries. Every lookup misses and the converter relies on
/// the inference fallbacks throughout.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyRegistry;

impl NodeRegistry for EmptyRegistry {
    fn input_order(&self, _node_type: &str) -> Vec<String> {
        Vec::new()
    }

    fn classify_input(&self, _node_type: &str, _input: &str) -> Option<InputKind> {
        None
    }

    fn is_output_node(&self, _node_type: &str) -> bool {
        false
    }

    fn display_name(&self, _node_type: &str) -> Option<String> {
        None
    }
}
