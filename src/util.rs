use regex::Regex;

lazy_static::lazy_static! {
    static ref SUBGRAPH_UUID_RE: Regex = Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$"
    ).unwrap();
}

/// Subgraph instances carry a hyphenated UUID where regular nodes carry a class name.
pub fn is_subgraph_type(node_type: &str) -> bool {
    SUBGRAPH_UUID_RE.is_match(node_type)
}
