//! Path resolution over the modem's device tree
//!
//! The device tree is one `serde_json::Value` fetched per poll cycle. Field
//! locations differ between firmware revisions and models, so every logical
//! field carries an ordered list of candidate paths and the first one that
//! fully resolves wins. A missing path is a normal outcome, never an error.

use serde_json::Value;

/// Resolve the first candidate path that leads to a non-null leaf.
///
/// Paths are `/`-separated segments; a numeric segment indexes into an
/// array. Intermediate nodes of the wrong type simply miss.
pub fn resolve<'a>(tree: &'a Value, candidates: &[&str]) -> Option<&'a Value> {
    candidates.iter().find_map(|path| resolve_path(tree, path))
}

fn resolve_path<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = tree;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Coerce a leaf to a number. Modem firmwares report numeric readings
/// both as JSON numbers and as strings ("-2.1").
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Coerce a leaf to text. Numbers and booleans render with their JSON
/// representation; objects and arrays are not text.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
