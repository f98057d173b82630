//! Deep merge functionality for configuration layers.
//!
//! Layers are folded left to right, later layers taking precedence:
//! - Mappings are merged recursively, key by key
//! - Sequences are appended, unless the later sequence starts with
//!   [`REPLACE_MARKER`], in which case it replaces the earlier one
//! - Every other combination is replaced outright by the later value
//!
//! Inputs are only borrowed; the result never aliases them.

use serde_json::{Map, Value};

/// Leading sequence element that switches sequence merging from append to replace.
pub const REPLACE_MARKER: &str = "__replace__";

/// One resolved mapping contributing to a merge, tagged with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigLayer {
    /// Pattern identifier (`workflows/minimal`) or file path.
    pub origin: String,
    pub value: Value,
}

impl ConfigLayer {
    pub fn new(origin: impl Into<String>, value: Value) -> Self {
        Self {
            origin: origin.into(),
            value,
        }
    }
}

/// Merge layers in ascending precedence.
///
/// An empty slice yields an empty mapping; a single layer yields a copy.
///
/// # Example
/// ```
/// use serde_json::json;
/// use config_patterns::config::merge;
///
/// let base = json!({
///     "server": { "port": 8080, "host": "localhost" },
///     "features": ["a", "b"]
/// });
/// let overlay = json!({
///     "server": { "port": 9000 },
///     "features": ["c"]
/// });
/// let result = merge(&[base, overlay]);
/// assert_eq!(result, json!({
///     "server": { "port": 9000, "host": "localhost" },
///     "features": ["a", "b", "c"]
/// }));
/// ```
pub fn merge(layers: &[Value]) -> Value {
    layers
        .iter()
        .fold(Value::Object(Map::new()), |acc, layer| overlay(acc, layer))
}

/// Merge two values, with `right` taking precedence over `left`.
pub fn merge_two(left: &Value, right: &Value) -> Value {
    overlay(left.clone(), right)
}

/// Merge `layers` that carry origin information.
pub fn merge_layers(layers: &[ConfigLayer]) -> Value {
    layers.iter().fold(Value::Object(Map::new()), |acc, layer| {
        tracing::trace!(origin = %layer.origin, "Merging layer");
        overlay(acc, &layer.value)
    })
}

/// Apply `right` on top of an owned accumulator.
fn overlay(base: Value, right: &Value) -> Value {
    match (base, right) {
        // Both are mappings: merge recursively
        (Value::Object(mut base_map), Value::Object(right_map)) => {
            for (key, right_value) in right_map {
                // Update in place so the base key order is kept
                if let Some(slot) = base_map.get_mut(key) {
                    let current = slot.take();
                    *slot = overlay(current, right_value);
                } else {
                    base_map.insert(key.clone(), right_value.clone());
                }
            }
            Value::Object(base_map)
        }
        // Both are sequences: append, or replace when marked
        (Value::Array(mut base_items), Value::Array(right_items)) => {
            if is_replace_marked(right_items) {
                Value::Array(right_items[1..].to_vec())
            } else {
                base_items.extend(right_items.iter().cloned());
                Value::Array(base_items)
            }
        }
        // Any other case: right replaces base entirely
        (_, right) => right.clone(),
    }
}

fn is_replace_marked(items: &[Value]) -> bool {
    items.first().and_then(Value::as_str) == Some(REPLACE_MARKER)
}
