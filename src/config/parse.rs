//! YAML text to [`ConfigValue`](super::ConfigValue).

use crate::error::{ConfigError, ConfigResult, YamlSyntaxError};
use serde_json::{Map, Value};
use std::path::Path;

/// Parse YAML text read from `path`.
///
/// An empty document yields an empty mapping. Syntax errors carry the
/// offending location and the surrounding lines of `content`. `.inf` and
/// `.nan` have no JSON number form and are rejected.
pub fn parse_yaml_str(content: &str, path: &Path) -> ConfigResult<Value> {
    if content.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let value = match serde_yaml::from_str::<Value>(content) {
        Ok(Value::Null) => return Ok(Value::Object(Map::new())),
        Ok(value) => value,
        Err(err) => return Err(YamlSyntaxError::from_yaml(&err, path, content).into()),
    };

    // Non-finite floats convert to null, so only documents with nulls need a second look
    if contains_null(&value)
        && let Ok(raw) = serde_yaml::from_str::<serde_yaml::Value>(content)
        && let Some(key) = find_non_finite(&raw, String::new())
    {
        return Err(ConfigError::NonFiniteNumber {
            path: path.to_path_buf(),
            key,
        });
    }

    Ok(value)
}

fn contains_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.iter().any(contains_null),
        Value::Object(map) => map.values().any(contains_null),
        _ => false,
    }
}

/// Dotted key path of the first `.inf`/`.nan` in `value`.
fn find_non_finite(value: &serde_yaml::Value, at: String) -> Option<String> {
    match value {
        serde_yaml::Value::Number(n) if n.as_f64().is_some_and(|f| !f.is_finite()) => Some(at),
        serde_yaml::Value::Sequence(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, item)| find_non_finite(item, format!("{}[{}]", at, i))),
        serde_yaml::Value::Mapping(map) => map.iter().find_map(|(key, item)| {
            let key = match key {
                serde_yaml::Value::String(s) => s.clone(),
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => "?".to_string(),
            };
            let child = if at.is_empty() {
                key
            } else {
                format!("{}.{}", at, key)
            };
            find_non_finite(item, child)
        }),
        serde_yaml::Value::Tagged(tagged) => find_non_finite(&tagged.value, at),
        _ => None,
    }
}

/// Parse YAML text that must hold a mapping at the top level.
pub fn parse_mapping(content: &str, path: &Path) -> ConfigResult<Map<String, Value>> {
    match parse_yaml_str(content, path)? {
        Value::Object(map) => Ok(map),
        _ => Err(ConfigError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}
