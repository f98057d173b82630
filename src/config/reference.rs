//! Pattern references and resolution chains.
//!
//! A mapping refers to patterns through a fixed set of fields:
//! - `workflow: minimal` or `workflow: [base, extra]` for workflow patterns
//! - `extends: workflows/minimal` (or a list) for any pattern type
//!
//! Reference fields stay in the merged output; they are only read here.

use crate::error::{CircularDependencyError, ConfigError, ConfigResult};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Fields naming a pattern of one fixed type, paired with that type.
const TYPED_REFERENCE_FIELDS: &[(&str, &str)] = &[("workflow", "workflow")];

/// Field naming patterns in `<type>/<name>` form.
const QUALIFIED_REFERENCE_FIELD: &str = "extends";

/// A typed reference to a pattern, e.g. `workflows/minimal`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternReference {
    /// Pluralized type, which is also the directory name (`workflows`).
    pub pattern_type: String,
    pub name: String,
}

impl PatternReference {
    /// Create a reference; singular types are pluralized (`workflow` -> `workflows`).
    pub fn new(pattern_type: &str, name: impl Into<String>) -> Self {
        let pattern_type = if pattern_type.ends_with('s') {
            pattern_type.to_string()
        } else {
            format!("{}s", pattern_type)
        };
        Self {
            pattern_type,
            name: name.into(),
        }
    }

    /// Parse the `<type>/<name>` identifier form.
    pub fn parse(identifier: &str) -> Option<Self> {
        let (pattern_type, name) = identifier.split_once('/')?;
        let (pattern_type, name) = (pattern_type.trim(), name.trim());
        if !is_plain_segment(pattern_type) || !is_plain_segment(name) {
            return None;
        }
        Some(Self::new(pattern_type, name))
    }

    /// Identifier used in chains and diagnostics.
    pub fn id(&self) -> String {
        format!("{}/{}", self.pattern_type, self.name)
    }
}

impl fmt::Display for PatternReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.pattern_type, self.name)
    }
}

/// A name usable as a single file name component inside a search directory.
fn is_plain_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

/// Identifiers visited along the current resolution path.
///
/// Extending a chain returns a new chain; sibling branches never see each
/// other's entries, so the same pattern may appear in two independent
/// branches without being reported as a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionChain {
    entries: Arc<Vec<String>>,
}

impl ResolutionChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain starting at the identity of the file being loaded.
    pub fn seeded(identity: impl Into<String>) -> Self {
        Self {
            entries: Arc::new(vec![identity.into()]),
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.iter().any(|entry| entry == identifier)
    }

    /// Copy of this chain with `identifier` appended.
    pub fn extend(&self, identifier: impl Into<String>) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + 1);
        entries.extend(self.entries.iter().cloned());
        entries.push(identifier.into());
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Fail if visiting `identifier` would close a loop.
    pub fn check(&self, identifier: &str) -> Result<(), CircularDependencyError> {
        if self.contains(identifier) {
            let mut chain = self.entries.to_vec();
            chain.push(identifier.to_string());
            return Err(CircularDependencyError::new(chain));
        }
        Ok(())
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Collect the pattern references declared by a mapping, in declaration order.
pub fn extract_references(map: &Map<String, Value>) -> ConfigResult<Vec<PatternReference>> {
    let mut references = Vec::new();

    for (field, value) in map {
        if let Some((_, pattern_type)) = TYPED_REFERENCE_FIELDS
            .iter()
            .find(|(name, _)| *name == field.as_str())
        {
            for name in reference_names(field, value)? {
                if !is_plain_segment(&name) {
                    return Err(ConfigError::invalid_reference(
                        field,
                        format!("\"{}\" is not a plain pattern name", name),
                    ));
                }
                references.push(PatternReference::new(pattern_type, name));
            }
        } else if field == QUALIFIED_REFERENCE_FIELD {
            for identifier in reference_names(field, value)? {
                let reference = PatternReference::parse(&identifier).ok_or_else(|| {
                    ConfigError::invalid_reference(
                        field,
                        format!("expected <type>/<name>, got \"{}\"", identifier),
                    )
                })?;
                references.push(reference);
            }
        }
    }

    Ok(references)
}

/// Read a reference field holding a string or a sequence of strings.
fn reference_names(field: &str, value: &Value) -> ConfigResult<Vec<String>> {
    let names = match value {
        Value::Null => Vec::new(),
        Value::String(name) => vec![name.clone()],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    ConfigError::invalid_reference(field, "list entries must be strings")
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?,
        _ => {
            return Err(ConfigError::invalid_reference(
                field,
                "expected a name or a list of names",
            ));
        }
    };

    if names.iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::invalid_reference(field, "empty pattern name"));
    }
    Ok(names.into_iter().map(|name| name.trim().to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn refs(value: Value) -> ConfigResult<Vec<PatternReference>> {
        extract_references(value.as_object().unwrap())
    }

    #[test]
    fn test_type_is_pluralized() {
        let reference = PatternReference::new("workflow", "minimal");
        assert_eq!(reference.pattern_type, "workflows");
        assert_eq!(reference.id(), "workflows/minimal");
        assert_eq!(PatternReference::new("workflows", "minimal"), reference);
    }

    #[test]
    fn test_parse_identifier() {
        let reference = PatternReference::parse("templates/docs").unwrap();
        assert_eq!(reference.pattern_type, "templates");
        assert_eq!(reference.name, "docs");
        assert!(PatternReference::parse("docs").is_none());
        assert!(PatternReference::parse("/docs").is_none());
        assert!(PatternReference::parse("a/b/c").is_none());
        assert!(PatternReference::parse("workflows/..").is_none());
        assert!(PatternReference::parse("../workflows").is_none());
        assert!(PatternReference::parse("workflows/a\\b").is_none());
    }

    #[test]
    fn test_workflow_names_cannot_leave_directory() {
        for name in ["../../secret", "nested/minimal", "..", ".", "..\\secret"] {
            assert!(
                matches!(
                    refs(json!({"workflow": name})),
                    Err(ConfigError::InvalidReference { .. })
                ),
                "accepted {:?}",
                name
            );
        }
        assert!(matches!(
            refs(json!({"workflow": ["minimal", "../secret"]})),
            Err(ConfigError::InvalidReference { .. })
        ));
        assert!(refs(json!({"workflow": "agile..4"})).is_ok());
    }

    #[test]
    fn test_extract_workflow_field() {
        let found = refs(json!({"version": "3.0.0", "workflow": "minimal"})).unwrap();
        assert_eq!(found, vec![PatternReference::new("workflow", "minimal")]);
    }

    #[test]
    fn test_extract_in_declaration_order() {
        let found = refs(json!({
            "extends": ["templates/docs"],
            "workflow": ["base", "extra"]
        }))
        .unwrap();
        let ids: Vec<String> = found.iter().map(PatternReference::id).collect();
        assert_eq!(ids, vec!["templates/docs", "workflows/base", "workflows/extra"]);
    }

    #[test]
    fn test_no_references() {
        assert!(refs(json!({"project": {"name": "x"}})).unwrap().is_empty());
        assert!(refs(json!({"workflow": null})).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_references() {
        assert!(matches!(
            refs(json!({"workflow": 3})),
            Err(ConfigError::InvalidReference { .. })
        ));
        assert!(matches!(
            refs(json!({"workflow": ""})),
            Err(ConfigError::InvalidReference { .. })
        ));
        assert!(matches!(
            refs(json!({"workflow": ["ok", 1]})),
            Err(ConfigError::InvalidReference { .. })
        ));
        assert!(matches!(
            refs(json!({"extends": "minimal"})),
            Err(ConfigError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_chain_extension_is_local() {
        let root = ResolutionChain::seeded("config.yaml");
        let left = root.extend("workflows/a");
        let right = root.extend("workflows/b");

        assert_eq!(root.len(), 1);
        assert!(left.contains("workflows/a"));
        assert!(!right.contains("workflows/a"));
        assert!(right.check("workflows/a").is_ok());
    }

    #[test]
    fn test_chain_detects_cycle() {
        let chain = ResolutionChain::new()
            .extend("workflows/a")
            .extend("workflows/b");
        let err = chain.check("workflows/a").unwrap_err();
        assert_eq!(
            err.dependency_chain,
            vec!["workflows/a", "workflows/b", "workflows/a"]
        );
    }
}
