//! Structured error types for configuration loading.
//!
//! Three diagnostics are surfaced to callers of the loader, each fatal and
//! carrying enough context to fix the source:
//! - [`YamlSyntaxError`] - malformed YAML, with location and surrounding lines
//! - [`PatternNotFoundError`] - unknown pattern, with alternatives and a suggestion
//! - [`CircularDependencyError`] - a pattern that references itself, with the chain

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Number of lines shown on each side of a syntax error.
const CONTEXT_LINES: usize = 2;

/// Maximum edit distance for a "did you mean" suggestion.
const MAX_SUGGESTION_DISTANCE: usize = 2;

/// Errors that can occur while loading and composing configuration.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error(transparent)]
    YamlSyntax(#[from] YamlSyntaxError),

    #[error(transparent)]
    PatternNotFound(#[from] PatternNotFoundError),

    #[error(transparent)]
    CircularDependency(#[from] CircularDependencyError),

    #[error("Configuration at {path} must be a mapping at the top level")]
    NotAMapping { path: PathBuf },

    #[error("Configuration at {path} holds a non-finite number at '{key}'")]
    NonFiniteNumber { path: PathBuf, key: String },

    #[error("Invalid pattern reference in '{field}': {reason}")]
    InvalidReference { field: String, reason: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    pub fn invalid_reference(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Position reported by the YAML parser, 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pub line: usize,
    pub column: usize,
}

/// Malformed YAML in a top-level or pattern file.
///
/// `line` and `column` are 1-indexed; both are 0 when the parser gave no
/// position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YamlSyntaxError {
    pub file_path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub reason: String,
    /// Rendered context window, empty without a position.
    pub context: String,
}

impl YamlSyntaxError {
    pub fn new(
        reason: impl Into<String>,
        mark: Option<Mark>,
        file_path: impl Into<PathBuf>,
        content: &str,
    ) -> Self {
        let (line, column) = mark.map_or((0, 0), |m| (m.line + 1, m.column + 1));
        let context = if line > 0 {
            render_context(content, line)
        } else {
            String::new()
        };

        Self {
            file_path: file_path.into(),
            line,
            column,
            reason: reason.into(),
            context,
        }
    }

    /// Build from a `serde_yaml` parse failure.
    pub fn from_yaml(
        err: &serde_yaml::Error,
        file_path: impl Into<PathBuf>,
        content: &str,
    ) -> Self {
        // serde_yaml locations are 1-indexed
        let mark = err.location().map(|loc| Mark {
            line: loc.line().saturating_sub(1),
            column: loc.column().saturating_sub(1),
        });
        Self::new(strip_location(&err.to_string()), mark, file_path, content)
    }
}

/// Render the lines around `line` (1-indexed), marking the offending one.
fn render_context(content: &str, line: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let first = line.saturating_sub(CONTEXT_LINES).max(1);
    let last = (line + CONTEXT_LINES).min(lines.len());
    let width = last.to_string().len();

    let mut out = String::new();
    for number in first..=last {
        let marker = if number == line { "> " } else { "  " };
        out.push_str(&format!(
            "{}{:>width$} | {}\n",
            marker,
            number,
            lines[number - 1],
            width = width
        ));
    }
    out
}

/// serde_yaml appends " at line X column Y" to its messages; we report that ourselves.
fn strip_location(message: &str) -> String {
    match message.find(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

impl fmt::Display for YamlSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "YAML syntax error in {}:{}:{}: {}",
            self.file_path.display(),
            self.line,
            self.column,
            self.reason
        )?;
        if !self.context.is_empty() {
            write!(f, "\n\n{}", self.context.trim_end())?;
        }
        Ok(())
    }
}

impl std::error::Error for YamlSyntaxError {}

/// A pattern reference that matched no file in any search directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternNotFoundError {
    pub pattern_name: String,
    /// Pluralized pattern type, e.g. `workflows`.
    pub pattern_type: String,
    pub available: Vec<String>,
    pub suggestion: Option<String>,
}

impl PatternNotFoundError {
    pub fn new(
        pattern_name: impl Into<String>,
        pattern_type: impl Into<String>,
        available: Vec<String>,
    ) -> Self {
        let pattern_name = pattern_name.into();
        let suggestion = suggest(&pattern_name, &available);
        Self {
            pattern_name,
            pattern_type: pattern_type.into(),
            available,
            suggestion,
        }
    }
}

impl fmt::Display for PatternNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pattern \"{}\" not found in {}.",
            self.pattern_name, self.pattern_type
        )?;
        if self.available.is_empty() {
            write!(f, " No {} patterns are available.", self.pattern_type)?;
        } else {
            write!(
                f,
                " Available {}: {}.",
                self.pattern_type,
                self.available.join(", ")
            )?;
        }
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " Did you mean \"{}\"?", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for PatternNotFoundError {}

/// A pattern identifier that recurred within one resolution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircularDependencyError {
    /// Identifiers in visit order, ending with the repeated one.
    pub dependency_chain: Vec<String>,
}

impl CircularDependencyError {
    pub fn new(dependency_chain: Vec<String>) -> Self {
        Self { dependency_chain }
    }
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Circular pattern dependency: {}",
            self.dependency_chain.join(" -> ")
        )
    }
}

impl std::error::Error for CircularDependencyError {}

/// Pick the closest available name, if it is close enough to be a likely typo.
pub fn suggest(name: &str, available: &[String]) -> Option<String> {
    let name_len = name.chars().count();
    available
        .iter()
        .map(|candidate| (levenshtein(name, candidate), candidate))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE && *distance < name_len)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.clone())
}

/// Edit distance over chars (insert, delete, substitute).
fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_syntax_error_location() {
        let content = "line 1\nline 2\nline 3\nline 4\nline 5\nline 6";
        let err = YamlSyntaxError::new(
            "bad indent",
            Some(Mark { line: 4, column: 9 }),
            "/path/to/file.yaml",
            content,
        );

        assert_eq!(err.line, 5);
        assert_eq!(err.column, 10);
        assert!(err.to_string().contains("/path/to/file.yaml:5:10"));
    }

    #[test]
    fn test_syntax_error_context_lines() {
        let content = "line 1\nline 2\nline 3\nline 4\nline 5";
        let mark = Some(Mark { line: 2, column: 0 });
        let err = YamlSyntaxError::new("oops", mark, "file.yaml", content);
        let message = err.to_string();

        assert!(message.contains("  1 | line 1"));
        assert!(message.contains("  2 | line 2"));
        assert!(message.contains("> 3 | line 3"));
        assert!(message.contains("  5 | line 5"));
    }

    #[test]
    fn test_syntax_error_context_clamped_at_end() {
        let content = "a: 1\nb: [";
        let err = YamlSyntaxError::new("eof", Some(Mark { line: 1, column: 4 }), "f.yaml", content);
        assert_eq!(err.context, "  1 | a: 1\n> 2 | b: [\n");
    }

    #[test]
    fn test_syntax_error_without_mark() {
        let err = YamlSyntaxError::new("unknown", None, "file.yaml", "some content");
        assert_eq!(err.line, 0);
        assert_eq!(err.column, 0);
        assert!(err.context.is_empty());
        assert!(err.to_string().contains("file.yaml:0:0"));
    }

    #[test]
    fn test_syntax_error_from_serde_yaml() {
        let content = "a: 1\nb: [1, 2\nc: 3\n";
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>(content).unwrap_err();
        let err = YamlSyntaxError::from_yaml(&yaml_err, "bad.yaml", content);

        assert!(err.line > 0);
        assert!(!err.reason.contains(" at line "));
        assert!(err.to_string().contains("> "));
        assert!(err.to_string().contains("| "));
    }

    #[test]
    fn test_not_found_lists_available() {
        let err = PatternNotFoundError::new(
            "nonexistent",
            "workflows",
            names(&["minimal", "agile-4", "standard-flow"]),
        );
        let message = err.to_string();

        assert_eq!(err.pattern_name, "nonexistent");
        assert_eq!(err.pattern_type, "workflows");
        assert!(message.contains("minimal"));
        assert!(message.contains("agile-4"));
        assert!(message.contains("standard-flow"));
        assert!(!message.contains("Did you mean"));
    }

    #[test]
    fn test_not_found_suggests_close_match() {
        let err = PatternNotFoundError::new(
            "agile4",
            "workflows",
            names(&["minimal", "agile-4", "standard-flow"]),
        );
        assert_eq!(err.suggestion.as_deref(), Some("agile-4"));
        assert!(err.to_string().contains("Did you mean \"agile-4\"?"));
    }

    #[test]
    fn test_not_found_no_suggestion_for_distant_name() {
        let err = PatternNotFoundError::new("xyz", "workflows", names(&["minimal", "agile-4"]));
        assert!(err.suggestion.is_none());
        assert!(!err.to_string().contains("Did you mean"));
    }

    #[test]
    fn test_not_found_empty_type_directory() {
        let err = PatternNotFoundError::new("minimal", "templates", Vec::new());
        assert!(err.to_string().contains("No templates patterns are available"));
    }

    #[test]
    fn test_short_names_do_not_match_everything() {
        assert_eq!(suggest("ab", &names(&["xy"])), None);
        assert_eq!(suggest("ab", &names(&["abc"])), Some("abc".to_string()));
    }

    #[test]
    fn test_circular_chain_rendering() {
        let chain = names(&["workflows/a", "workflows/b", "workflows/a"]);
        let err = CircularDependencyError::new(chain.clone());
        assert_eq!(err.dependency_chain, chain);
        assert!(
            err.to_string()
                .contains("workflows/a -> workflows/b -> workflows/a")
        );
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("agile4", "agile-4"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("minimal", ""), 7);
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: ConfigError = CircularDependencyError::new(names(&["a", "b", "a"])).into();
        assert_eq!(err.to_string(), "Circular pattern dependency: a -> b -> a");
    }
}
