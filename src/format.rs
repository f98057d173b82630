//! Output formatting for composed configuration.

use clap::ValueEnum;
use serde_json::Value;

/// Output format for rendered configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// Render a value in this format, with a trailing newline.
    pub fn render(self, value: &Value) -> anyhow::Result<String> {
        match self {
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
            OutputFormat::Json => {
                let mut out = serde_json::to_string_pretty(value)?;
                out.push('\n');
                Ok(out)
            }
        }
    }
}

/// Format a list of pattern names, one per line.
pub fn format_pattern_list(pattern_type: &str, names: &[String]) -> String {
    if names.is_empty() {
        return format!("No {} patterns found.\n", pattern_type);
    }
    let mut out = String::new();
    for name in names {
        out.push_str(name);
        out.push('\n');
    }
    out
}
