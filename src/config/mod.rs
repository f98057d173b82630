//! Configuration composition.
//!
//! A user-authored YAML file is composed with the reusable patterns it
//! references:
//! 1. **Parse** - the file is read and parsed into a [`ConfigValue`]
//! 2. **Resolve** - reference fields (`workflow`, `extends`) are resolved to
//!    pattern files under `<searchDir>/<type>s/<name>.yaml`, recursively
//! 3. **Merge** - pattern layers (base-most first) and then the file itself
//!    are deep-merged, later layers winning
//!
//! ## Merge Strategy
//! - Mappings: merged key by key at every depth
//! - Sequences: appended, or replaced when the later one starts with `"__replace__"`
//! - Anything else: the later value replaces the earlier one
//!
//! ## Environment Variables
//! - `CONFIG_PATTERNS_PATH` - Pattern search directories (platform path list)

mod loader;
mod merge;
mod parse;
mod reference;
mod resolver;
mod source;

pub use loader::{ConfigLoader, LoaderOptions, MergedConfig, SEARCH_PATH_ENV};
pub use merge::{ConfigLayer, REPLACE_MARKER, merge, merge_layers, merge_two};
pub use parse::{parse_mapping, parse_yaml_str};
pub use reference::{PatternReference, ResolutionChain, extract_references};
pub use resolver::{PatternResolver, ResolvedPattern};
pub use source::{FsReader, SourceReader};

/// A parsed configuration tree: scalars, mappings, and sequences.
pub type ConfigValue = serde_json::Value;
