//! Config Patterns Library
//!
//! Composes a final configuration from a user-authored YAML file and the
//! reusable named patterns (e.g. predefined workflows) it references.

pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod paths;

pub use config::{ConfigLoader, ConfigValue, LoaderOptions, MergedConfig};
pub use error::{
    CircularDependencyError, ConfigError, ConfigResult, PatternNotFoundError, YamlSyntaxError,
};
