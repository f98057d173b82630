//! CLI command definitions for config-patterns
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

use crate::config::LoaderOptions;
use crate::format::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Compose YAML configuration from a file and the patterns it references
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pattern search directory (repeatable, searched in order)
    #[arg(short, long = "search-path", value_name = "DIR", global = true)]
    pub search_paths: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loader options from `--search-path`, falling back to discovery.
    pub fn loader_options(&self) -> LoaderOptions {
        if self.search_paths.is_empty() {
            LoaderOptions::discover()
        } else {
            LoaderOptions::with_search_paths(self.search_paths.iter().cloned())
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a file, resolve its patterns, and print the merged result
    Compose(ComposeArgs),

    /// List the available patterns of a type (e.g. `workflow`)
    List {
        /// Pattern type, singular or plural
        pattern_type: String,
    },

    /// Load a file and report whether it composes cleanly
    Check {
        /// Configuration file to check
        file: PathBuf,
    },
}

/// Arguments for the compose subcommand
#[derive(Args, Debug)]
pub struct ComposeArgs {
    /// Configuration file to compose
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,

    /// Write to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compose() {
        let cli = Cli::try_parse_from([
            "config-patterns",
            "-s",
            "patterns",
            "--search-path",
            "/shared/patterns",
            "compose",
            "config.yaml",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(
            cli.loader_options().search_paths,
            vec![PathBuf::from("patterns"), PathBuf::from("/shared/patterns")]
        );
        match cli.command {
            Command::Compose(args) => {
                assert_eq!(args.file, PathBuf::from("config.yaml"));
                assert_eq!(args.format, OutputFormat::Json);
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_list_and_check() {
        let cli = Cli::try_parse_from(["config-patterns", "list", "workflow"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::List { ref pattern_type } if pattern_type == "workflow"
        ));
        assert_eq!(cli.log, "2");

        let cli = Cli::try_parse_from(["config-patterns", "check", "c.yaml", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Check { .. }));
    }
}
