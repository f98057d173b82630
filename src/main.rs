//! Config Patterns CLI
//!
//! Composes a YAML configuration file with the patterns it references and
//! prints or checks the result.

use anyhow::{Context, Result};
use clap::Parser;
use config_patterns::cli::{Cli, Command, ComposeArgs};
use config_patterns::config::{ConfigLoader, PatternReference};
use config_patterns::format::format_pattern_list;
use std::fs::OpenOptions;
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging based on `--log` and `--verbose`.
///
/// `RUST_LOG` overrides the level when set.
fn init_logging(cli: &Cli) -> Result<()> {
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            // Log to file (append mode)
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)
                .with_context(|| format!("Failed to open log file {}", filename))?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

async fn compose(loader: &ConfigLoader, args: ComposeArgs) -> Result<()> {
    let config = loader.load(&args.file).await?;
    let rendered = args.format.render(&config)?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!(path = %path.display(), "Wrote composed configuration");
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let loader = ConfigLoader::new(cli.loader_options());
    debug!(search_paths = ?loader.search_paths(), "Loader ready");

    match cli.command {
        Command::Compose(args) => compose(&loader, args).await?,
        Command::List { pattern_type } => {
            let pattern_type = PatternReference::new(&pattern_type, "").pattern_type;
            let names = loader.list_available(&pattern_type).await;
            print!("{}", format_pattern_list(&pattern_type, &names));
        }
        Command::Check { file } => match loader.load(&file).await {
            Ok(config) => {
                let keys = config.as_object().map_or(0, |map| map.len());
                println!("{}: ok ({} top-level keys)", file.display(), keys);
            }
            Err(err) => {
                eprintln!("{}", err);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
