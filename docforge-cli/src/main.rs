//! docforge binary entry point
//!
//! Parses arguments, initialises logging, and dispatches to command handlers.
//! Errors are rendered to stderr and mapped to exit codes via
//! [`CliError::exit_code`].

mod cli;
mod commands;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use docforge_core::config::{DocforgeConfig, GeneralConfig};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let general = logging_config(&cli.config).await;
    init_logging(cli.log_level.as_deref(), &general);

    let writer = OutputWriter::new(cli.output_format);

    let result = match cli.command {
        Commands::Run(args) => commands::run::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }
}

/// Peek at the `[general]` section for subscriber setup.
///
/// Any load problem falls back to defaults here; the command handlers load
/// the configuration again and surface errors properly.
async fn logging_config(path: &Path) -> GeneralConfig {
    match DocforgeConfig::load(path).await {
        Ok(config) => config.general,
        Err(_) => GeneralConfig::default(),
    }
}

/// Initialise the tracing subscriber.
///
/// Level precedence: `--log-level` flag, then `RUST_LOG`, then the
/// configured `general.log_level`. The `general.log_format` selects
/// text or JSON output.
fn init_logging(log_level: Option<&str>, general: &GeneralConfig) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(general.log_level.clone())),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
