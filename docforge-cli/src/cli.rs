//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Docforge -- telemetry document enrichment pipeline.
///
/// Use `docforge <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "docforge", version, about, long_about = None)]
pub struct Cli {
    /// Path to the docforge.toml configuration file.
    #[arg(short, long, default_value = "docforge.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output_format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the enrichment pipeline over an NDJSON input file.
    Run(RunArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Run the enrichment pipeline: NDJSON documents in, bulk records out.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// NDJSON input file (one document per line).
    pub input: PathBuf,

    /// Bulk output file. Required unless --dry-run is given.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Process documents without writing them anywhere; report counts only.
    #[arg(long)]
    pub dry_run: bool,
}

// ---- config ----

/// Manage the docforge.toml configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Load and validate the configuration file, reporting any errors.
    Validate,

    /// Display the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, pipeline).
        #[arg(long)]
        section: Option<String>,
    },
}
