//! `docforge config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use docforge_core::config::DocforgeConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Execute the config validate subcommand.
///
/// Attempts to load and validate the configuration file, reporting any errors.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let result = DocforgeConfig::load(config_path).await;

    let report = match result {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Execute the config show subcommand.
///
/// Loads and displays the effective configuration (file + env overrides + defaults).
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = DocforgeConfig::load(config_path)
        .await
        .map_err(|e| CliError::Config(e.to_string()))?;

    let toml = match section.as_deref() {
        None => toml_for(&config)?,
        Some("general") => toml_for(&config.general)?,
        Some("pipeline") => toml_for(&config.pipeline)?,
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown config section '{other}' (expected: general, pipeline)"
            )));
        }
    };

    let report = ConfigShowReport {
        source: config_path.display().to_string(),
        section,
        rendered: toml,
    };
    writer.render(&report)?;
    Ok(())
}

/// Serialise a config value to TOML for display.
fn toml_for<T: Serialize>(value: &T) -> Result<String, CliError> {
    toml::to_string_pretty(value).map_err(|e| CliError::Command(format!("toml render: {e}")))
}

/// Result payload for `config validate`.
#[derive(Debug, Serialize)]
pub struct ConfigValidationReport {
    /// Configuration file path.
    pub source: String,
    /// Whether the configuration passed validation.
    pub valid: bool,
    /// Validation errors, if any.
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.valid {
            writeln!(w, "{}: OK", self.source)
        } else {
            writeln!(w, "{}: INVALID", self.source)?;
            for error in &self.errors {
                writeln!(w, "  - {error}")?;
            }
            Ok(())
        }
    }
}

/// Result payload for `config show`.
#[derive(Debug, Serialize)]
pub struct ConfigShowReport {
    /// Configuration file path.
    pub source: String,
    /// Requested section, if any.
    pub section: Option<String>,
    /// Effective configuration rendered as TOML.
    pub rendered: String,
}

impl Render for ConfigShowReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "# effective configuration from {}", self.source)?;
        write!(w, "{}", self.rendered)
    }
}
