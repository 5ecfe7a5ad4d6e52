//! `docforge run` command handler
//!
//! Wires an NDJSON file source, the enrichment pipeline, and a bulk sink
//! together, then drives the run to completion. Ctrl-C triggers a drain
//! cancellation: documents already in flight reach the sink, the sink is
//! flushed, and the run completes normally with partial output.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use docforge_core::config::DocforgeConfig;
use docforge_core::pipeline::Pipeline;
use docforge_enrich_pipeline::{
    BufferSink, CancelMode, EnrichPipelineBuilder, FileSink, NdjsonFileSource,
    NdjsonFileSourceConfig, PipelineConfig,
};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    if !args.dry_run && args.output.is_none() {
        return Err(CliError::Command(
            "either --output <FILE> or --dry-run is required".to_owned(),
        ));
    }

    let core_config = load_config(config_path).await?;
    let pipeline_config = PipelineConfig::from_core(&core_config.pipeline);

    info!(input = %args.input.display(), "starting pipeline run");

    // Source task feeding the bounded channel (the channel bound is the
    // upstream backpressure boundary).
    let (source_tx, source_rx) = mpsc::channel(pipeline_config.channel_capacity);
    let source = NdjsonFileSource::new(
        NdjsonFileSourceConfig::from_pipeline(&pipeline_config, &args.input),
        source_tx,
    );

    let mut builder = EnrichPipelineBuilder::new()
        .config(pipeline_config)
        .source(source_rx);

    // Keep a handle on the capture buffer for dry-run reporting.
    let capture = if args.dry_run {
        let sink = BufferSink::new();
        builder = builder.sink(Box::new(sink.clone()));
        Some(sink)
    } else {
        // Checked above: output is present when not dry-run.
        let output = args.output.as_ref().ok_or_else(|| {
            CliError::Command("either --output <FILE> or --dry-run is required".to_owned())
        })?;
        builder = builder.sink(Box::new(FileSink::create(output).await?));
        None
    };

    let (mut pipeline, _none) = builder.build()?;

    // Ctrl-C -> drain cancellation from a separate task.
    let canceller = pipeline.canceller();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, draining pipeline");
            canceller.cancel(CancelMode::Drain);
        }
    });

    let source_task = tokio::spawn(source.run());
    pipeline.start().await?;
    let result = pipeline.wait().await;
    signal_task.abort();
    let source_status = source_task
        .await
        .map_err(|e| CliError::Command(format!("source task failed: {e}")))?;

    let summary = result?;
    info!(
        processed = summary.processed,
        dropped = summary.dropped,
        source_status = ?source_status,
        "pipeline run finished"
    );

    let report = RunReport {
        input: args.input.display().to_string(),
        output: args.output.map(|p| p.display().to_string()),
        dry_run: args.dry_run,
        processed: summary.processed,
        dropped: summary.dropped,
        sample_destinations: capture
            .map(|sink| {
                let mut destinations: Vec<String> = sink
                    .captured()
                    .iter()
                    .filter_map(|e| e.routing.as_ref().map(|r| r.destination.clone()))
                    .collect();
                destinations.sort();
                destinations.dedup();
                destinations
            })
            .unwrap_or_default(),
    };
    writer.render(&report)?;
    Ok(())
}

/// Load the configuration, falling back to defaults when the file is absent.
///
/// A missing config file is not an error for `run` -- the defaults describe
/// a fully working pipeline. Invalid files still fail loudly.
async fn load_config(path: &Path) -> Result<DocforgeConfig, CliError> {
    if !path.exists() {
        info!(path = %path.display(), "config file not found, using defaults");
        let mut config = DocforgeConfig::default();
        config.apply_env_overrides();
        config
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        return Ok(config);
    }
    DocforgeConfig::load(path)
        .await
        .map_err(|e| CliError::Config(e.to_string()))
}

/// Result payload for the `run` command.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Input file path.
    pub input: String,
    /// Output file path (absent for dry runs).
    pub output: Option<String>,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Documents delivered to the sink.
    pub processed: u64,
    /// Documents dropped by a stage.
    pub dropped: u64,
    /// Distinct destinations observed (dry runs only).
    pub sample_destinations: Vec<String>,
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "input:      {}", self.input)?;
        match &self.output {
            Some(output) => writeln!(w, "output:     {output}")?,
            None => writeln!(w, "output:     (dry run)")?,
        }
        writeln!(w, "processed:  {}", self.processed)?;
        writeln!(w, "dropped:    {}", self.dropped)?;
        if !self.sample_destinations.is_empty() {
            writeln!(w, "destinations:")?;
            for destination in &self.sample_destinations {
                writeln!(w, "  - {destination}")?;
            }
        }
        Ok(())
    }
}
