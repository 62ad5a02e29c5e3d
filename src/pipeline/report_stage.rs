//! Report output stage.
//!
//! Handles generating and writing comparison reports, including streaming
//! NDJSON straight to the destination.

use super::{should_use_color, write_output, OutputTarget, PipelineError};
use crate::config::AppConfig;
use crate::diff::ComparisonOutcome;
use crate::model::Severity;
use crate::reports::{
    create_reporter_with_options, NdjsonWriter, ReportConfig, ReportFormat, ReportMetadata,
};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

use super::exit_codes;

/// Report options for an outcome under the given config.
#[must_use]
pub fn build_report_config(
    config: &AppConfig,
    outcome: &ComparisonOutcome,
    os_version: Option<String>,
) -> ReportConfig {
    ReportConfig {
        pretty: config.output.pretty,
        min_severity: None,
        include_diffs: config.output.include_diffs,
        metadata: ReportMetadata::for_outcome(outcome).with_os_version(os_version),
    }
}

/// Output a comparison report to the configured destination.
pub fn output_report(
    config: &AppConfig,
    outcome: &ComparisonOutcome,
    report_config: &ReportConfig,
) -> Result<()> {
    let target = OutputTarget::from_option(config.output.file.clone());

    if config.output.format == ReportFormat::Ndjson {
        return output_streaming(&target, outcome, report_config, config.behavior.quiet)
            .map_err(|e| PipelineError::ReportFailed { source: e }.into());
    }

    let use_color = should_use_color(config.output.no_color, &target);
    let reporter = create_reporter_with_options(config.output.format, use_color);
    let report = reporter
        .generate_report(outcome, report_config)
        .map_err(|e| PipelineError::ReportFailed { source: e.into() })?;

    write_output(&report, &target, config.behavior.quiet)
}

/// Stream NDJSON lines without building the report in memory.
fn output_streaming(
    target: &OutputTarget,
    outcome: &ComparisonOutcome,
    report_config: &ReportConfig,
    quiet: bool,
) -> Result<()> {
    match target {
        OutputTarget::File(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            NdjsonWriter::new(&mut writer).write_outcome(outcome, report_config)?;
            writer.flush()?;
            if !quiet {
                tracing::info!("Streaming report written to {}", path.display());
            }
        }
        OutputTarget::Stdout => {
            let stdout = std::io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            NdjsonWriter::new(&mut writer).write_outcome(outcome, report_config)?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Exit code for an outcome given the `fail_on_severity` threshold.
#[must_use]
pub fn exit_code_for(outcome: &ComparisonOutcome, fail_on: Option<Severity>) -> i32 {
    match (fail_on, outcome.max_severity()) {
        (Some(threshold), Some(max)) if max >= threshold => exit_codes::SEVERITY_THRESHOLD,
        _ => exit_codes::SUCCESS,
    }
}
