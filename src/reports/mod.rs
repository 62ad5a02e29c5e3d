//! Report generation for comparison outcomes.
//!
//! Output formats:
//! - JSON: results grouped by `<ResultType>_<ChangeType>` with a metadata block
//! - NDJSON: one result per line, written incrementally
//! - SARIF: CI/CD security dashboard integration
//! - Summary: compact shell-friendly output

mod json;
mod sarif;
pub mod streaming;
mod summary;
mod types;

pub use json::JsonReporter;
pub use sarif::SarifReporter;
pub use streaming::{NdjsonReporter, NdjsonWriter};
pub use summary::SummaryReporter;
pub use types::{ReportConfig, ReportFormat, ReportMetadata};

use crate::diff::ComparisonOutcome;
use std::io::Write;
use thiserror::Error;

/// Errors that can occur during report generation
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Format error: {0}")]
    FormatError(#[from] std::fmt::Error),
}

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Trait for report generators
pub trait ReportGenerator {
    /// Generate a report from a comparison outcome
    fn generate_report(
        &self,
        outcome: &ComparisonOutcome,
        config: &ReportConfig,
    ) -> Result<String, ReportError>;

    /// Write report to a writer
    fn write_report(
        &self,
        outcome: &ComparisonOutcome,
        config: &ReportConfig,
        writer: &mut dyn Write,
    ) -> Result<(), ReportError> {
        let report = self.generate_report(outcome, config)?;
        writer.write_all(report.as_bytes())?;
        Ok(())
    }

    /// Get the format this generator produces
    fn format(&self) -> ReportFormat;
}

/// Trait for writing reports directly to a [`Write`] sink.
///
/// Every `ReportGenerator` gets this through a blanket impl that builds the
/// report string first. [`NdjsonWriter`] writes incrementally instead and
/// is used directly where output size matters.
pub trait WriterReporter {
    fn write_to<W: Write>(
        &self,
        outcome: &ComparisonOutcome,
        config: &ReportConfig,
        writer: &mut W,
    ) -> Result<(), ReportError>;

    /// Get the format this reporter produces
    fn format(&self) -> ReportFormat;
}

impl<T: ReportGenerator> WriterReporter for T {
    fn write_to<W: Write>(
        &self,
        outcome: &ComparisonOutcome,
        config: &ReportConfig,
        writer: &mut W,
    ) -> Result<(), ReportError> {
        let report = self.generate_report(outcome, config)?;
        writer.write_all(report.as_bytes())?;
        Ok(())
    }

    fn format(&self) -> ReportFormat {
        ReportGenerator::format(self)
    }
}

/// Create a report generator for the given format
#[must_use]
pub fn create_reporter(format: ReportFormat) -> Box<dyn ReportGenerator> {
    create_reporter_with_options(format, true)
}

/// Create a report generator with color control
#[must_use]
pub fn create_reporter_with_options(
    format: ReportFormat,
    use_color: bool,
) -> Box<dyn ReportGenerator> {
    match format {
        ReportFormat::Summary => {
            if use_color {
                Box::new(SummaryReporter::new())
            } else {
                Box::new(SummaryReporter::new().no_color())
            }
        }
        ReportFormat::Json => Box::new(JsonReporter::new()),
        ReportFormat::Ndjson => Box::new(NdjsonReporter::new()),
        ReportFormat::Sarif => Box::new(SarifReporter::new()),
    }
}
