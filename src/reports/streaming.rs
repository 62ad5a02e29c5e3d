//! Streaming NDJSON output for large comparisons.
//!
//! Each line is a tagged JSON object: one `metadata` line, one `result` line
//! per compare result, and a closing `summary` line. Lines are written as
//! they are produced, so a comparison with hundreds of thousands of results
//! never has to be rendered into a single string.
//!
//! # Example
//!
//! ```ignore
//! use surface_diff::reports::streaming::NdjsonWriter;
//! use std::io::BufWriter;
//! use std::fs::File;
//!
//! let file = File::create("results.ndjson")?;
//! let mut writer = BufWriter::new(file);
//! let mut ndjson = NdjsonWriter::new(&mut writer);
//! ndjson.write_outcome(&outcome, &config)?;
//! ```

use super::{ReportConfig, ReportError, ReportFormat, ReportGenerator};
use crate::diff::{bucket_key, CompareResult, ComparisonOutcome};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::io::Write;

/// Newline-delimited JSON writer.
pub struct NdjsonWriter<'w, W: Write> {
    writer: &'w mut W,
    flush_interval: usize,
    items_written: usize,
}

impl<'w, W: Write> NdjsonWriter<'w, W> {
    /// Create a new NDJSON writer.
    pub fn new(writer: &'w mut W) -> Self {
        Self {
            writer,
            flush_interval: 100,
            items_written: 0,
        }
    }

    /// Set the flush interval.
    #[must_use]
    pub fn with_flush_interval(mut self, interval: usize) -> Self {
        self.flush_interval = interval.max(1);
        self
    }

    /// Number of lines written so far.
    #[must_use]
    pub const fn items_written(&self) -> usize {
        self.items_written
    }

    /// Write a single item as a JSON line.
    pub fn write_item<T: Serialize>(&mut self, item: &T) -> Result<(), ReportError> {
        let json = serde_json::to_string(item)?;
        self.writer.write_all(json.as_bytes())?;
        self.writer.write_all(b"\n")?;

        self.items_written += 1;
        if self.items_written % self.flush_interval == 0 {
            self.writer.flush()?;
        }

        Ok(())
    }

    /// Write a tagged item (with a type field).
    pub fn write_tagged<T: Serialize>(&mut self, tag: &str, item: &T) -> Result<(), ReportError> {
        #[derive(Serialize)]
        struct Tagged<'a, T> {
            #[serde(rename = "type")]
            type_: &'a str,
            data: &'a T,
        }

        self.write_item(&Tagged {
            type_: tag,
            data: item,
        })
    }

    /// Write one compare result under its bucket key.
    pub fn write_result(&mut self, result: &CompareResult) -> Result<(), ReportError> {
        #[derive(Serialize)]
        struct Line<'a> {
            #[serde(rename = "type")]
            type_: &'static str,
            bucket: String,
            data: &'a CompareResult,
        }

        self.write_item(&Line {
            type_: "result",
            bucket: bucket_key(result.result_type, result.change_type),
            data: result,
        })
    }

    /// Write a whole outcome: metadata, filtered results, then the summary.
    pub fn write_outcome(
        &mut self,
        outcome: &ComparisonOutcome,
        config: &ReportConfig,
    ) -> Result<(), ReportError> {
        self.write_tagged("metadata", &config.metadata)?;

        let mut written = 0usize;
        for result in outcome.iter_results().filter(|r| config.includes(r)) {
            let result = if config.include_diffs {
                Cow::Borrowed(result)
            } else {
                let mut stripped = result.clone();
                stripped.diffs.clear();
                Cow::Owned(stripped)
            };
            self.write_result(&result)?;
            written += 1;
        }

        let summary = NdjsonSummary {
            total: outcome.total(),
            written,
            status: outcome.status.to_string(),
            cancelled: outcome.cancelled,
            by_severity: outcome
                .severity_counts()
                .into_iter()
                .map(|(s, n)| (s.to_string(), n))
                .collect(),
            warnings: &outcome.warnings,
        };
        self.write_tagged("summary", &summary)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct NdjsonSummary<'a> {
    total: usize,
    written: usize,
    status: String,
    cancelled: bool,
    by_severity: BTreeMap<String, usize>,
    warnings: &'a [String],
}

/// NDJSON reporter that renders through [`NdjsonWriter`] into a buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonReporter;

impl NdjsonReporter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ReportGenerator for NdjsonReporter {
    fn generate_report(
        &self,
        outcome: &ComparisonOutcome,
        config: &ReportConfig,
    ) -> Result<String, ReportError> {
        let mut buffer = Vec::new();
        NdjsonWriter::new(&mut buffer).write_outcome(outcome, config)?;
        String::from_utf8(buffer).map_err(|e| ReportError::SerializationError(e.to_string()))
    }

    fn write_report(
        &self,
        outcome: &ComparisonOutcome,
        config: &ReportConfig,
        mut writer: &mut dyn Write,
    ) -> Result<(), ReportError> {
        NdjsonWriter::new(&mut writer).write_outcome(outcome, config)
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Ndjson
    }
}
