//! JSON report generator.

use super::{ReportConfig, ReportError, ReportFormat, ReportGenerator, ReportMetadata};
use crate::diff::{bucket_key, CompareResult, ComparisonOutcome};
use serde::Serialize;
use std::collections::BTreeMap;

/// JSON report generator
pub struct JsonReporter {
    /// Whether to only include summary
    summary_only: bool,
    /// Pretty print output, unless the config turns it off
    pretty: bool,
}

impl JsonReporter {
    /// Create a new JSON reporter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            summary_only: false,
            pretty: true,
        }
    }

    /// Create a summary-only reporter
    #[must_use]
    pub const fn summary_only() -> Self {
        Self {
            summary_only: true,
            pretty: true,
        }
    }

    /// Set pretty printing
    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator for JsonReporter {
    fn generate_report(
        &self,
        outcome: &ComparisonOutcome,
        config: &ReportConfig,
    ) -> Result<String, ReportError> {
        let mut results: BTreeMap<String, Vec<CompareResult>> = BTreeMap::new();
        if !self.summary_only {
            for ((rt, ct), bucket) in &outcome.results {
                let kept: Vec<CompareResult> = bucket
                    .iter()
                    .filter(|r| config.includes(r))
                    .map(|r| {
                        let mut r = r.clone();
                        if !config.include_diffs {
                            r.diffs.clear();
                        }
                        r
                    })
                    .collect();
                if !kept.is_empty() {
                    results.insert(bucket_key(*rt, *ct), kept);
                }
            }
        }

        let report = JsonReport {
            metadata: &config.metadata,
            summary: JsonSummary::from_outcome(outcome),
            warnings: &outcome.warnings,
            results,
        };

        let json = if self.pretty && config.pretty {
            serde_json::to_string_pretty(&report)?
        } else {
            serde_json::to_string(&report)?
        };
        Ok(json)
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: &'a ReportMetadata,
    summary: JsonSummary,
    warnings: &'a [String],
    results: BTreeMap<String, Vec<CompareResult>>,
}

#[derive(Serialize)]
struct JsonSummary {
    total: usize,
    status: String,
    from_store: bool,
    cancelled: bool,
    by_change_type: BTreeMap<String, usize>,
    by_severity: BTreeMap<String, usize>,
    timings_ms: BTreeMap<&'static str, u128>,
}

impl JsonSummary {
    fn from_outcome(outcome: &ComparisonOutcome) -> Self {
        let t = &outcome.timings;
        Self {
            total: outcome.total(),
            status: outcome.status.to_string(),
            from_store: outcome.from_store,
            cancelled: outcome.cancelled,
            by_change_type: outcome
                .change_counts()
                .into_iter()
                .map(|(ct, n)| (ct.to_string(), n))
                .collect(),
            by_severity: outcome
                .severity_counts()
                .into_iter()
                .map(|(s, n)| (s.to_string(), n))
                .collect(),
            timings_ms: [
                ("reconcile", t.reconcile.as_millis()),
                ("diff", t.diff.as_millis()),
                ("bucket", t.bucket.as_millis()),
                ("analyze", t.analyze.as_millis()),
                ("persist", t.persist.as_millis()),
            ]
            .into_iter()
            .collect(),
        }
    }
}
