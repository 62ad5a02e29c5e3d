//! Report type definitions.

use crate::diff::{CompareResult, ComparisonOutcome};
use crate::model::Severity;
use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output format for reports
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Brief summary output
    #[default]
    Summary,
    /// Structured JSON grouped by result type and change type
    Json,
    /// One JSON result per line
    #[value(alias = "jsonl")]
    Ndjson,
    /// SARIF 2.1.0 for CI/CD
    Sarif,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Summary => write!(f, "summary"),
            Self::Json => write!(f, "json"),
            Self::Ndjson => write!(f, "ndjson"),
            Self::Sarif => write!(f, "sarif"),
        }
    }
}

/// Configuration for report generation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Drop analyzed results below this severity
    pub min_severity: Option<Severity>,
    /// Include field-level diffs
    pub include_diffs: bool,
    /// Additional metadata to include
    pub metadata: ReportMetadata,
}

impl ReportConfig {
    /// Config for an outcome with default options.
    #[must_use]
    pub fn for_outcome(outcome: &ComparisonOutcome) -> Self {
        Self {
            pretty: true,
            min_severity: None,
            include_diffs: true,
            metadata: ReportMetadata::for_outcome(outcome),
        }
    }

    /// Whether a result passes the severity filter.
    ///
    /// Results without an analysis verdict are always included.
    #[must_use]
    pub fn includes(&self, result: &CompareResult) -> bool {
        match (self.min_severity, result.analysis) {
            (Some(min), Some(severity)) => severity >= min,
            _ => true,
        }
    }
}

/// Metadata included in reports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReportMetadata {
    pub tool: String,
    /// Tool version
    pub version: String,
    pub os: String,
    pub os_version: Option<String>,
    /// Generation timestamp
    pub generated_at: String,
    pub base_run: Option<String>,
    pub compare_run: Option<String>,
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            os_version: None,
            generated_at: chrono::Utc::now().to_rfc3339(),
            base_run: None,
            compare_run: None,
        }
    }
}

impl ReportMetadata {
    #[must_use]
    pub fn for_outcome(outcome: &ComparisonOutcome) -> Self {
        Self {
            base_run: outcome.first_run.clone(),
            compare_run: outcome.second_run.clone(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_os_version(mut self, os_version: Option<String>) -> Self {
        self.os_version = os_version;
        self
    }
}
