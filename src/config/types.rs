//! Configuration types for surface-diff operations.

use crate::reports::ReportFormat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Unified Application Configuration
// ============================================================================

/// Unified application configuration that can be loaded from CLI args or config files.
///
/// CLI arguments are layered over file settings with [`AppConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AppConfig {
    /// Comparison behavior
    pub compare: CompareConfig,
    /// Analysis rule configuration
    pub rules: RulesConfig,
    /// Output configuration (format, file, colors)
    pub output: OutputConfig,
    /// Where runs and comparisons are stored
    pub storage: StorageConfig,
    /// Behavior flags
    pub behavior: BehaviorConfig,
}

impl AppConfig {
    /// Create a new `AppConfig` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an `AppConfig` builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

// ============================================================================
// Builder for AppConfig
// ============================================================================

/// Builder for constructing `AppConfig` with fluent API.
#[derive(Debug, Default)]
#[must_use]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Run analysis rules over the results.
    pub const fn analyze(mut self, analyze: bool) -> Self {
        self.config.compare.analyze = analyze;
        self
    }

    /// Recompute completed comparisons.
    pub const fn force(mut self, force: bool) -> Self {
        self.config.compare.force = force;
        self
    }

    /// Set the rules file.
    pub fn rules_file(mut self, file: Option<PathBuf>) -> Self {
        self.config.rules.file = file;
        self
    }

    /// Set the output format.
    pub const fn output_format(mut self, format: ReportFormat) -> Self {
        self.config.output.format = format;
        self
    }

    /// Set the output file.
    pub fn output_file(mut self, file: Option<PathBuf>) -> Self {
        self.config.output.file = file;
        self
    }

    /// Disable colored output.
    pub const fn no_color(mut self, no_color: bool) -> Self {
        self.config.output.no_color = no_color;
        self
    }

    /// Set the storage directory.
    pub fn storage_directory(mut self, dir: Option<PathBuf>) -> Self {
        self.config.storage.directory = dir;
        self
    }

    /// Fail when any result reaches this severity.
    pub fn fail_on_severity(mut self, severity: Option<String>) -> Self {
        self.config.behavior.fail_on_severity = severity;
        self
    }

    /// Enable quiet mode.
    pub const fn quiet(mut self, quiet: bool) -> Self {
        self.config.behavior.quiet = quiet;
        self
    }

    /// Build the `AppConfig`.
    #[must_use]
    pub fn build(self) -> AppConfig {
        self.config
    }
}

// ============================================================================
// Sections
// ============================================================================

/// Comparison behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CompareConfig {
    /// Run analysis rules over the results
    pub analyze: bool,
    /// Recompute comparisons that already completed
    pub force: bool,
    /// Worker threads for parallel stages (0 uses every core)
    pub parallel: usize,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            analyze: true,
            force: false,
            parallel: 0,
        }
    }
}

/// Analysis rule configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule document (JSON); the built-in rules are used when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Names of rules to skip
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disabled: Vec<String>,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: ReportFormat,
    /// Output file path (None for stdout)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Disable colored output
    pub no_color: bool,
    /// Pretty-print JSON output
    pub pretty: bool,
    /// Include field-level diffs in reports
    pub include_diffs: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Summary,
            file: None,
            no_color: false,
            pretty: true,
            include_diffs: true,
        }
    }
}

/// Storage location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StorageConfig {
    /// Store directory; defaults to the platform data directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured directory, or `<data dir>/surface-diff`.
    #[must_use]
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("surface-diff")
        })
    }
}

/// Behavior flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Suppress non-essential output
    pub quiet: bool,
    /// Exit with code 1 when any result is analyzed at or above this severity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_on_severity: Option<String>,
}
