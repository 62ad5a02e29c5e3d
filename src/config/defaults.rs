//! Default configurations and presets for surface-diff.

use super::types::{
    AppConfig, BehaviorConfig, CompareConfig, OutputConfig, RulesConfig, StorageConfig,
};
use crate::reports::ReportFormat;

// ============================================================================
// Configuration Presets
// ============================================================================

/// Named configuration presets for common use cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPreset {
    /// Analyze results and print a summary
    Default,
    /// Always recompute, keep every diff, fail on Warning
    Audit,
    /// SARIF output, quiet, fail on Fail
    Ci,
}

impl ConfigPreset {
    /// Get the preset name as a string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Audit => "audit",
            Self::Ci => "ci",
        }
    }

    /// Parse a preset from a string name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" => Some(Self::Default),
            "audit" | "review" => Some(Self::Audit),
            "ci" | "ci-cd" | "pipeline" => Some(Self::Ci),
            _ => None,
        }
    }

    /// Get a description of this preset.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Default => "Analyze every comparison and print a terminal summary",
            Self::Audit => "Recompute comparisons and fail on anything at Warning or above",
            Self::Ci => "Quiet SARIF output that fails the build on Fail or Critical findings",
        }
    }

    /// Get all available presets.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Default, Self::Audit, Self::Ci]
    }
}

impl std::fmt::Display for ConfigPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Preset Implementations
// ============================================================================

impl AppConfig {
    /// Create an `AppConfig` from a named preset.
    #[must_use]
    pub fn from_preset(preset: ConfigPreset) -> Self {
        match preset {
            ConfigPreset::Default => Self::default(),
            ConfigPreset::Audit => Self::audit_preset(),
            ConfigPreset::Ci => Self::ci_preset(),
        }
    }

    /// Audit preset.
    ///
    /// - Always recompute
    /// - JSON output with diffs
    /// - Fail on Warning
    #[must_use]
    pub fn audit_preset() -> Self {
        Self {
            compare: CompareConfig {
                analyze: true,
                force: true,
                parallel: 0,
            },
            rules: RulesConfig::default(),
            output: OutputConfig {
                format: ReportFormat::Json,
                ..OutputConfig::default()
            },
            storage: StorageConfig::default(),
            behavior: BehaviorConfig {
                quiet: false,
                fail_on_severity: Some("Warning".to_string()),
            },
        }
    }

    /// CI pipeline preset.
    ///
    /// - SARIF output without colors
    /// - Quiet mode
    /// - Fail on Fail
    #[must_use]
    pub fn ci_preset() -> Self {
        Self {
            compare: CompareConfig::default(),
            rules: RulesConfig::default(),
            output: OutputConfig {
                format: ReportFormat::Sarif,
                no_color: true,
                pretty: false,
                ..OutputConfig::default()
            },
            storage: StorageConfig::default(),
            behavior: BehaviorConfig {
                quiet: true,
                fail_on_severity: Some("Fail".to_string()),
            },
        }
    }
}

// ============================================================================
// Default Values
// ============================================================================

/// Config file names searched in each discovery location.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    ".surface-diff.yaml",
    ".surface-diff.yml",
    "surface-diff.yaml",
    "surface-diff.yml",
];

/// Directory name under the user config and data directories.
pub const APP_DIR_NAME: &str = "surface-diff";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_names() {
        assert_eq!(ConfigPreset::Default.name(), "default");
        assert_eq!(ConfigPreset::Audit.name(), "audit");
        assert_eq!(ConfigPreset::Ci.name(), "ci");
    }

    #[test]
    fn test_preset_from_name() {
        assert_eq!(ConfigPreset::from_name("CI"), Some(ConfigPreset::Ci));
        assert_eq!(ConfigPreset::from_name("pipeline"), Some(ConfigPreset::Ci));
        assert_eq!(ConfigPreset::from_name("review"), Some(ConfigPreset::Audit));
        assert_eq!(ConfigPreset::from_name("unknown"), None);
    }

    #[test]
    fn test_every_preset_round_trips_by_name() {
        for preset in ConfigPreset::all() {
            assert_eq!(ConfigPreset::from_name(preset.name()), Some(*preset));
            assert!(!preset.description().is_empty());
        }
    }

    #[test]
    fn test_audit_preset() {
        let config = AppConfig::from_preset(ConfigPreset::Audit);
        assert!(config.compare.force);
        assert_eq!(config.output.format, ReportFormat::Json);
        assert_eq!(config.behavior.fail_on_severity.as_deref(), Some("Warning"));
    }

    #[test]
    fn test_ci_preset() {
        let config = AppConfig::from_preset(ConfigPreset::Ci);
        assert_eq!(config.output.format, ReportFormat::Sarif);
        assert!(config.output.no_color);
        assert!(config.behavior.quiet);
    }

    #[test]
    fn test_default_preset_is_default() {
        assert_eq!(AppConfig::from_preset(ConfigPreset::Default), AppConfig::default());
    }
}
