//! Configuration validation for surface-diff.

use super::types::{AppConfig, BehaviorConfig, CompareConfig, OutputConfig, RulesConfig};
use crate::model::Severity;

// ============================================================================
// Configuration Error
// ============================================================================

/// Error type for configuration validation.
#[derive(Debug, Clone)]
pub struct ConfigError {
    /// The field that failed validation
    pub field: String,
    /// Description of the validation error
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Validation Trait
// ============================================================================

/// Trait for validatable configuration types.
pub trait Validatable {
    /// Validate the configuration, returning any errors found.
    fn validate(&self) -> Vec<ConfigError>;

    /// Check if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

// ============================================================================
// Validation Implementations
// ============================================================================

impl Validatable for AppConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.compare.validate());
        errors.extend(self.rules.validate());
        errors.extend(self.output.validate());
        errors.extend(self.behavior.validate());
        errors
    }
}

impl Validatable for CompareConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if self.parallel > 1024 {
            errors.push(ConfigError {
                field: "compare.parallel".to_string(),
                message: format!("Thread count must be at most 1024, got {}", self.parallel),
            });
        }
        errors
    }
}

impl Validatable for RulesConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if let Some(ref file) = self.file
            && !file.exists()
        {
            errors.push(ConfigError {
                field: "rules.file".to_string(),
                message: format!("Rules file does not exist: {}", file.display()),
            });
        }
        if self.disabled.iter().any(|name| name.trim().is_empty()) {
            errors.push(ConfigError {
                field: "rules.disabled".to_string(),
                message: "Disabled rule names must not be empty".to_string(),
            });
        }
        errors
    }
}

impl Validatable for OutputConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if let Some(ref file_path) = self.file
            && let Some(parent) = file_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ConfigError {
                field: "output.file".to_string(),
                message: format!("Parent directory does not exist: {}", parent.display()),
            });
        }

        errors
    }
}

impl Validatable for BehaviorConfig {
    fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        if let Some(ref severity) = self.fail_on_severity
            && severity.parse::<Severity>().is_err()
        {
            let valid: Vec<&str> = Severity::ALL.iter().map(|s| s.as_str()).collect();
            errors.push(ConfigError {
                field: "behavior.fail_on_severity".to_string(),
                message: format!(
                    "Invalid severity '{}'. Valid options: {}",
                    severity,
                    valid.join(", ")
                ),
            });
        }
        errors
    }
}
