//! Configuration module for surface-diff.
//!
//! This module provides a unified configuration system with:
//! - Type-safe configuration structures
//! - Validation for all configuration values
//! - Named presets for common use cases
//! - YAML config file loading and discovery
//! - CLI argument merging
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use surface_diff::config::{AppConfig, ConfigPreset};
//!
//! let config = AppConfig::from_preset(ConfigPreset::Ci);
//!
//! let config = AppConfig::builder()
//!     .force(true)
//!     .fail_on_severity(Some("Warning".into()))
//!     .build();
//!
//! use surface_diff::config::file::load_or_default;
//! let (config, loaded_from) = load_or_default(None);
//! ```
//!
//! # Configuration File
//!
//! Place a `.surface-diff.yaml` file in your project root or `~/.config/surface-diff/`:
//!
//! ```yaml
//! compare:
//!   force: true
//! behavior:
//!   fail_on_severity: Fail
//! ```
//!
//! Analysis rules live in their own JSON document, referenced by `rules.file`.

mod defaults;
pub mod file;
mod types;
mod validation;

pub use defaults::{ConfigPreset, APP_DIR_NAME, CONFIG_FILE_NAMES};
pub use types::{
    AppConfig, AppConfigBuilder, BehaviorConfig, CompareConfig, OutputConfig, RulesConfig,
    StorageConfig,
};
pub use validation::{ConfigError, Validatable};

pub use file::{
    discover_config_file, generate_example_config, generate_full_example_config, load_config_file,
    load_or_default, user_config_dir, ConfigFileError,
};

/// Generate a JSON Schema for the `AppConfig` configuration format.
///
/// Editors can use it to validate and autocomplete `.surface-diff.yaml`.
pub fn generate_json_schema() -> Result<String, serde_json::Error> {
    let schema = schemars::schema_for!(AppConfig);
    serde_json::to_string_pretty(&schema)
}
