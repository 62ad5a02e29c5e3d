//! Configuration file loading and discovery.
//!
//! Supports loading configuration from YAML files with automatic discovery.

use super::defaults::{APP_DIR_NAME, CONFIG_FILE_NAMES};
use super::types::{AppConfig, CompareConfig, OutputConfig};
use std::path::{Path, PathBuf};

// ============================================================================
// Configuration File Discovery
// ============================================================================

/// Discover a config file by searching standard locations.
///
/// Search order: explicit path, current directory, git repository root,
/// user config directory (`~/.config/surface-diff/`), home directory.
#[must_use]
pub fn discover_config_file(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path.filter(|p| p.exists()) {
        return Some(path.to_path_buf());
    }

    let cwd = std::env::current_dir().ok();
    let git_root = cwd.as_deref().and_then(find_git_root);
    [cwd, git_root, user_config_dir(), dirs::home_dir()]
        .into_iter()
        .flatten()
        .find_map(|dir| find_config_in_dir(&dir))
}

/// `<config dir>/surface-diff`, where `config init` writes by default.
#[must_use]
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME))
}

/// Find a config file in a specific directory.
fn find_config_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Nearest ancestor of `start` (inclusive) containing `.git`.
fn find_git_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

// ============================================================================
// Configuration File Loading
// ============================================================================

/// Errors reading a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

/// Load an `AppConfig` from a YAML file.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigFileError> {
    if !path.exists() {
        return Err(ConfigFileError::NotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml_ng::from_str(&content).map_err(|source| ConfigFileError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load config from discovered file, or return default.
#[must_use]
pub fn load_or_default(explicit_path: Option<&Path>) -> (AppConfig, Option<PathBuf>) {
    discover_config_file(explicit_path).map_or_else(
        || (AppConfig::default(), None),
        |path| match load_config_file(&path) {
            Ok(config) => (config, Some(path)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring config file");
                (AppConfig::default(), None)
            }
        },
    )
}

// ============================================================================
// Configuration Merging
// ============================================================================

impl AppConfig {
    /// Merge another config into this one, with `other` taking precedence.
    ///
    /// Only values that differ from the defaults override.
    pub fn merge(&mut self, other: &Self) {
        let compare_defaults = CompareConfig::default();
        if other.compare.analyze != compare_defaults.analyze {
            self.compare.analyze = other.compare.analyze;
        }
        if other.compare.force {
            self.compare.force = true;
        }
        if other.compare.parallel != compare_defaults.parallel {
            self.compare.parallel = other.compare.parallel;
        }

        if other.rules.file.is_some() {
            self.rules.file.clone_from(&other.rules.file);
        }
        for name in &other.rules.disabled {
            if !self.rules.disabled.contains(name) {
                self.rules.disabled.push(name.clone());
            }
        }

        let output_defaults = OutputConfig::default();
        if other.output.format != output_defaults.format {
            self.output.format = other.output.format;
        }
        if other.output.file.is_some() {
            self.output.file.clone_from(&other.output.file);
        }
        if other.output.no_color {
            self.output.no_color = true;
        }
        if other.output.pretty != output_defaults.pretty {
            self.output.pretty = other.output.pretty;
        }
        if other.output.include_diffs != output_defaults.include_diffs {
            self.output.include_diffs = other.output.include_diffs;
        }

        if other.storage.directory.is_some() {
            self.storage.directory.clone_from(&other.storage.directory);
        }

        if other.behavior.quiet {
            self.behavior.quiet = true;
        }
        if other.behavior.fail_on_severity.is_some() {
            self.behavior
                .fail_on_severity
                .clone_from(&other.behavior.fail_on_severity);
        }
    }

    /// Load from file and merge with CLI overrides.
    #[must_use]
    pub fn from_file_with_overrides(
        config_path: Option<&Path>,
        cli_overrides: &Self,
    ) -> (Self, Option<PathBuf>) {
        let (mut config, loaded_from) = load_or_default(config_path);
        config.merge(cli_overrides);
        (config, loaded_from)
    }
}

// ============================================================================
// Example Config Generation
// ============================================================================

/// Generate an example config file content.
#[must_use]
pub fn generate_example_config() -> String {
    let example = AppConfig::default();
    format!(
        r"# surface-diff configuration
# Place this file at .surface-diff.yaml in your project root or ~/.config/surface-diff/

{}
",
        serde_yaml_ng::to_string(&example).unwrap_or_default()
    )
}

/// Generate a commented example config with all options.
#[must_use]
pub fn generate_full_example_config() -> String {
    r"# surface-diff configuration file
# =================================
#
# Place it at:
#   - .surface-diff.yaml in your project root
#   - ~/.config/surface-diff/surface-diff.yaml for global config
#
# CLI arguments always override file settings.

compare:
  # Run analysis rules over the results
  analyze: true
  # Recompute comparisons that already completed
  force: false
  # Worker threads (0 = all cores)
  parallel: 0

rules:
  # JSON rule document; built-in rules are used when omitted
  # file: ./rules.json
  # Rules to skip by name
  # disabled:
  #   - Listener bound to all interfaces

output:
  # Format: summary, json, ndjson, sarif
  format: summary
  # Output file path (omit for stdout)
  # file: report.json
  no_color: false
  pretty: true
  include_diffs: true

# Where imported runs and comparisons live
storage: {}
  # directory: ~/.local/share/surface-diff

behavior:
  quiet: false
  # Exit with code 1 when a result reaches this severity:
  # Verbose, Information, Warning, Fail, Critical
  # fail_on_severity: Fail
"
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::ReportFormat;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_dir() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join(".surface-diff.yaml");
        std::fs::write(&config_path, "compare:\n  force: true\n").unwrap();

        let found = find_config_in_dir(tmp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_dir_not_found() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(find_config_in_dir(tmp.path()), None);
    }

    #[test]
    fn test_load_config_file() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.yaml");

        let yaml = r"
compare:
  analyze: false
output:
  format: sarif
behavior:
  fail_on_severity: Warning
";
        std::fs::write(&config_path, yaml).unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert!(!config.compare.analyze);
        assert_eq!(config.output.format, ReportFormat::Sarif);
        assert!(config.output.pretty);
        assert_eq!(config.behavior.fail_on_severity.as_deref(), Some("Warning"));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config_file(Path::new("/nonexistent/config.yaml"));
        assert!(matches!(result, Err(ConfigFileError::NotFound(_))));
    }

    #[test]
    fn test_load_config_file_parse_error() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("broken.yaml");
        std::fs::write(&config_path, "compare: [not, a, map]\n").unwrap();
        assert!(matches!(
            load_config_file(&config_path),
            Err(ConfigFileError::Parse { .. })
        ));
    }

    #[test]
    fn test_config_merge() {
        let mut base = AppConfig {
            rules: super::super::types::RulesConfig {
                file: None,
                disabled: vec!["a".to_string()],
            },
            ..AppConfig::default()
        };
        let mut overrides = AppConfig::builder()
            .analyze(false)
            .output_format(ReportFormat::Json)
            .fail_on_severity(Some("Fail".to_string()))
            .build();
        overrides.rules.disabled = vec!["a".to_string(), "b".to_string()];

        base.merge(&overrides);

        assert!(!base.compare.analyze);
        assert_eq!(base.output.format, ReportFormat::Json);
        assert_eq!(base.behavior.fail_on_severity.as_deref(), Some("Fail"));
        assert_eq!(base.rules.disabled, vec!["a", "b"]);
    }

    #[test]
    fn test_merge_keeps_file_values_for_defaults() {
        let mut base = AppConfig::builder()
            .output_format(ReportFormat::Ndjson)
            .force(true)
            .build();
        base.merge(&AppConfig::default());
        assert_eq!(base.output.format, ReportFormat::Ndjson);
        assert!(base.compare.force);
    }

    #[test]
    fn test_generate_example_config() {
        let example = generate_example_config();
        assert!(example.contains("compare:"));
        assert!(example.contains("analyze"));
        let parsed: AppConfig = serde_yaml_ng::from_str(&example).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn test_full_example_parses() {
        let parsed: AppConfig = serde_yaml_ng::from_str(&generate_full_example_config()).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn test_git_root_found_from_subdirectory() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        assert_eq!(find_git_root(&nested), Some(tmp.path().to_path_buf()));
    }

    #[test]
    fn test_discover_explicit_path() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("custom-config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "compare:\n  force: true").unwrap();

        let discovered = discover_config_file(Some(&config_path));
        assert_eq!(discovered, Some(config_path));
    }
}
