//! CLI command handlers.
//!
//! Testable command handlers invoked by main.rs. Each handler implements the
//! business logic for one subcommand and returns the process exit code where
//! the command has more than one outcome.

mod compare;
mod import;
mod rules;
mod runs;

pub use compare::{run_compare, run_export};
pub use import::run_import;
pub use rules::{run_rules_show, run_rules_validate};
pub use runs::{run_delete, run_list_runs};

pub use crate::config::AppConfig;

use crate::model::Severity;
use anyhow::Result;

/// Parse the configured failure threshold.
pub(crate) fn fail_threshold(config: &AppConfig) -> Result<Option<Severity>> {
    config
        .behavior
        .fail_on_severity
        .as_deref()
        .map(|s| s.parse::<Severity>().map_err(anyhow::Error::msg))
        .transpose()
}
