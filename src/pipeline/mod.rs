//! Pipeline orchestration for comparison workflows.
//!
//! Shared logic for the load → compare → report workflow, so CLI command
//! handlers stay thin.

mod compare_stage;
mod output;
mod report_stage;
mod store_stage;

pub use compare_stage::{load_rules, run_comparison};
pub use output::{should_use_color, write_output, OutputTarget};
pub use report_stage::{build_report_config, exit_code_for, output_report};
pub use store_stage::{import_snapshots, open_store};

/// Structured pipeline error types for better diagnostics.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to open the store or import a snapshot
    #[error("Load failed for {path}: {source}")]
    LoadFailed {
        path: String,
        source: anyhow::Error,
    },

    /// Comparison failed
    #[error("Compare failed: {source}")]
    CompareFailed {
        #[source]
        source: anyhow::Error,
    },

    /// Report generation or output failed
    #[error("Report failed: {source}")]
    ReportFailed {
        #[source]
        source: anyhow::Error,
    },
}

/// Exit codes for CI/CD integration
pub mod exit_codes {
    /// Success - nothing reached the failure threshold
    pub const SUCCESS: i32 = 0;
    /// A result was analyzed at or above the `--fail-on` severity
    pub const SEVERITY_THRESHOLD: i32 = 1;
    /// `rules validate` found problems in the document
    pub const RULES_INVALID: i32 = 1;
    /// An error occurred
    pub const ERROR: i32 = 3;
}
