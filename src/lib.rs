//! **Attack surface snapshot comparison and rule-based change analysis.**
//!
//! `surface-diff` compares two collection runs of a host's attack surface
//! (files, open ports, services, accounts, certificates, firewall rules and
//! more) and reports what was created, deleted or modified between them.
//! Every change can then be scored against a declarative rule document,
//! producing a severity from `Verbose` up to `Critical`.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: observations, runs and the closed [`FieldValue`] sum that
//!   every comparable field is expressed in.
//! - **[`diff`]**: the [`CompareEngine`], which reconciles two runs by
//!   identity, diffs modified pairs field by field and buckets the results
//!   by `(ResultType, ChangeType)`.
//! - **[`analyzer`]**: rule documents and the [`Analyzer`] that turns a
//!   compare result into a severity.
//! - **[`storage`]**: the [`ObservationStore`] trait with in-memory and
//!   directory-backed implementations.
//! - **[`reports`]**: JSON, NDJSON, SARIF and terminal summary output.
//!
//! ## Comparing Two Runs
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use surface_diff::{
//!     load_rule_set, Analyzer, CompareEngine, MemoryStore, ObservationStore, RunSnapshot,
//! };
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     RunSnapshot::from_path(Path::new("monday.json"))?.import_into(store.as_ref())?;
//!     RunSnapshot::from_path(Path::new("tuesday.json"))?.import_into(store.as_ref())?;
//!
//!     let analyzer = Analyzer::new(Arc::new(load_rule_set(None)));
//!     let engine = CompareEngine::new(store).with_analyzer(analyzer);
//!     let outcome = engine.compare_runs(Some("monday"), Some("tuesday"), true)?;
//!
//!     for result in outcome.iter_results() {
//!         println!(
//!             "{} {} {} {:?}",
//!             result.result_type,
//!             result.change_type,
//!             result.identity(),
//!             result.analysis
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Command-Line Interface (CLI)
//!
//! This documentation is for the `surface-diff` library crate. The
//! `surface-diff` binary wraps it with `import`, `compare`, `export` and
//! related subcommands; see the README.

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::similar_names,
    clippy::module_name_repetitions
)]

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod reports;
pub mod storage;
pub mod utils;

pub use analyzer::{load_rule_set, Analyzer, Rule, RuleDocument, RuleSet, RuleSetHandle, Verdict};
pub use config::{AppConfig, AppConfigBuilder, ConfigError, ConfigPreset, Validatable};
pub use diff::{
    ChangeType, CompareEngine, CompareResult, ComparisonOutcome, ComparisonStatus, Diff,
};
pub use error::{ErrorContext, OptionContext, Result, SurfaceDiffError};
pub use model::{FieldValue, Observation, ObservationData, Platform, ResultType, Run, Severity};
pub use reports::{ReportFormat, ReportGenerator, WriterReporter};
pub use storage::{DirectoryStore, MemoryStore, ObservationStore, RunSnapshot};
