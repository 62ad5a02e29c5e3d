//! Run comparison: reconciliation, field diffing and orchestration.
//!
//! # Architecture
//!
//! - [`reconcile`]: hash-join of two runs on identity, per result type
//! - [`generate_diffs`]: field-level diff of a matched pair
//! - [`CompareEngine`]: drives reconcile, diff, bucket, analyze and persist
//!
//! # Example
//!
//! ```ignore
//! use surface_diff::diff::CompareEngine;
//! use surface_diff::storage::MemoryStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let engine = CompareEngine::new(store).with_analyzer(analyzer);
//! let outcome = engine.compare_runs(Some("monday"), Some("tuesday"), true)?;
//! for ((rt, ct), results) in &outcome.results {
//!     println!("{rt} {ct}: {}", results.len());
//! }
//! ```

mod engine;
mod generator;
mod reconcile;
mod result;

pub use engine::{analyze_results, bucket_results, CompareEngine};
pub use generator::{diff_observations, diff_pairs, generate_diffs};
pub(crate) use generator::compare_field;
pub use reconcile::{
    partition_identities, reconcile, IdentityPartition, Reconciliation, TypeReconciliation,
};
pub use result::{
    bucket_key, ChangeType, CompareResult, ComparisonOutcome, ComparisonStatus, Diff,
    ResultBuckets, StageTimings,
};
