use crate::diff::{reconcile, ComparisonStatus, CompareResult};
use crate::error::Result;
use crate::model::{Observation, Platform, ResultType, Run};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one comparison: an ordered pair of optional run ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComparisonKey {
    pub first: Option<String>,
    pub second: Option<String>,
}

impl ComparisonKey {
    pub fn new(first: Option<&str>, second: Option<&str>) -> Self {
        Self {
            first: first.map(str::to_string),
            second: second.map(str::to_string),
        }
    }

    /// Whether this comparison reads the given run.
    #[must_use]
    pub fn references(&self, run_id: &str) -> bool {
        self.first.as_deref() == Some(run_id) || self.second.as_deref() == Some(run_id)
    }
}

impl fmt::Display for ComparisonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}__{}",
            self.first.as_deref().unwrap_or("-"),
            self.second.as_deref().unwrap_or("-")
        )
    }
}

/// Store of runs, their observations and comparison results.
///
/// Implementations must satisfy these invariants:
/// - Observations are immutable once their run is inserted.
/// - Deleting a run removes its observations and every comparison that
///   references it.
/// - Concurrent reads are always safe; the comparison engine queries result
///   types in parallel.
pub trait ObservationStore: Send + Sync {
    /// Check whether a run exists.
    fn run_exists(&self, run_id: &str) -> Result<bool>;

    /// Fetch a run's metadata.
    ///
    /// Returns `RunNotFound` if it does not exist.
    fn run(&self, run_id: &str) -> Result<Run>;

    /// Platform the run was collected on.
    fn run_platform(&self, run_id: &str) -> Result<Platform> {
        Ok(self.run(run_id)?.platform)
    }

    /// All runs, oldest first.
    fn list_runs(&self) -> Result<Vec<Run>>;

    /// Result types that have at least one observation in the run.
    fn result_types(&self, run_id: &str) -> Result<Vec<ResultType>>;

    /// `(identity, row key)` of every observation of one type in a run.
    fn identities_and_hashes(&self, run_id: &str, result_type: ResultType)
    -> Result<Vec<(String, String)>>;

    /// Observations of one type in a run, selected by identity.
    ///
    /// Unknown identities are ignored; order follows `identities`.
    fn observations_by_identity(
        &self,
        run_id: &str,
        result_type: ResultType,
        identities: &[String],
    ) -> Result<Vec<Observation>>;

    /// Observations whose identity is absent from the other run, with the id
    /// of the run that owns each one.
    ///
    /// Default implementation goes through the reconciler. Backends with a
    /// query language may override it.
    fn observations_missing_from_other(
        &self,
        first: &str,
        second: &str,
    ) -> Result<Vec<(Observation, String)>>
    where
        Self: Sized,
    {
        let reconciliation = reconcile(self, Some(first), Some(second))?;
        let mut out: Vec<(Observation, String)> = reconciliation
            .only_in_first()
            .map(|o| (o.clone(), first.to_string()))
            .collect();
        out.extend(
            reconciliation
                .only_in_second()
                .map(|o| (o.clone(), second.to_string())),
        );
        Ok(out)
    }

    /// Pairs with equal identity and differing content.
    ///
    /// Default implementation goes through the reconciler.
    fn modified_pairs(&self, first: &str, second: &str) -> Result<Vec<(Observation, Observation)>>
    where
        Self: Sized,
    {
        let reconciliation = reconcile(self, Some(first), Some(second))?;
        Ok(reconciliation.modified_pairs().cloned().collect())
    }

    /// Insert a run with its observations.
    ///
    /// Returns `DuplicateRun` if a run with the same id already exists.
    fn insert_run(&self, run: Run, observations: Vec<Observation>) -> Result<()>;

    /// Delete a run, its observations and comparisons referencing it.
    ///
    /// Returns `true` if the run existed.
    fn delete_run(&self, run_id: &str) -> Result<bool>;

    /// Persist a batch of results for a comparison.
    ///
    /// Appends to any results already stored for the key.
    fn persist_results(&self, key: &ComparisonKey, results: &[CompareResult]) -> Result<()>;

    /// Remove stored results for a comparison before recomputing it.
    fn clear_results(&self, key: &ComparisonKey) -> Result<()>;

    fn comparison_status(&self, key: &ComparisonKey) -> Result<ComparisonStatus>;

    fn set_comparison_status(&self, key: &ComparisonKey, status: ComparisonStatus) -> Result<()>;

    /// All stored results of a comparison.
    fn compared_results(&self, key: &ComparisonKey) -> Result<Vec<CompareResult>>;
}
