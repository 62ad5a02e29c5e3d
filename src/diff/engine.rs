//! Comparison orchestration.

use super::generator::diff_pairs;
use super::reconcile::reconcile;
use super::result::{
    bucket_key, ChangeType, CompareResult, ComparisonOutcome, ComparisonStatus, ResultBuckets,
};
use crate::analyzer::Analyzer;
use crate::error::{CompareErrorKind, Result, SurfaceDiffError};
use crate::model::{Platform, ResultType};
use crate::storage::{ComparisonKey, ObservationStore};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Drives a two-run comparison end to end.
///
/// Reconciles the runs, diffs modified pairs, buckets results by
/// `(ResultType, ChangeType)`, optionally analyzes every result and
/// persists everything through the store.
pub struct CompareEngine {
    store: Arc<dyn ObservationStore>,
    analyzer: Analyzer,
    force: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl CompareEngine {
    /// Create an engine over a store, with no analysis rules.
    pub fn new(store: Arc<dyn ObservationStore>) -> Self {
        Self {
            store,
            analyzer: Analyzer::default(),
            force: false,
            cancel: None,
        }
    }

    /// Use this analyzer when analysis is requested
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Analyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Recompute even if the comparison already completed
    #[must_use]
    pub const fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Stop between result types when the flag is set
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn ObservationStore> {
        &self.store
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Compare two runs.
    ///
    /// With `first` absent every observation of `second` is reported as
    /// created; with `second` absent every observation of `first` as deleted.
    ///
    /// # Errors
    ///
    /// Fails when both ids are absent or a named run does not exist. Failures
    /// of individual result types or of persistence are reported as warnings
    /// on the outcome instead.
    pub fn compare_runs(
        &self,
        first: Option<&str>,
        second: Option<&str>,
        analyze: bool,
    ) -> Result<ComparisonOutcome> {
        if first.is_none() && second.is_none() {
            return Err(SurfaceDiffError::invalid_argument(
                "compare_runs needs at least one run id",
            ));
        }
        let key = ComparisonKey::new(first, second);
        let mut outcome = ComparisonOutcome {
            first_run: key.first.clone(),
            second_run: key.second.clone(),
            ..Default::default()
        };

        if !self.force && self.store.comparison_status(&key)? == ComparisonStatus::Completed {
            tracing::info!(comparison = %key, "Comparison already completed, loading stored results");
            outcome.results = bucket_results(self.store.compared_results(&key)?);
            if analyze && outcome.iter_results().any(|r| r.analysis.is_none()) {
                let platform = self.platform(first, second);
                analyze_results(&self.analyzer, &mut outcome.results, platform);
            }
            outcome.status = ComparisonStatus::Completed;
            outcome.from_store = true;
            return Ok(outcome);
        }

        self.store
            .set_comparison_status(&key, ComparisonStatus::Running)?;
        self.store.clear_results(&key)?;

        // Reconcile
        let started = Instant::now();
        let reconciliation = match reconcile(self.store.as_ref(), first, second) {
            Ok(r) => r,
            Err(e) => {
                self.reset_to_pending(&key);
                return Err(e);
            }
        };
        outcome.timings.reconcile = started.elapsed();
        let reconciled_types = reconciliation.by_type.len();
        let failed_types = reconciliation.failures.len();
        for (rt, err) in &reconciliation.failures {
            outcome.warn(CompareErrorKind::BucketFailed {
                bucket: rt.to_string(),
                reason: format!("reconciliation failed: {err}"),
            });
        }
        tracing::info!(
            types = reconciled_types,
            unchanged = reconciliation.unchanged(),
            elapsed_ms = outcome.timings.reconcile.as_millis(),
            "Reconciled runs"
        );

        // Build results and diff modified pairs
        let started = Instant::now();
        let mut built: Vec<((ResultType, ChangeType), Vec<CompareResult>)> = Vec::new();
        for (rt, t) in reconciliation.by_type {
            if self.cancelled() {
                tracing::warn!(comparison = %key, "Comparison cancelled");
                outcome.warn(CompareErrorKind::Cancelled);
                outcome.cancelled = true;
                break;
            }
            let created: Vec<CompareResult> = t
                .only_in_second
                .into_iter()
                .map(|obs| CompareResult::created(first, obs))
                .collect();
            let deleted: Vec<CompareResult> = t
                .only_in_first
                .into_iter()
                .map(|obs| CompareResult::deleted(obs, second))
                .collect();
            let diffs = diff_pairs(&t.modified_pairs);
            let modified: Vec<CompareResult> = t
                .modified_pairs
                .into_iter()
                .zip(diffs)
                .map(|((before, after), diffs)| CompareResult::modified(before, after, diffs))
                .collect();

            built.push(((rt, ChangeType::Created), created));
            built.push(((rt, ChangeType::Deleted), deleted));
            built.push(((rt, ChangeType::Modified), modified));
        }
        outcome.timings.diff = started.elapsed();

        // Bucket
        let started = Instant::now();
        for (bucket, results) in built {
            if results.iter().any(|r| !r.is_consistent()) {
                let name = bucket_key(bucket.0, bucket.1);
                tracing::warn!(bucket = %name, "Skipping bucket with inconsistent results");
                outcome.warn(CompareErrorKind::BucketFailed {
                    bucket: name,
                    reason: "results did not match their change type".to_string(),
                });
                continue;
            }
            if !results.is_empty() {
                outcome.results.insert(bucket, results);
            }
        }
        outcome.timings.bucket = started.elapsed();

        if outcome.cancelled {
            self.reset_to_pending(&key);
            outcome.status = ComparisonStatus::Pending;
            return Ok(outcome);
        }

        // Analyze
        if analyze {
            let started = Instant::now();
            let platform = self.platform(first, second);
            analyze_results(&self.analyzer, &mut outcome.results, platform);
            outcome.timings.analyze = started.elapsed();
        }

        // Persist
        let started = Instant::now();
        let mut persist_failures = Vec::new();
        for ((rt, ct), results) in &outcome.results {
            if let Err(e) = self.store.persist_results(&key, results) {
                let name = bucket_key(*rt, *ct);
                tracing::warn!(bucket = %name, error = %e, "Failed to persist results");
                persist_failures.push(CompareErrorKind::BucketFailed {
                    bucket: name,
                    reason: format!("persisting failed: {e}"),
                });
            }
        }
        for failure in persist_failures {
            outcome.warn(failure);
        }
        outcome.timings.persist = started.elapsed();

        let nothing_reconciled = reconciled_types == 0 && failed_types > 0;
        if nothing_reconciled {
            outcome.warn(CompareErrorKind::NothingReconciled);
            self.store
                .set_comparison_status(&key, ComparisonStatus::Pending)?;
            outcome.status = ComparisonStatus::Pending;
        } else {
            self.store
                .set_comparison_status(&key, ComparisonStatus::Completed)?;
            outcome.status = ComparisonStatus::Completed;
        }

        tracing::info!(
            comparison = %key,
            results = outcome.total(),
            warnings = outcome.warnings.len(),
            total_ms = outcome.timings.total().as_millis(),
            "Comparison finished"
        );
        Ok(outcome)
    }

    /// Best-effort status reset on paths that already report another outcome.
    fn reset_to_pending(&self, key: &ComparisonKey) {
        if let Err(e) = self
            .store
            .set_comparison_status(key, ComparisonStatus::Pending)
        {
            tracing::warn!(comparison = %key, error = %e, "Failed to reset comparison status");
        }
    }

    /// Platform rules are filtered on: the compare run's, else the base run's.
    fn platform(&self, first: Option<&str>, second: Option<&str>) -> Platform {
        second
            .or(first)
            .and_then(|run| match self.store.run_platform(run) {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(run, error = %e, "Could not read run platform");
                    None
                }
            })
            .unwrap_or_default()
    }
}

/// Group results into non-empty `(ResultType, ChangeType)` buckets.
#[must_use]
pub fn bucket_results(results: Vec<CompareResult>) -> ResultBuckets {
    let mut buckets = ResultBuckets::new();
    for result in results {
        buckets
            .entry((result.result_type, result.change_type))
            .or_default()
            .push(result);
    }
    buckets
}

/// Analyze every result in parallel, in place.
pub fn analyze_results(analyzer: &Analyzer, buckets: &mut ResultBuckets, platform: Platform) {
    let results: Vec<&mut CompareResult> = buckets.values_mut().flatten().collect();
    results.into_par_iter().for_each(|result| {
        let verdict = analyzer.analyze(result, platform);
        result.analysis = Some(verdict.severity);
        result.rules = verdict.matched;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Observation, ObservationData, OpenPortObject, Run};
    use crate::storage::MemoryStore;

    fn port(run: &str, number: u16, process: &str) -> Observation {
        Observation::new(
            run,
            ObservationData::Port(OpenPortObject {
                address: "0.0.0.0".to_string(),
                port: number,
                protocol: "TCP".to_string(),
                process_name: Some(process.to_string()),
                ..Default::default()
            }),
        )
    }

    fn store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_run(
                Run::new("a"),
                vec![port("a", 22, "sshd"), port("a", 80, "nginx")],
            )
            .unwrap();
        store
            .insert_run(
                Run::new("b"),
                vec![port("b", 22, "dropbear"), port("b", 443, "nginx")],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_both_runs_absent_is_invalid() {
        let engine = CompareEngine::new(store());
        assert!(matches!(
            engine.compare_runs(None, None, false),
            Err(SurfaceDiffError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_buckets_by_change_type() {
        let engine = CompareEngine::new(store());
        let outcome = engine.compare_runs(Some("a"), Some("b"), false).unwrap();
        assert_eq!(outcome.status, ComparisonStatus::Completed);
        assert_eq!(outcome.count(ResultType::Port, ChangeType::Created), 1);
        assert_eq!(outcome.count(ResultType::Port, ChangeType::Deleted), 1);
        assert_eq!(outcome.count(ResultType::Port, ChangeType::Modified), 1);
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_completed_comparison_is_reused_unless_forced() {
        let store = store();
        let engine = CompareEngine::new(store.clone());
        engine.compare_runs(Some("a"), Some("b"), false).unwrap();

        let again = engine.compare_runs(Some("a"), Some("b"), false).unwrap();
        assert!(again.from_store);
        assert_eq!(again.total(), 3);

        let forced = CompareEngine::new(store)
            .force(true)
            .compare_runs(Some("a"), Some("b"), false)
            .unwrap();
        assert!(!forced.from_store);
        assert_eq!(forced.total(), 3);
    }

    #[test]
    fn test_cancelled_comparison_stays_pending() {
        let store = store();
        let flag = Arc::new(AtomicBool::new(true));
        let engine = CompareEngine::new(store.clone()).with_cancel_flag(flag);
        let outcome = engine.compare_runs(Some("a"), Some("b"), false).unwrap();
        assert!(outcome.cancelled);
        assert!(outcome.is_empty());
        assert_eq!(outcome.status, ComparisonStatus::Pending);

        let key = ComparisonKey::new(Some("a"), Some("b"));
        assert_eq!(store.comparison_status(&key).unwrap(), ComparisonStatus::Pending);
    }

    /// Delegates to a memory store, failing selected writes.
    struct FailingStore {
        inner: MemoryStore,
        fail_persist: bool,
        fail_pending: bool,
    }

    impl FailingStore {
        fn new(fail_persist: bool, fail_pending: bool) -> Self {
            let inner = MemoryStore::new();
            inner
                .insert_run(Run::new("a"), vec![port("a", 22, "sshd")])
                .unwrap();
            inner
                .insert_run(Run::new("b"), vec![port("b", 443, "nginx")])
                .unwrap();
            Self {
                inner,
                fail_persist,
                fail_pending,
            }
        }
    }

    impl ObservationStore for FailingStore {
        fn run_exists(&self, run_id: &str) -> Result<bool> {
            self.inner.run_exists(run_id)
        }
        fn run(&self, run_id: &str) -> Result<Run> {
            self.inner.run(run_id)
        }
        fn list_runs(&self) -> Result<Vec<Run>> {
            self.inner.list_runs()
        }
        fn result_types(&self, run_id: &str) -> Result<Vec<ResultType>> {
            self.inner.result_types(run_id)
        }
        fn identities_and_hashes(
            &self,
            run_id: &str,
            result_type: ResultType,
        ) -> Result<Vec<(String, String)>> {
            self.inner.identities_and_hashes(run_id, result_type)
        }
        fn observations_by_identity(
            &self,
            run_id: &str,
            result_type: ResultType,
            identities: &[String],
        ) -> Result<Vec<Observation>> {
            self.inner
                .observations_by_identity(run_id, result_type, identities)
        }
        fn insert_run(&self, run: Run, observations: Vec<Observation>) -> Result<()> {
            self.inner.insert_run(run, observations)
        }
        fn delete_run(&self, run_id: &str) -> Result<bool> {
            self.inner.delete_run(run_id)
        }
        fn persist_results(&self, key: &ComparisonKey, results: &[CompareResult]) -> Result<()> {
            if self.fail_persist {
                return Err(SurfaceDiffError::storage(
                    "persisting results",
                    crate::error::StorageErrorKind::QueryFailed("disk full".to_string()),
                ));
            }
            self.inner.persist_results(key, results)
        }
        fn clear_results(&self, key: &ComparisonKey) -> Result<()> {
            self.inner.clear_results(key)
        }
        fn comparison_status(&self, key: &ComparisonKey) -> Result<ComparisonStatus> {
            self.inner.comparison_status(key)
        }
        fn set_comparison_status(&self, key: &ComparisonKey, status: ComparisonStatus) -> Result<()> {
            if self.fail_pending && status == ComparisonStatus::Pending {
                return Err(SurfaceDiffError::lock_poisoned("updating comparison status"));
            }
            self.inner.set_comparison_status(key, status)
        }
        fn compared_results(&self, key: &ComparisonKey) -> Result<Vec<CompareResult>> {
            self.inner.compared_results(key)
        }
    }

    #[test]
    fn test_persist_failures_become_warnings() {
        let engine = CompareEngine::new(Arc::new(FailingStore::new(true, false)));
        let outcome = engine.compare_runs(Some("a"), Some("b"), false).unwrap();
        assert_eq!(outcome.total(), 2);
        assert_eq!(outcome.warnings.len(), 2);
        assert!(outcome.warnings.iter().all(|w| w.contains("persisting failed")));
        assert!(outcome.warnings.iter().any(|w| w.contains("PORT_CREATED")));
        assert_eq!(outcome.status, ComparisonStatus::Completed);
    }

    #[test]
    fn test_failed_status_reset_keeps_original_outcome() {
        let engine = CompareEngine::new(Arc::new(FailingStore::new(false, true)));
        let err = engine
            .compare_runs(Some("a"), Some("missing"), false)
            .unwrap_err();
        assert!(err.is_run_not_found());

        let cancelled = CompareEngine::new(Arc::new(FailingStore::new(false, true)))
            .with_cancel_flag(Arc::new(AtomicBool::new(true)))
            .compare_runs(Some("a"), Some("b"), false)
            .unwrap();
        assert!(cancelled.cancelled);
        assert_eq!(cancelled.status, ComparisonStatus::Pending);
    }

    #[test]
    fn test_bucket_results_groups_by_pair() {
        let results = vec![
            CompareResult::created(None, port("b", 1, "x")),
            CompareResult::created(None, port("b", 2, "y")),
            CompareResult::deleted(port("a", 3, "z"), None),
        ];
        let buckets = bucket_results(results);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[&(ResultType::Port, ChangeType::Created)].len(), 2);
    }
}
