use super::traits::{ComparisonKey, ObservationStore};
use crate::diff::{CompareResult, ComparisonStatus};
use crate::error::{Result, StorageErrorKind, SurfaceDiffError};
use crate::model::{Observation, ResultType, Run};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type TypeIndex = BTreeMap<ResultType, IndexMap<String, Observation>>;

#[derive(Debug, Default)]
struct Comparison {
    status: ComparisonStatus,
    results: Vec<CompareResult>,
}

/// In-memory observation store.
///
/// Observations are indexed per run by `(ResultType, identity)`. All state
/// sits behind `RwLock`s; readers never block each other.
#[derive(Debug, Default)]
pub struct MemoryStore {
    runs: RwLock<IndexMap<String, Run>>,
    observations: RwLock<HashMap<String, TypeIndex>>,
    comparisons: RwLock<BTreeMap<ComparisonKey, Comparison>>,
}

fn read<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|_| SurfaceDiffError::lock_poisoned(what.to_string()))
}

fn write<'a, T>(lock: &'a RwLock<T>, what: &str) -> Result<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| SurfaceDiffError::lock_poisoned(what.to_string()))
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of observations held for a run.
    pub fn observation_count(&self, run_id: &str) -> Result<usize> {
        let observations = read(&self.observations, "reading observations")?;
        Ok(observations
            .get(run_id)
            .map_or(0, |types| types.values().map(IndexMap::len).sum()))
    }

    /// Every observation of a run, grouped by type in type order.
    pub fn observations(&self, run_id: &str) -> Result<Vec<Observation>> {
        let observations = read(&self.observations, "reading observations")?;
        Ok(observations
            .get(run_id)
            .map(|types| types.values().flat_map(|m| m.values().cloned()).collect())
            .unwrap_or_default())
    }

    /// All comparison keys with their status.
    pub fn comparisons(&self) -> Result<Vec<(ComparisonKey, ComparisonStatus)>> {
        let comparisons = read(&self.comparisons, "reading comparisons")?;
        Ok(comparisons
            .iter()
            .map(|(k, c)| (k.clone(), c.status))
            .collect())
    }

    /// Replace a comparison wholesale, used when loading from disk.
    pub(crate) fn restore_comparison(
        &self,
        key: ComparisonKey,
        status: ComparisonStatus,
        results: Vec<CompareResult>,
    ) -> Result<()> {
        let mut comparisons = write(&self.comparisons, "restoring comparison")?;
        comparisons.insert(key, Comparison { status, results });
        Ok(())
    }
}

impl ObservationStore for MemoryStore {
    fn run_exists(&self, run_id: &str) -> Result<bool> {
        Ok(read(&self.runs, "reading runs")?.contains_key(run_id))
    }

    fn run(&self, run_id: &str) -> Result<Run> {
        read(&self.runs, "reading runs")?
            .get(run_id)
            .cloned()
            .ok_or_else(|| SurfaceDiffError::run_not_found(run_id))
    }

    fn list_runs(&self) -> Result<Vec<Run>> {
        let mut runs: Vec<Run> = read(&self.runs, "reading runs")?.values().cloned().collect();
        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.run_id.cmp(&b.run_id)));
        Ok(runs)
    }

    fn result_types(&self, run_id: &str) -> Result<Vec<ResultType>> {
        let observations = read(&self.observations, "reading observations")?;
        Ok(observations
            .get(run_id)
            .map(|types| {
                types
                    .iter()
                    .filter(|(_, m)| !m.is_empty())
                    .map(|(rt, _)| *rt)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn identities_and_hashes(
        &self,
        run_id: &str,
        result_type: ResultType,
    ) -> Result<Vec<(String, String)>> {
        let observations = read(&self.observations, "reading observations")?;
        Ok(observations
            .get(run_id)
            .and_then(|types| types.get(&result_type))
            .map(|m| {
                m.iter()
                    .map(|(id, o)| (id.clone(), o.row_key.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn observations_by_identity(
        &self,
        run_id: &str,
        result_type: ResultType,
        identities: &[String],
    ) -> Result<Vec<Observation>> {
        let observations = read(&self.observations, "reading observations")?;
        let Some(index) = observations
            .get(run_id)
            .and_then(|types| types.get(&result_type))
        else {
            return Ok(Vec::new());
        };
        Ok(identities
            .iter()
            .filter_map(|id| index.get(id).cloned())
            .collect())
    }

    fn insert_run(&self, run: Run, observations: Vec<Observation>) -> Result<()> {
        let mut runs = write(&self.runs, "inserting run")?;
        if runs.contains_key(&run.run_id) {
            return Err(SurfaceDiffError::storage(
                "inserting run",
                StorageErrorKind::DuplicateRun(run.run_id),
            ));
        }

        let mut index = TypeIndex::new();
        let mut duplicates = 0usize;
        for obs in observations {
            let by_identity = index.entry(obs.result_type()).or_default();
            if by_identity.insert(obs.identity.clone(), obs).is_some() {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            tracing::debug!(
                run = %run.run_id,
                duplicates,
                "Duplicate identities replaced by later observations"
            );
        }

        write(&self.observations, "inserting observations")?.insert(run.run_id.clone(), index);
        runs.insert(run.run_id.clone(), run);
        Ok(())
    }

    fn delete_run(&self, run_id: &str) -> Result<bool> {
        let mut runs = write(&self.runs, "deleting run")?;
        let existed = runs.shift_remove(run_id).is_some();
        write(&self.observations, "deleting observations")?.remove(run_id);
        write(&self.comparisons, "deleting comparisons")?.retain(|key, _| !key.references(run_id));
        Ok(existed)
    }

    fn persist_results(&self, key: &ComparisonKey, results: &[CompareResult]) -> Result<()> {
        let mut comparisons = write(&self.comparisons, "persisting results")?;
        comparisons
            .entry(key.clone())
            .or_default()
            .results
            .extend_from_slice(results);
        Ok(())
    }

    fn clear_results(&self, key: &ComparisonKey) -> Result<()> {
        let mut comparisons = write(&self.comparisons, "clearing results")?;
        if let Some(c) = comparisons.get_mut(key) {
            c.results.clear();
        }
        Ok(())
    }

    fn comparison_status(&self, key: &ComparisonKey) -> Result<ComparisonStatus> {
        let comparisons = read(&self.comparisons, "reading comparisons")?;
        Ok(comparisons.get(key).map_or(ComparisonStatus::Pending, |c| c.status))
    }

    fn set_comparison_status(&self, key: &ComparisonKey, status: ComparisonStatus) -> Result<()> {
        let mut comparisons = write(&self.comparisons, "updating comparison status")?;
        comparisons.entry(key.clone()).or_default().status = status;
        Ok(())
    }

    fn compared_results(&self, key: &ComparisonKey) -> Result<Vec<CompareResult>> {
        let comparisons = read(&self.comparisons, "reading comparisons")?;
        Ok(comparisons
            .get(key)
            .map(|c| c.results.clone())
            .unwrap_or_default())
    }
}
