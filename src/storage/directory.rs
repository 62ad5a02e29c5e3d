use super::memory::MemoryStore;
use super::snapshot::RunSnapshot;
use super::traits::{ComparisonKey, ObservationStore};
use crate::diff::{CompareResult, ComparisonStatus};
use crate::error::{ErrorContext, Result, StorageErrorKind, SurfaceDiffError};
use crate::model::{Observation, ResultType, Run};
use crate::utils::content_hash;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const RUNS_DIR: &str = "runs";
const COMPARISONS_DIR: &str = "comparisons";

#[derive(Debug, Serialize, Deserialize)]
struct StoredComparison {
    key: ComparisonKey,
    status: ComparisonStatus,
    results: Vec<CompareResult>,
}

/// Observation store persisted as JSON files under a directory.
///
/// Layout:
///
/// ```text
/// <root>/runs/<run>-<hash>.json          run snapshots
/// <root>/comparisons/<key>-<hash>.json   comparison status and results
/// ```
///
/// Everything is loaded into a [`MemoryStore`] on open; writes go to the
/// cache first and are then flushed to disk. Persisted results are buffered
/// in the cache and written with the comparison's next status change or
/// clear, so each comparison file is rewritten a fixed number of times.
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    cache: MemoryStore,
}

/// File-system safe name: a readable `label` plus a hash of `unique`, which
/// must differ for every distinct entry.
fn file_name(label: &str, unique: &str) -> String {
    let sanitized: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(64)
        .collect();
    format!("{sanitized}-{:016x}.json", content_hash(unique.as_bytes()))
}

/// Unambiguous rendering of a key; its `Display` form can collide.
fn comparison_id(key: &ComparisonKey) -> String {
    format!("{:?}/{:?}", key.first, key.second)
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| SurfaceDiffError::io(dir, e))? {
        let path = entry.map_err(|e| SurfaceDiffError::io(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).map_err(|e| SurfaceDiffError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| SurfaceDiffError::io(path, e))
}

fn remove_file(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SurfaceDiffError::io(path, e)),
    }
}

impl DirectoryStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for sub in [RUNS_DIR, COMPARISONS_DIR] {
            let dir = root.join(sub);
            std::fs::create_dir_all(&dir).map_err(|e| SurfaceDiffError::io(&dir, e))?;
        }

        let cache = MemoryStore::new();
        for path in json_files(&root.join(RUNS_DIR))? {
            let snapshot = RunSnapshot::from_path(&path)?;
            let (run, observations) = snapshot.into_parts();
            cache.insert_run(run, observations)?;
        }
        for path in json_files(&root.join(COMPARISONS_DIR))? {
            let content =
                std::fs::read_to_string(&path).map_err(|e| SurfaceDiffError::io(&path, e))?;
            let stored: StoredComparison = serde_json::from_str(&content)
                .with_context(|| format!("loading comparison {}", path.display()))?;
            cache.restore_comparison(stored.key, stored.status, stored.results)?;
        }

        tracing::debug!(root = %root.display(), "Opened directory store");
        Ok(Self { root, cache })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_path(&self, run_id: &str) -> PathBuf {
        self.root.join(RUNS_DIR).join(file_name(run_id, run_id))
    }

    fn comparison_path(&self, key: &ComparisonKey) -> PathBuf {
        self.root
            .join(COMPARISONS_DIR)
            .join(file_name(&key.to_string(), &comparison_id(key)))
    }

    fn flush_comparison(&self, key: &ComparisonKey) -> Result<()> {
        let stored = StoredComparison {
            key: key.clone(),
            status: self.cache.comparison_status(key)?,
            results: self.cache.compared_results(key)?,
        };
        let content = serde_json::to_string(&stored).map_err(|e| {
            SurfaceDiffError::storage("writing comparison", StorageErrorKind::QueryFailed(e.to_string()))
        })?;
        write_file(&self.comparison_path(key), &content)
    }
}

impl ObservationStore for DirectoryStore {
    fn run_exists(&self, run_id: &str) -> Result<bool> {
        self.cache.run_exists(run_id)
    }

    fn run(&self, run_id: &str) -> Result<Run> {
        self.cache.run(run_id)
    }

    fn list_runs(&self) -> Result<Vec<Run>> {
        self.cache.list_runs()
    }

    fn result_types(&self, run_id: &str) -> Result<Vec<ResultType>> {
        self.cache.result_types(run_id)
    }

    fn identities_and_hashes(
        &self,
        run_id: &str,
        result_type: ResultType,
    ) -> Result<Vec<(String, String)>> {
        self.cache.identities_and_hashes(run_id, result_type)
    }

    fn observations_by_identity(
        &self,
        run_id: &str,
        result_type: ResultType,
        identities: &[String],
    ) -> Result<Vec<Observation>> {
        self.cache
            .observations_by_identity(run_id, result_type, identities)
    }

    fn insert_run(&self, run: Run, observations: Vec<Observation>) -> Result<()> {
        let run_id = run.run_id.clone();
        let snapshot = RunSnapshot::new(
            run.clone(),
            observations.iter().map(|o| o.data.clone()).collect(),
        );
        self.cache.insert_run(run, observations)?;
        let content = snapshot.to_json(false)?;
        if let Err(e) = write_file(&self.run_path(&run_id), &content) {
            // Keep cache and disk in agreement
            if let Err(rollback) = self.cache.delete_run(&run_id) {
                tracing::warn!(run = %run_id, error = %rollback, "Failed to roll back cached run");
            }
            return Err(e);
        }
        Ok(())
    }

    fn delete_run(&self, run_id: &str) -> Result<bool> {
        let referencing: Vec<ComparisonKey> = self
            .cache
            .comparisons()?
            .into_iter()
            .map(|(k, _)| k)
            .filter(|k| k.references(run_id))
            .collect();
        let existed = self.cache.delete_run(run_id)?;
        remove_file(&self.run_path(run_id))?;
        for key in referencing {
            remove_file(&self.comparison_path(&key))?;
        }
        Ok(existed)
    }

    fn persist_results(&self, key: &ComparisonKey, results: &[CompareResult]) -> Result<()> {
        self.cache.persist_results(key, results)
    }

    fn clear_results(&self, key: &ComparisonKey) -> Result<()> {
        self.cache.clear_results(key)?;
        self.flush_comparison(key)
    }

    fn comparison_status(&self, key: &ComparisonKey) -> Result<ComparisonStatus> {
        self.cache.comparison_status(key)
    }

    fn set_comparison_status(&self, key: &ComparisonKey, status: ComparisonStatus) -> Result<()> {
        self.cache.set_comparison_status(key, status)?;
        self.flush_comparison(key)
    }

    fn compared_results(&self, key: &ComparisonKey) -> Result<Vec<CompareResult>> {
        self.cache.compared_results(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObservationData, ServiceObject};

    fn service(run: &str, name: &str) -> Observation {
        Observation::new(
            run,
            ObservationData::Service(ServiceObject {
                name: name.to_string(),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_file_name_is_safe_and_unique() {
        let a = file_name("2024/05/01 10:00", "2024/05/01 10:00");
        let b = file_name("2024_05_01_10_00", "2024_05_01_10_00");
        assert!(!a.contains('/'));
        assert_ne!(a, b);
        assert!(a.ends_with(".json"));
    }

    #[test]
    fn test_reopen_restores_runs_and_comparisons() {
        let dir = tempfile::tempdir().unwrap();
        let key = ComparisonKey::new(Some("r1"), None);
        {
            let store = DirectoryStore::open(dir.path()).unwrap();
            store
                .insert_run(Run::new("r1"), vec![service("r1", "sshd")])
                .unwrap();
            store
                .set_comparison_status(&key, ComparisonStatus::Completed)
                .unwrap();
        }
        let store = DirectoryStore::open(dir.path()).unwrap();
        assert!(store.run_exists("r1").unwrap());
        assert_eq!(store.identities_and_hashes("r1", ResultType::Service).unwrap().len(), 1);
        assert_eq!(store.comparison_status(&key).unwrap(), ComparisonStatus::Completed);
    }

    #[test]
    fn test_delete_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        store.insert_run(Run::new("r1"), vec![]).unwrap();
        let key = ComparisonKey::new(Some("r1"), None);
        store.set_comparison_status(&key, ComparisonStatus::Running).unwrap();

        assert!(store.delete_run("r1").unwrap());
        assert!(json_files(&dir.path().join(RUNS_DIR)).unwrap().is_empty());
        assert!(json_files(&dir.path().join(COMPARISONS_DIR)).unwrap().is_empty());
    }

    #[test]
    fn test_keys_with_same_display_get_own_files() {
        let dir = tempfile::tempdir().unwrap();
        let joined_first = ComparisonKey::new(Some("a__b"), Some("c"));
        let joined_second = ComparisonKey::new(Some("a"), Some("b__c"));
        let dash = ComparisonKey::new(Some("-"), Some("x"));
        let absent = ComparisonKey::new(None, Some("x"));
        assert_eq!(joined_first.to_string(), joined_second.to_string());
        assert_eq!(dash.to_string(), absent.to_string());
        {
            let store = DirectoryStore::open(dir.path()).unwrap();
            store
                .set_comparison_status(&joined_first, ComparisonStatus::Completed)
                .unwrap();
            store
                .set_comparison_status(&joined_second, ComparisonStatus::Running)
                .unwrap();
            store
                .set_comparison_status(&dash, ComparisonStatus::Completed)
                .unwrap();
            store
                .set_comparison_status(&absent, ComparisonStatus::Running)
                .unwrap();
        }
        assert_eq!(json_files(&dir.path().join(COMPARISONS_DIR)).unwrap().len(), 4);

        let store = DirectoryStore::open(dir.path()).unwrap();
        assert_eq!(store.comparison_status(&joined_first).unwrap(), ComparisonStatus::Completed);
        assert_eq!(store.comparison_status(&joined_second).unwrap(), ComparisonStatus::Running);
        assert_eq!(store.comparison_status(&dash).unwrap(), ComparisonStatus::Completed);

        // deleting a run named "a" leaves the a__b comparison alone
        store.delete_run("a").unwrap();
        let store = DirectoryStore::open(dir.path()).unwrap();
        assert_eq!(store.comparison_status(&joined_first).unwrap(), ComparisonStatus::Completed);
        assert_eq!(store.comparison_status(&joined_second).unwrap(), ComparisonStatus::Pending);
    }

    #[test]
    fn test_buffered_results_written_with_status() {
        let dir = tempfile::tempdir().unwrap();
        let key = ComparisonKey::new(Some("r1"), Some("r2"));
        {
            let store = DirectoryStore::open(dir.path()).unwrap();
            store
                .set_comparison_status(&key, ComparisonStatus::Running)
                .unwrap();
            store
                .persist_results(&key, &[CompareResult::created(Some("r1"), service("r2", "sshd"))])
                .unwrap();
            store
                .persist_results(&key, &[CompareResult::deleted(service("r1", "cron"), Some("r2"))])
                .unwrap();
            store
                .set_comparison_status(&key, ComparisonStatus::Completed)
                .unwrap();
        }
        let store = DirectoryStore::open(dir.path()).unwrap();
        assert_eq!(store.comparison_status(&key).unwrap(), ComparisonStatus::Completed);
        assert_eq!(store.compared_results(&key).unwrap().len(), 2);
    }
}
