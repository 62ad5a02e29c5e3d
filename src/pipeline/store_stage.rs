//! Store loading stage.

use super::PipelineError;
use crate::config::StorageConfig;
use crate::storage::{DirectoryStore, ObservationStore, RunSnapshot};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

/// Open the configured directory store.
pub fn open_store(config: &StorageConfig) -> Result<Arc<DirectoryStore>> {
    let root = config.resolved_directory();
    let store = DirectoryStore::open(root.clone()).map_err(|e| PipelineError::LoadFailed {
        path: root.display().to_string(),
        source: e.into(),
    })?;
    Ok(Arc::new(store))
}

/// Import run snapshot files, in order, stopping at the first failure.
///
/// Returns the imported run ids with their observation counts.
pub fn import_snapshots(
    store: &dyn ObservationStore,
    paths: &[PathBuf],
    quiet: bool,
) -> Result<Vec<(String, usize)>> {
    let mut imported = Vec::with_capacity(paths.len());
    for path in paths {
        let snapshot = RunSnapshot::from_path(path)
            .and_then(|snapshot| snapshot.import_into(store))
            .map_err(|e| PipelineError::LoadFailed {
                path: path.display().to_string(),
                source: e.into(),
            })
            .with_context(|| format!("importing {}", path.display()))?;
        if !quiet {
            tracing::info!(
                "Imported {} ({} observations) from {}",
                snapshot.0,
                snapshot.1,
                path.display()
            );
        }
        imported.push(snapshot);
    }
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SNAPSHOT: &str = r#"{
        "Run": {"RunId": "monday", "Timestamp": "2024-05-01T10:00:00Z", "Platform": "LINUX"},
        "Observations": [
            {"ResultType": "PORT", "Address": "0.0.0.0", "Port": 22, "Protocol": "TCP"}
        ]
    }"#;

    #[test]
    fn test_open_and_import() {
        let tmp = TempDir::new().unwrap();
        let config = StorageConfig {
            directory: Some(tmp.path().join("store")),
        };
        let snapshot = tmp.path().join("monday.json");
        std::fs::write(&snapshot, SNAPSHOT).unwrap();

        let store = open_store(&config).unwrap();
        let imported = import_snapshots(store.as_ref(), &[snapshot.clone()], true).unwrap();
        assert_eq!(imported, vec![("monday".to_string(), 1)]);

        let reopened = open_store(&config).unwrap();
        assert!(reopened.run_exists("monday").unwrap());

        // importing the same run twice is rejected
        assert!(import_snapshots(reopened.as_ref(), &[snapshot], true).is_err());
    }

    #[test]
    fn test_import_missing_file() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&StorageConfig {
            directory: Some(tmp.path().to_path_buf()),
        })
        .unwrap();
        let err = import_snapshots(store.as_ref(), &[tmp.path().join("nope.json")], true)
            .unwrap_err();
        assert!(format!("{err:#}").contains("nope.json"));
    }
}
