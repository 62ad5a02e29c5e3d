use super::traits::ObservationStore;
use crate::error::{ErrorContext, Result, SurfaceDiffError};
use crate::model::{Observation, ObservationData, Run};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Portable document holding one run and its observations.
///
/// Identity and row key are not part of the document; they are derived
/// again whenever a snapshot is imported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RunSnapshot {
    pub run: Run,
    #[serde(default)]
    pub observations: Vec<ObservationData>,
}

impl RunSnapshot {
    pub fn new(run: Run, observations: Vec<ObservationData>) -> Self {
        Self { run, observations }
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(content).context("parsing run snapshot")?;
        if snapshot.run.run_id.trim().is_empty() {
            return Err(SurfaceDiffError::validation("run snapshot has an empty RunId"));
        }
        Ok(snapshot)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SurfaceDiffError::io(path, e))?;
        Self::from_json(&content).with_context(|| format!("loading {}", path.display()))
    }

    /// Read a stored run back into a snapshot.
    pub fn from_store(store: &dyn ObservationStore, run_id: &str) -> Result<Self> {
        let run = store.run(run_id)?;
        let mut observations = Vec::new();
        for rt in store.result_types(run_id)? {
            let ids: Vec<String> = store
                .identities_and_hashes(run_id, rt)?
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            observations.extend(
                store
                    .observations_by_identity(run_id, rt, &ids)?
                    .into_iter()
                    .map(|o| o.data),
            );
        }
        Ok(Self { run, observations })
    }

    /// Wrap every payload in an envelope owned by this run.
    #[must_use]
    pub fn into_parts(self) -> (Run, Vec<Observation>) {
        let run_id = self.run.run_id.clone();
        let observations = self
            .observations
            .into_iter()
            .map(|data| Observation::new(run_id.clone(), data))
            .collect();
        (self.run, observations)
    }

    /// Insert this snapshot into a store.
    pub fn import_into(self, store: &dyn ObservationStore) -> Result<(String, usize)> {
        let (run, observations) = self.into_parts();
        let run_id = run.run_id.clone();
        let count = observations.len();
        store
            .insert_run(run, observations)
            .with_context(|| format!("importing run {run_id}"))?;
        tracing::info!(run = %run_id, observations = count, "Imported run");
        Ok((run_id, count))
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}
