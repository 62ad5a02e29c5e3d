//! Run listing and deletion.

use crate::config::AppConfig;
use crate::pipeline::open_store;
use crate::storage::ObservationStore;
use anyhow::{bail, Result};

/// Print stored runs, oldest first.
pub fn run_list_runs(config: &AppConfig, json: bool) -> Result<()> {
    let store = open_store(&config.storage)?;
    let runs = store.list_runs()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        eprintln!("No runs in {}", store.root().display());
        return Ok(());
    }
    println!("{:<24} {:<26} {:<8} {:<8} TYPES", "RUN", "TIMESTAMP", "PLATFORM", "KIND");
    for run in &runs {
        let types = store.result_types(&run.run_id)?;
        let types: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
        println!(
            "{:<24} {:<26} {:<8} {:<8} {}",
            run.run_id,
            run.timestamp.to_rfc3339(),
            run.platform.to_string(),
            format!("{:?}", run.run_type).to_uppercase(),
            types.join(",")
        );
    }
    Ok(())
}

/// Delete a run with its observations and comparisons.
pub fn run_delete(config: &AppConfig, run_id: &str) -> Result<()> {
    let store = open_store(&config.storage)?;
    if !store.delete_run(run_id)? {
        bail!("run '{run_id}' not found");
    }
    if !config.behavior.quiet {
        eprintln!("Deleted run {run_id}");
    }
    Ok(())
}
