//! Import command handler.

use crate::config::AppConfig;
use crate::pipeline::{import_snapshots, open_store};
use anyhow::Result;
use std::path::PathBuf;

/// Import run snapshot files into the configured store.
pub fn run_import(config: &AppConfig, paths: &[PathBuf]) -> Result<()> {
    let store = open_store(&config.storage)?;
    let imported = import_snapshots(store.as_ref(), paths, config.behavior.quiet)?;
    if !config.behavior.quiet {
        let total: usize = imported.iter().map(|(_, n)| n).sum();
        eprintln!(
            "Imported {} run(s), {total} observations, into {}",
            imported.len(),
            store.root().display()
        );
    }
    Ok(())
}
