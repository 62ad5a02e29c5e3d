//! Compare and export command handlers.

use super::fail_threshold;
use crate::config::AppConfig;
use crate::diff::ComparisonOutcome;
use crate::pipeline::{
    build_report_config, exit_code_for, open_store, output_report, run_comparison, write_output,
    OutputTarget,
};
use crate::storage::{DirectoryStore, ObservationStore, RunSnapshot};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Compare two stored runs, returning the desired exit code.
///
/// The caller is responsible for calling `std::process::exit()` with the
/// returned code when it is non-zero.
pub fn run_compare(config: &AppConfig, first: &str, second: &str) -> Result<i32> {
    let fail_on = fail_threshold(config)?;
    let store = open_store(&config.storage)?;
    let outcome = run_comparison(store.clone(), config, Some(first), Some(second))?;
    report(config, store, &outcome, second)?;
    Ok(exit_code_for(&outcome, fail_on))
}

/// Export a single run.
///
/// By default this is a comparison against nothing, so every observation is
/// reported as created. With `snapshot` the stored run is written back out
/// as a snapshot document instead.
pub fn run_export(config: &AppConfig, run_id: &str, snapshot: bool) -> Result<i32> {
    let store = open_store(&config.storage)?;

    if snapshot {
        let document = RunSnapshot::from_store(store.as_ref(), run_id)
            .with_context(|| format!("exporting run {run_id}"))?
            .to_json(config.output.pretty)?;
        let target = OutputTarget::from_option(config.output.file.clone());
        write_output(&document, &target, config.behavior.quiet)?;
        return Ok(crate::pipeline::exit_codes::SUCCESS);
    }

    let fail_on = fail_threshold(config)?;
    let outcome = run_comparison(store.clone(), config, None, Some(run_id))?;
    report(config, store, &outcome, run_id)?;
    Ok(exit_code_for(&outcome, fail_on))
}

fn report(
    config: &AppConfig,
    store: Arc<DirectoryStore>,
    outcome: &ComparisonOutcome,
    compare_run: &str,
) -> Result<()> {
    let os_version = store
        .run(compare_run)
        .ok()
        .and_then(|run| run.os_version);
    let report_config = build_report_config(config, outcome, os_version);
    output_report(config, outcome, &report_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{exit_codes, import_snapshots};
    use crate::reports::ReportFormat;
    use tempfile::TempDir;

    const MONDAY: &str = r#"{
        "Run": {"RunId": "monday", "Timestamp": "2024-05-06T10:00:00Z", "Platform": "LINUX"},
        "Observations": [
            {"ResultType": "PORT", "Address": "0.0.0.0", "Port": 22, "Protocol": "TCP"}
        ]
    }"#;

    const TUESDAY: &str = r#"{
        "Run": {"RunId": "tuesday", "Timestamp": "2024-05-07T10:00:00Z", "Platform": "LINUX",
                "OsVersion": "6.8.0"},
        "Observations": [
            {"ResultType": "PORT", "Address": "0.0.0.0", "Port": 22, "Protocol": "TCP"},
            {"ResultType": "PORT", "Address": "0.0.0.0", "Port": 23, "Protocol": "TCP",
             "ProcessName": "telnetd"}
        ]
    }"#;

    fn setup(tmp: &TempDir, format: ReportFormat) -> AppConfig {
        let config = AppConfig::builder()
            .storage_directory(Some(tmp.path().join("store")))
            .output_format(format)
            .output_file(Some(tmp.path().join("report.out")))
            .quiet(true)
            .build();
        let store = open_store(&config.storage).unwrap();
        let mut paths = Vec::new();
        for (name, content) in [("monday", MONDAY), ("tuesday", TUESDAY)] {
            let path = tmp.path().join(format!("{name}.json"));
            std::fs::write(&path, content).unwrap();
            paths.push(path);
        }
        import_snapshots(store.as_ref(), &paths, true).unwrap();
        config
    }

    #[test]
    fn test_compare_writes_report() {
        let tmp = TempDir::new().unwrap();
        let config = setup(&tmp, ReportFormat::Json);
        let code = run_compare(&config, "monday", "tuesday").unwrap();
        assert_eq!(code, exit_codes::SUCCESS);

        let report = std::fs::read_to_string(tmp.path().join("report.out")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(json["metadata"]["os-version"], "6.8.0");
        assert_eq!(json["results"]["PORT_CREATED"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_compare_fail_on_threshold() {
        let tmp = TempDir::new().unwrap();
        let mut config = setup(&tmp, ReportFormat::Summary);
        config.behavior.fail_on_severity = Some("verbose".to_string());
        assert_eq!(
            run_compare(&config, "monday", "tuesday").unwrap(),
            exit_codes::SEVERITY_THRESHOLD
        );
    }

    #[test]
    fn test_compare_bad_threshold_is_error() {
        let tmp = TempDir::new().unwrap();
        let mut config = setup(&tmp, ReportFormat::Summary);
        config.behavior.fail_on_severity = Some("loud".to_string());
        assert!(run_compare(&config, "monday", "tuesday").is_err());
    }

    #[test]
    fn test_export_reports_everything_created() {
        let tmp = TempDir::new().unwrap();
        let config = setup(&tmp, ReportFormat::Ndjson);
        run_export(&config, "tuesday", false).unwrap();
        let report = std::fs::read_to_string(tmp.path().join("report.out")).unwrap();
        let created = report
            .lines()
            .filter(|l| l.contains("\"bucket\":\"PORT_CREATED\""))
            .count();
        assert_eq!(created, 2);
    }

    #[test]
    fn test_export_snapshot() {
        let tmp = TempDir::new().unwrap();
        let config = setup(&tmp, ReportFormat::Json);
        run_export(&config, "monday", true).unwrap();
        let exported = std::fs::read_to_string(tmp.path().join("report.out")).unwrap();
        let snapshot = RunSnapshot::from_json(&exported).unwrap();
        assert_eq!(snapshot.run.run_id, "monday");
        assert_eq!(snapshot.observations.len(), 1);
    }
}
