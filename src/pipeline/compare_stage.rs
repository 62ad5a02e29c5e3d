//! Comparison stage.
//!
//! Loads the analysis rules, builds the engine and runs one comparison on a
//! rayon pool sized from the config.

use super::PipelineError;
use crate::analyzer::{load_rule_set, Analyzer, RuleSet};
use crate::config::{AppConfig, RulesConfig};
use crate::diff::{CompareEngine, ComparisonOutcome};
use crate::storage::ObservationStore;
use anyhow::{Context, Result};
use std::sync::Arc;

/// Load the configured rule set, minus disabled rules.
///
/// A bad rules file degrades to default levels; see [`load_rule_set`].
#[must_use]
pub fn load_rules(config: &RulesConfig) -> RuleSet {
    let rules = load_rule_set(config.file.as_deref()).without(&config.disabled);
    tracing::debug!(
        rules = rules.len(),
        disabled = config.disabled.len(),
        "Analysis rules ready"
    );
    rules
}

/// Run one comparison with the configured options.
pub fn run_comparison(
    store: Arc<dyn ObservationStore>,
    config: &AppConfig,
    first: Option<&str>,
    second: Option<&str>,
) -> Result<ComparisonOutcome> {
    let quiet = config.behavior.quiet;
    let analyzer = if config.compare.analyze {
        Analyzer::new(Arc::new(load_rules(&config.rules)))
    } else {
        Analyzer::default()
    };

    if !quiet {
        tracing::info!(
            "Comparing {} → {}",
            first.unwrap_or("(none)"),
            second.unwrap_or("(none)")
        );
    }

    let engine = CompareEngine::new(store)
        .with_analyzer(analyzer)
        .force(config.compare.force);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.compare.parallel)
        .build()
        .context("Failed to build worker pool")?;

    let outcome = pool
        .install(|| engine.compare_runs(first, second, config.compare.analyze))
        .map_err(|e| PipelineError::CompareFailed { source: e.into() })?;

    if !quiet {
        for warning in &outcome.warnings {
            tracing::warn!("{warning}");
        }
    }
    Ok(outcome)
}
