//! Loading rule documents.

use super::evaluator::RuleSet;
use super::rules::RuleDocument;
use crate::error::{Result, RuleErrorKind, SurfaceDiffError};
use std::path::Path;

/// Rule document compiled into the binary.
pub const EMBEDDED_RULES: &str = include_str!("default_rules.json");

/// Parse a rule document from JSON text.
pub fn parse_rule_document(content: &str) -> Result<RuleDocument> {
    serde_json::from_str(content).map_err(|e| {
        SurfaceDiffError::rules(
            "parsing rule document",
            RuleErrorKind::Malformed(e.to_string()),
        )
    })
}

/// Read and parse a rule document file.
pub fn read_rule_document(path: &Path) -> Result<RuleDocument> {
    let content = std::fs::read_to_string(path).map_err(|e| SurfaceDiffError::io(path, e))?;
    parse_rule_document(&content)
}

/// Parse and compile a rule document, failing on any problem.
pub fn load_rule_set_strict(content: &str) -> Result<RuleSet> {
    RuleSet::new(parse_rule_document(content)?)
}

/// The compiled embedded rule set.
pub fn embedded_rule_set() -> Result<RuleSet> {
    load_rule_set_strict(EMBEDDED_RULES)
}

/// Default levels from the embedded document, with no rules.
#[must_use]
pub fn defaults_only() -> RuleSet {
    let meta = parse_rule_document(EMBEDDED_RULES)
        .map(|doc| doc.meta)
        .unwrap_or_default();
    RuleSet::defaults_only(meta)
}

/// Load the rule set for a comparison.
///
/// Without a path the embedded rules are used. A missing or malformed file
/// never fails the caller: a warning is logged and the result carries only
/// the built-in default levels.
#[must_use]
pub fn load_rule_set(path: Option<&Path>) -> RuleSet {
    let loaded = match path {
        Some(p) => read_rule_document(p).and_then(RuleSet::new),
        None => embedded_rule_set(),
    };
    match loaded {
        Ok(rules) => {
            tracing::debug!(rules = rules.len(), "Loaded analysis rules");
            rules
        }
        Err(e) => {
            tracing::warn!(
                "Rule configuration rejected, analyzing with default levels only: {e}"
            );
            defaults_only()
        }
    }
}
