//! Rule-based severity analysis of comparison results.
//!
//! Rules select results by result type, change type and platform, then test
//! field values with clause operations. Clauses of a rule are AND-ed; the
//! data values of a clause are OR-ed. When several rules match, the most
//! severe flag wins; when none apply, the per-type default level is used.
//!
//! # Example
//!
//! ```ignore
//! use surface_diff::analyzer::{load_rule_set, Analyzer};
//! use std::sync::Arc;
//!
//! let analyzer = Analyzer::new(Arc::new(load_rule_set(None)));
//! let verdict = analyzer.analyze(&result, Platform::Linux);
//! println!("{} ({:?})", verdict.severity, verdict.matched);
//! ```

mod config;
mod evaluator;
mod rules;

pub use config::{
    defaults_only, embedded_rule_set, load_rule_set, load_rule_set_strict, parse_rule_document,
    read_rule_document, EMBEDDED_RULES,
};
pub use evaluator::{Analyzer, RuleOutcome, RuleSet, RuleSetHandle, Verdict};
pub use rules::{Clause, Operation, Rule, RuleDocument, RuleMeta};
