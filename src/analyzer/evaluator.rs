//! Rule evaluation over comparison results.
//!
//! A [`RuleSet`] is an immutable, validated rule document with its regexes
//! and numeric bounds compiled up front. The [`Analyzer`] holds one behind
//! an `Arc`, so evaluation can run on any number of threads while a
//! [`RuleSetHandle`] swaps in a freshly loaded set for later comparisons.

use super::rules::{Clause, Operation, Rule, RuleDocument};
use crate::diff::{compare_field, ChangeType, CompareResult};
use crate::error::{Result, RuleErrorKind, SurfaceDiffError};
use crate::model::{FieldValue, Observation, Platform, ResultType, Severity};
use regex::Regex;
use std::sync::{Arc, RwLock};

/// Precompiled form of one clause's data.
#[derive(Debug, Clone)]
enum Matcher {
    Strings,
    Patterns(Vec<Regex>),
    Bound(i64),
}

/// A validated, immutable rule set.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    document: RuleDocument,
    /// `matchers[rule][clause]`
    matchers: Vec<Vec<Matcher>>,
}

impl RuleSet {
    /// Validate a document and compile its clauses.
    ///
    /// # Errors
    ///
    /// Fails on a regex that does not compile or a GT/LT clause without an
    /// integer datum.
    pub fn new(document: RuleDocument) -> Result<Self> {
        let matchers = document
            .rules
            .iter()
            .map(|rule| {
                rule.clauses
                    .iter()
                    .map(|clause| compile_clause(rule, clause))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { document, matchers })
    }

    /// A set with no rules, using the given default levels.
    #[must_use]
    pub fn defaults_only(meta: super::rules::RuleMeta) -> Self {
        Self {
            document: RuleDocument {
                rules: Vec::new(),
                meta,
            },
            matchers: Vec::new(),
        }
    }

    #[must_use]
    pub fn document(&self) -> &RuleDocument {
        &self.document
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.document.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.document.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.document.rules.is_empty()
    }

    #[must_use]
    pub fn default_level(&self, result_type: ResultType) -> Severity {
        self.document.default_level(result_type)
    }

    /// The same set minus the named rules.
    #[must_use]
    pub fn without(self, disabled: &[String]) -> Self {
        if disabled.is_empty() {
            return self;
        }
        let Self { document, matchers } = self;
        let (rules, matchers): (Vec<Rule>, Vec<Vec<Matcher>>) = document
            .rules
            .into_iter()
            .zip(matchers)
            .filter(|(rule, _)| !disabled.contains(&rule.name))
            .unzip();
        Self {
            document: RuleDocument {
                rules,
                meta: document.meta,
            },
            matchers,
        }
    }
}

fn compile_clause(rule: &Rule, clause: &Clause) -> Result<Matcher> {
    match clause.operation {
        Operation::Regex => clause
            .data
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    SurfaceDiffError::rules(
                        "compiling rule set",
                        RuleErrorKind::InvalidRegex {
                            rule: rule.name.clone(),
                            pattern: pattern.clone(),
                            reason: e.to_string(),
                        },
                    )
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Matcher::Patterns),
        op if op.is_numeric() => {
            let datum = clause.data.first().map_or("", String::as_str);
            datum.trim().parse::<i64>().map(Matcher::Bound).map_err(|_| {
                SurfaceDiffError::rules(
                    "compiling rule set",
                    RuleErrorKind::InvalidNumber {
                        rule: rule.name.clone(),
                        field: clause.field.clone(),
                        datum: datum.to_string(),
                    },
                )
            })
        }
        _ => Ok(Matcher::Strings),
    }
}

/// Severity verdict with the names of the rules that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub severity: Severity,
    /// Empty when the verdict is a default level
    pub matched: Vec<String>,
}

impl Verdict {
    const fn default_level(severity: Severity) -> Self {
        Self {
            severity,
            matched: Vec::new(),
        }
    }
}

/// Result of applying one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Matched(Severity),
    NotMatched,
    /// A clause names a field the observation kind does not have
    MissingField,
}

/// Evaluates comparison results against a rule set.
#[derive(Debug, Clone)]
pub struct Analyzer {
    rules: Arc<RuleSet>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(Arc::new(RuleSet::default()))
    }
}

impl Analyzer {
    #[must_use]
    pub const fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    #[must_use]
    pub fn rule_set(&self) -> &Arc<RuleSet> {
        &self.rules
    }

    /// Severity of one result on the given platform.
    #[must_use]
    pub fn analyze(&self, result: &CompareResult, platform: Platform) -> Verdict {
        let default = self.rules.default_level(result.result_type);
        let mut verdict: Option<Verdict> = None;
        let mut any_candidate = false;

        for (idx, rule) in self.rules.rules().iter().enumerate() {
            if !rule.applies_to(result.result_type, result.change_type, platform) {
                continue;
            }
            any_candidate = true;
            match self.apply_indexed(idx, rule, result) {
                RuleOutcome::Matched(severity) => {
                    let v = verdict.get_or_insert(Verdict {
                        severity,
                        matched: Vec::new(),
                    });
                    v.severity = v.severity.max(severity);
                    v.matched.push(rule.name.clone());
                }
                RuleOutcome::NotMatched => {}
                RuleOutcome::MissingField => {
                    tracing::debug!(
                        rule = %rule.name,
                        result_type = %result.result_type,
                        "Rule names a field this kind lacks, using default level"
                    );
                    return Verdict::default_level(default);
                }
            }
        }

        if !any_candidate {
            return Verdict::default_level(default);
        }
        verdict.unwrap_or_else(|| Verdict::default_level(default))
    }

    /// Apply a single rule of this set to a result.
    #[must_use]
    pub fn apply(&self, rule_name: &str, result: &CompareResult) -> Option<RuleOutcome> {
        self.rules
            .rules()
            .iter()
            .enumerate()
            .find(|(_, r)| r.name == rule_name)
            .map(|(idx, rule)| self.apply_indexed(idx, rule, result))
    }

    fn apply_indexed(&self, idx: usize, rule: &Rule, result: &CompareResult) -> RuleOutcome {
        let Some(matchers) = self.rules.matchers.get(idx) else {
            return RuleOutcome::NotMatched;
        };
        for (clause, matcher) in rule.clauses.iter().zip(matchers) {
            let Some(values) = extract(result, &clause.field) else {
                return RuleOutcome::MissingField;
            };
            if !clause_holds(clause, matcher, &values, &rule.name) {
                return RuleOutcome::NotMatched;
            }
        }
        RuleOutcome::Matched(rule.flag)
    }
}

/// Sides of a result a clause reads, by change type.
fn sides(result: &CompareResult) -> Vec<&Observation> {
    let compare = result.compare.as_ref();
    let base = result.base.as_ref();
    match result.change_type {
        ChangeType::Created => compare.into_iter().collect(),
        ChangeType::Deleted => base.into_iter().collect(),
        ChangeType::Modified | ChangeType::Renamed | ChangeType::Invalid => {
            base.into_iter().chain(compare).collect()
        }
    }
}

/// Extract a field from every relevant side; `None` if any side's shape
/// lacks the field.
fn extract(result: &CompareResult, field: &str) -> Option<Vec<Option<FieldValue>>> {
    sides(result)
        .into_iter()
        .map(|obs| obs.data.field(field))
        .collect()
}

fn clause_holds(
    clause: &Clause,
    matcher: &Matcher,
    values: &[Option<FieldValue>],
    rule_name: &str,
) -> bool {
    let strings = || {
        values
            .iter()
            .flatten()
            .flat_map(FieldValue::to_strings)
            .collect::<Vec<_>>()
    };
    let data = &clause.data;

    match (clause.operation, matcher) {
        (Operation::Eq, _) => strings().iter().any(|s| data.contains(s)),
        (Operation::Neq, _) => strings().iter().any(|s| data.iter().any(|d| s != d)),
        (Operation::Contains, _) => strings()
            .iter()
            .any(|s| data.iter().any(|d| s.contains(d.as_str()))),
        (Operation::NotContains, _) => !strings()
            .iter()
            .any(|s| data.iter().any(|d| s.contains(d.as_str()))),
        (Operation::StartsWith, _) => strings()
            .iter()
            .any(|s| data.iter().any(|d| s.starts_with(d.as_str()))),
        (Operation::EndsWith, _) => strings()
            .iter()
            .any(|s| data.iter().any(|d| s.ends_with(d.as_str()))),
        (Operation::Regex, Matcher::Patterns(patterns)) => strings()
            .iter()
            .any(|s| patterns.iter().any(|re| re.is_match(s))),
        (Operation::Gt, Matcher::Bound(bound)) => integers(&strings()).any(|v| v > *bound),
        (Operation::Lt, Matcher::Bound(bound)) => integers(&strings()).any(|v| v < *bound),
        (Operation::WasModified, _) => match values {
            [before, after] => compare_field(&clause.field, before.as_ref(), after.as_ref()).is_none(),
            _ => false,
        },
        (Operation::IsNull, _) => !values.is_empty() && values.iter().all(Option::is_none),
        (Operation::IsTrue, _) => values
            .iter()
            .flatten()
            .any(|v| v.as_bool() == Some(true)),
        (Operation::Unknown, _) => {
            tracing::debug!(rule = rule_name, field = %clause.field, "Unknown clause operation");
            false
        }
        (op, _) => {
            tracing::debug!(rule = rule_name, operation = %op, "Clause was not compiled for its operation");
            false
        }
    }
}

fn integers(values: &[String]) -> impl Iterator<Item = i64> + '_ {
    values.iter().filter_map(|s| s.trim().parse::<i64>().ok())
}

/// Shared, swappable reference to the current rule set.
///
/// Readers take a cheap `Arc` snapshot; reloading replaces the reference
/// and never mutates a set that evaluation may be using.
#[derive(Debug, Default)]
pub struct RuleSetHandle {
    current: RwLock<Arc<RuleSet>>,
}

impl RuleSetHandle {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(rules)),
        }
    }

    /// Snapshot of the current rule set.
    #[must_use]
    pub fn current(&self) -> Arc<RuleSet> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Install a new rule set, returning the previous one.
    pub fn swap(&self, rules: RuleSet) -> Arc<RuleSet> {
        let next = Arc::new(rules);
        match self.current.write() {
            Ok(mut guard) => std::mem::replace(&mut *guard, next),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), next),
        }
    }

    /// Analyzer bound to the current snapshot.
    #[must_use]
    pub fn analyzer(&self) -> Analyzer {
        Analyzer::new(self.current())
    }
}
