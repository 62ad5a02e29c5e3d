//! Rule document model.
//!
//! Rule documents are JSON:
//!
//! ```json
//! {
//!   "rules": [
//!     {
//!       "name": "Telnet listener",
//!       "resultType": "PORT",
//!       "changeTypes": ["CREATED"],
//!       "flag": "Critical",
//!       "clauses": [{ "field": "Port", "operation": "EQ", "data": ["23"] }]
//!     }
//!   ],
//!   "meta": { "defaultLevels": { "PORT": "Information" } }
//! }
//! ```

use crate::diff::ChangeType;
use crate::model::{Platform, ResultType, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Comparison performed by a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Eq,
    Neq,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
    Gt,
    Lt,
    WasModified,
    IsNull,
    IsTrue,
    /// Any operation this build does not understand; never matches
    #[serde(other)]
    Unknown,
}

impl Operation {
    /// Whether the clause data must hold an integer bound.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Gt | Self::Lt)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Contains => "CONTAINS",
            Self::NotContains => "NOT_CONTAINS",
            Self::StartsWith => "STARTS_WITH",
            Self::EndsWith => "ENDS_WITH",
            Self::Regex => "REGEX",
            Self::Gt => "GT",
            Self::Lt => "LT",
            Self::WasModified => "WAS_MODIFIED",
            Self::IsNull => "IS_NULL",
            Self::IsTrue => "IS_TRUE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// One condition of a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Field name as exposed by the observation kind
    pub field: String,
    pub operation: Operation,
    /// Comparison data; any datum may match
    #[serde(default)]
    pub data: Vec<String>,
}

impl Clause {
    pub fn new(field: impl Into<String>, operation: Operation, data: &[&str]) -> Self {
        Self {
            field: field.into(),
            operation,
            data: data.iter().map(|d| (*d).to_string()).collect(),
        }
    }
}

/// A declarative rule assigning a severity to matching results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub result_type: ResultType,
    /// `None` applies to every change type
    #[serde(default)]
    pub change_types: Option<Vec<ChangeType>>,
    /// `None` applies to every platform
    #[serde(default)]
    pub platforms: Option<Vec<Platform>>,
    /// All clauses must hold; an empty list always holds
    #[serde(default)]
    pub clauses: Vec<Clause>,
    pub flag: Severity,
}

impl Rule {
    pub fn new(name: impl Into<String>, result_type: ResultType, flag: Severity) -> Self {
        Self {
            name: name.into(),
            description: None,
            result_type,
            change_types: None,
            platforms: None,
            clauses: Vec::new(),
            flag,
        }
    }

    #[must_use]
    pub fn with_clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    #[must_use]
    pub fn with_change_types(mut self, change_types: Vec<ChangeType>) -> Self {
        self.change_types = Some(change_types);
        self
    }

    #[must_use]
    pub fn with_platforms(mut self, platforms: Vec<Platform>) -> Self {
        self.platforms = Some(platforms);
        self
    }

    /// Whether the rule's filters admit a result of this shape.
    #[must_use]
    pub fn applies_to(
        &self,
        result_type: ResultType,
        change_type: ChangeType,
        platform: Platform,
    ) -> bool {
        self.result_type == result_type
            && self
                .change_types
                .as_ref()
                .is_none_or(|cts| cts.contains(&change_type))
            && self
                .platforms
                .as_ref()
                .is_none_or(|ps| ps.contains(&platform))
    }
}

/// Document-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleMeta {
    /// Severity used when no rule matches, per result type
    #[serde(default)]
    pub default_levels: BTreeMap<ResultType, Severity>,
}

/// A complete rule document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDocument {
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub meta: RuleMeta,
}

impl RuleDocument {
    #[must_use]
    pub fn default_level(&self, result_type: ResultType) -> Severity {
        self.meta
            .default_levels
            .get(&result_type)
            .copied()
            .unwrap_or(Severity::Information)
    }
}
