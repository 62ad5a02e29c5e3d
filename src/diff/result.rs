//! Comparison result types.

use crate::error::CompareErrorKind;
use crate::model::{FieldValue, Observation, ResultType, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How an entity changed between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum ChangeType {
    Created,
    Deleted,
    Modified,
    Renamed,
    Invalid,
}

impl ChangeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Deleted => "DELETED",
            Self::Modified => "MODIFIED",
            Self::Renamed => "RENAMED",
            Self::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" | "added" => Ok(Self::Created),
            "deleted" | "removed" => Ok(Self::Deleted),
            "modified" => Ok(Self::Modified),
            "renamed" => Ok(Self::Renamed),
            "invalid" => Ok(Self::Invalid),
            _ => Err(format!("unknown change type: {s}")),
        }
    }
}

impl TryFrom<String> for ChangeType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One field's change between base and compare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Diff {
    /// Field name; empty when a whole observation is carried
    pub field: String,
    pub added: Option<FieldValue>,
    pub removed: Option<FieldValue>,
}

impl Diff {
    pub fn new(
        field: impl Into<String>,
        added: Option<FieldValue>,
        removed: Option<FieldValue>,
    ) -> Self {
        Self {
            field: field.into(),
            added,
            removed,
        }
    }

    /// The same change seen from the other direction.
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            field: self.field.clone(),
            added: self.removed.clone(),
            removed: self.added.clone(),
        }
    }
}

/// Output unit of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompareResult {
    pub base_run_id: Option<String>,
    pub compare_run_id: Option<String>,
    pub result_type: ResultType,
    pub change_type: ChangeType,
    pub base: Option<Observation>,
    pub compare: Option<Observation>,
    pub diffs: Vec<Diff>,
    pub analysis: Option<Severity>,
    #[serde(default)]
    pub rules: Vec<String>,
}

impl CompareResult {
    /// An entity present only in the compare run.
    #[must_use]
    pub fn created(base_run_id: Option<&str>, compare: Observation) -> Self {
        Self {
            base_run_id: base_run_id.map(str::to_string),
            compare_run_id: Some(compare.run_id.clone()),
            result_type: compare.result_type(),
            change_type: ChangeType::Created,
            base: None,
            compare: Some(compare),
            diffs: Vec::new(),
            analysis: None,
            rules: Vec::new(),
        }
    }

    /// An entity present only in the base run.
    #[must_use]
    pub fn deleted(base: Observation, compare_run_id: Option<&str>) -> Self {
        Self {
            base_run_id: Some(base.run_id.clone()),
            compare_run_id: compare_run_id.map(str::to_string),
            result_type: base.result_type(),
            change_type: ChangeType::Deleted,
            base: Some(base),
            compare: None,
            diffs: Vec::new(),
            analysis: None,
            rules: Vec::new(),
        }
    }

    /// An entity present in both runs with different content.
    #[must_use]
    pub fn modified(base: Observation, compare: Observation, diffs: Vec<Diff>) -> Self {
        Self {
            base_run_id: Some(base.run_id.clone()),
            compare_run_id: Some(compare.run_id.clone()),
            result_type: compare.result_type(),
            change_type: ChangeType::Modified,
            base: Some(base),
            compare: Some(compare),
            diffs,
            analysis: None,
            rules: Vec::new(),
        }
    }

    /// Identity of the entity this result is about.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.compare
            .as_ref()
            .or(self.base.as_ref())
            .map_or("", |o| o.identity.as_str())
    }

    /// Whether the populated sides agree with the change type.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        match self.change_type {
            ChangeType::Created => self.base.is_none() && self.compare.is_some(),
            ChangeType::Deleted => self.base.is_some() && self.compare.is_none(),
            ChangeType::Modified | ChangeType::Renamed => {
                self.base.is_some() && self.compare.is_some()
            }
            ChangeType::Invalid => true,
        }
    }
}

/// Results keyed by `(ResultType, ChangeType)`; empty buckets are never stored.
pub type ResultBuckets = BTreeMap<(ResultType, ChangeType), Vec<CompareResult>>;

/// Report key for a bucket, e.g. `PORT_CREATED`.
#[must_use]
pub fn bucket_key(result_type: ResultType, change_type: ChangeType) -> String {
    format!("{result_type}_{change_type}")
}

/// Persisted state of a comparison between two runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComparisonStatus {
    #[default]
    Pending,
    Running,
    Completed,
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Wall-clock time spent in each comparison stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimings {
    pub reconcile: Duration,
    pub diff: Duration,
    pub bucket: Duration,
    pub analyze: Duration,
    pub persist: Duration,
}

impl StageTimings {
    #[must_use]
    pub fn total(&self) -> Duration {
        self.reconcile + self.diff + self.bucket + self.analyze + self.persist
    }
}

/// Everything a comparison produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub first_run: Option<String>,
    pub second_run: Option<String>,
    #[serde(with = "bucket_serde")]
    pub results: ResultBuckets,
    /// Sub-failures that skipped part of the work
    pub warnings: Vec<String>,
    pub timings: StageTimings,
    pub status: ComparisonStatus,
    /// Stopped between buckets on request
    pub cancelled: bool,
    /// Served from a previously completed comparison
    pub from_store: bool,
}

impl ComparisonOutcome {
    /// Total number of results across all buckets.
    #[must_use]
    pub fn total(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    #[must_use]
    pub fn count(&self, result_type: ResultType, change_type: ChangeType) -> usize {
        self.results
            .get(&(result_type, change_type))
            .map_or(0, Vec::len)
    }

    /// Count of results per change type.
    #[must_use]
    pub fn change_counts(&self) -> BTreeMap<ChangeType, usize> {
        let mut counts = BTreeMap::new();
        for ((_, ct), results) in &self.results {
            *counts.entry(*ct).or_insert(0) += results.len();
        }
        counts
    }

    /// Count of analyzed results per severity.
    #[must_use]
    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for severity in self.iter_results().filter_map(|r| r.analysis) {
            *counts.entry(severity).or_insert(0) += 1;
        }
        counts
    }

    /// Highest analysis verdict among all results.
    #[must_use]
    pub fn max_severity(&self) -> Option<Severity> {
        self.iter_results().filter_map(|r| r.analysis).max()
    }

    pub fn iter_results(&self) -> impl Iterator<Item = &CompareResult> {
        self.results.values().flatten()
    }

    /// Record a sub-failure that did not abort the comparison.
    pub fn warn(&mut self, kind: CompareErrorKind) {
        self.warnings.push(kind.to_string());
    }
}

/// Buckets serialize as a map keyed `<ResultType>_<ChangeType>`.
mod bucket_serde {
    use super::{bucket_key, ChangeType, CompareResult, ResultBuckets, ResultType};
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(buckets: &ResultBuckets, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(buckets.len()))?;
        for ((rt, ct), results) in buckets {
            map.serialize_entry(&bucket_key(*rt, *ct), results)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ResultBuckets, D::Error> {
        let raw: BTreeMap<String, Vec<CompareResult>> = BTreeMap::deserialize(d)?;
        let mut buckets = ResultBuckets::new();
        for (key, results) in raw {
            let (rt, ct) = key
                .rsplit_once('_')
                .ok_or_else(|| D::Error::custom(format!("bad bucket key: {key}")))?;
            let rt: ResultType = rt.parse().map_err(D::Error::custom)?;
            let ct: ChangeType = ct.parse().map_err(D::Error::custom)?;
            if !results.is_empty() {
                buckets.insert((rt, ct), results);
            }
        }
        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObservationData, ServiceObject};

    fn service(run: &str, state: &str) -> Observation {
        Observation::new(
            run,
            ObservationData::Service(ServiceObject {
                name: "sshd".to_string(),
                state: Some(state.to_string()),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn test_constructors_are_consistent() {
        let created = CompareResult::created(Some("r1"), service("r2", "running"));
        assert!(created.is_consistent());
        assert_eq!(created.base_run_id.as_deref(), Some("r1"));
        assert_eq!(created.result_type, ResultType::Service);

        let deleted = CompareResult::deleted(service("r1", "running"), Some("r2"));
        assert!(deleted.is_consistent());
        assert_eq!(deleted.identity(), "sshd");

        let modified =
            CompareResult::modified(service("r1", "running"), service("r2", "stopped"), vec![]);
        assert!(modified.is_consistent());
    }

    #[test]
    fn test_change_type_parse() {
        assert_eq!("Created".parse::<ChangeType>(), Ok(ChangeType::Created));
        assert_eq!("REMOVED".parse::<ChangeType>(), Ok(ChangeType::Deleted));
        let ct: ChangeType = serde_json::from_str("\"modified\"").unwrap();
        assert_eq!(ct, ChangeType::Modified);
        assert_eq!(serde_json::to_string(&ct).unwrap(), "\"MODIFIED\"");
    }

    #[test]
    fn test_outcome_serializes_bucket_keys() {
        let mut outcome = ComparisonOutcome::default();
        outcome.results.insert(
            (ResultType::Service, ChangeType::Created),
            vec![CompareResult::created(Some("r1"), service("r2", "running"))],
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json["results"]["SERVICE_CREATED"].is_array());

        let back: ComparisonOutcome = serde_json::from_value(json).unwrap();
        assert_eq!(back.count(ResultType::Service, ChangeType::Created), 1);
    }

    #[test]
    fn test_mirrored_diff_swaps_sides() {
        let diff = Diff::new("State", Some(FieldValue::Text("a".into())), None);
        let m = diff.mirrored();
        assert_eq!(m.removed, Some(FieldValue::Text("a".into())));
        assert!(m.added.is_none());
    }
}
