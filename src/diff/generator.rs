//! Field-level diff generation for matched observation pairs.
//!
//! Collection fields are compared as sets and report what was added and
//! removed; scalars use direct equality; anything structured falls back to
//! an order-insensitive deep comparison. Each field yields at most one
//! [`Diff`].

use super::result::Diff;
use crate::model::{unordered_eq, FieldValue, Observation, ObservationData};
use indexmap::IndexSet;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Diff two observation payloads.
///
/// When one side is absent the result is a single diff with an empty field
/// name carrying the present side whole.
#[must_use]
pub fn generate_diffs(before: Option<&ObservationData>, after: Option<&ObservationData>) -> Vec<Diff> {
    let (before, after) = match (before, after) {
        (None, None) => return Vec::new(),
        (Some(b), None) => {
            return vec![Diff::new("", None, Some(whole(b)))];
        }
        (None, Some(a)) => {
            return vec![Diff::new("", Some(whole(a)), None)];
        }
        (Some(b), Some(a)) => (b, a),
    };

    let before_fields = before.fields();
    let after_fields = after.fields();
    let skip: Vec<&str> = before
        .skip_compare()
        .iter()
        .chain(after.skip_compare())
        .copied()
        .collect();

    let mut diffs = Vec::new();

    for (name, value) in &before_fields {
        if skip.contains(name) {
            continue;
        }
        match after_fields.iter().find(|(n, _)| n == name) {
            Some((_, other)) => {
                if let Some(diff) = compare_field(name, value.as_ref(), other.as_ref()) {
                    diffs.push(diff);
                }
            }
            // Member only exists on the before shape
            None => {
                if let Some(v) = value {
                    diffs.push(Diff::new(*name, None, Some(v.clone())));
                }
            }
        }
    }

    for (name, value) in &after_fields {
        if skip.contains(name) || before_fields.iter().any(|(n, _)| n == name) {
            continue;
        }
        if let Some(v) = value {
            diffs.push(Diff::new(*name, Some(v.clone()), None));
        }
    }

    diffs
}

/// Diff a matched pair of observations.
#[must_use]
pub fn diff_observations(before: &Observation, after: &Observation) -> Vec<Diff> {
    generate_diffs(Some(&before.data), Some(&after.data))
}

/// Diff many pairs in parallel, preserving input order.
#[must_use]
pub fn diff_pairs(pairs: &[(Observation, Observation)]) -> Vec<Vec<Diff>> {
    pairs
        .par_iter()
        .map(|(before, after)| diff_observations(before, after))
        .collect()
}

fn whole(data: &ObservationData) -> FieldValue {
    FieldValue::Structured(serde_json::to_value(data).unwrap_or(serde_json::Value::Null))
}

/// Compare one shared field.
pub(crate) fn compare_field(
    name: &str,
    before: Option<&FieldValue>,
    after: Option<&FieldValue>,
) -> Option<Diff> {
    let (before, after) = match (before, after) {
        (None, None) => return None,
        (Some(b), None) => return Some(Diff::new(name, None, Some(b.clone()))),
        (None, Some(a)) => return Some(Diff::new(name, Some(a.clone()), None)),
        (Some(b), Some(a)) => (b, a),
    };

    let (added, removed) = match (before, after) {
        (FieldValue::StringList(b), FieldValue::StringList(a)) => {
            let (added, removed) = list_difference(b, a);
            (
                non_empty(added, FieldValue::StringList),
                non_empty(removed, FieldValue::StringList),
            )
        }
        (FieldValue::StringMap(b), FieldValue::StringMap(a)) => (
            non_empty(map_difference(a, b), FieldValue::StringMap),
            non_empty(map_difference(b, a), FieldValue::StringMap),
        ),
        (FieldValue::StringListMap(b), FieldValue::StringListMap(a)) => {
            let (added, removed) = list_map_difference(b, a);
            (
                non_empty(added, FieldValue::StringListMap),
                non_empty(removed, FieldValue::StringListMap),
            )
        }
        (FieldValue::BinaryMap(b), FieldValue::BinaryMap(a)) => (
            non_empty(map_difference(a, b), FieldValue::BinaryMap),
            non_empty(map_difference(b, a), FieldValue::BinaryMap),
        ),
        (FieldValue::Structured(b), FieldValue::Structured(a)) => {
            if unordered_eq(b, a) {
                return None;
            }
            (Some(after.clone()), Some(before.clone()))
        }
        (b, a) if b.is_scalar() && a.is_scalar() && std::mem::discriminant(b) == std::mem::discriminant(a) => {
            if b == a {
                return None;
            }
            (Some(after.clone()), Some(before.clone()))
        }
        (b, a) => {
            tracing::debug!(
                field = name,
                before = b.kind_name(),
                after = a.kind_name(),
                "Field kind changed between runs, comparing structurally"
            );
            if unordered_eq(&b.to_json(), &a.to_json()) {
                return None;
            }
            (Some(after.clone()), Some(before.clone()))
        }
    };

    if added.is_none() && removed.is_none() {
        None
    } else {
        Some(Diff::new(name, added, removed))
    }
}

fn non_empty<T, F>(value: T, wrap: F) -> Option<FieldValue>
where
    T: IsEmpty,
    F: FnOnce(T) -> FieldValue,
{
    if value.is_empty() { None } else { Some(wrap(value)) }
}

trait IsEmpty {
    fn is_empty(&self) -> bool;
}

impl<T> IsEmpty for Vec<T> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

impl<K, V> IsEmpty for BTreeMap<K, V> {
    fn is_empty(&self) -> bool {
        BTreeMap::is_empty(self)
    }
}

/// `(after \ before, before \ after)` with set semantics, first-seen order.
fn list_difference(before: &[String], after: &[String]) -> (Vec<String>, Vec<String>) {
    let b: IndexSet<&String> = before.iter().collect();
    let a: IndexSet<&String> = after.iter().collect();
    let added = a.difference(&b).map(|s| (*s).clone()).collect();
    let removed = b.difference(&a).map(|s| (*s).clone()).collect();
    (added, removed)
}

/// Entries of `left` that `right` lacks or holds with a different value.
fn map_difference<V: Clone + PartialEq>(
    left: &BTreeMap<String, V>,
    right: &BTreeMap<String, V>,
) -> BTreeMap<String, V> {
    left.iter()
        .filter(|(k, v)| right.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

type ListMap = BTreeMap<String, Vec<String>>;

fn list_map_difference(before: &ListMap, after: &ListMap) -> (ListMap, ListMap) {
    let empty = Vec::new();
    let mut added = ListMap::new();
    let mut removed = ListMap::new();
    for key in before.keys().chain(after.keys()) {
        if added.contains_key(key) || removed.contains_key(key) {
            continue;
        }
        let b = before.get(key).unwrap_or(&empty);
        let a = after.get(key).unwrap_or(&empty);
        let (plus, minus) = list_difference(b, a);
        if !plus.is_empty() {
            added.insert(key.clone(), plus);
        }
        if !minus.is_empty() {
            removed.insert(key.clone(), minus);
        }
    }
    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FileSystemObject, OpenPortObject, RegistryObject};

    fn port(process: &str) -> ObservationData {
        ObservationData::Port(OpenPortObject {
            address: "0.0.0.0".to_string(),
            port: 443,
            protocol: "TCP".to_string(),
            process_name: Some(process.to_string()),
            ..Default::default()
        })
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_single_scalar_change() {
        let diffs = generate_diffs(Some(&port("nginx")), Some(&port("httpd")));
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "ProcessName");
        assert_eq!(diffs[0].added, Some(FieldValue::Text("httpd".into())));
        assert_eq!(diffs[0].removed, Some(FieldValue::Text("nginx".into())));
    }

    #[test]
    fn test_identical_pair_has_no_diffs() {
        assert!(generate_diffs(Some(&port("nginx")), Some(&port("nginx"))).is_empty());
    }

    #[test]
    fn test_absent_side_carries_whole_observation() {
        let diffs = generate_diffs(None, Some(&port("nginx")));
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].field, "");
        assert!(diffs[0].removed.is_none());
        match &diffs[0].added {
            Some(FieldValue::Structured(v)) => assert_eq!(v["Port"], 443),
            other => panic!("unexpected {other:?}"),
        }
        assert!(generate_diffs(None, None).is_empty());
    }

    #[test]
    fn test_null_to_value_is_one_sided() {
        let diff = compare_field("Owner", None, Some(&FieldValue::Text("root".into()))).unwrap();
        assert_eq!(diff.added, Some(FieldValue::Text("root".into())));
        assert!(diff.removed.is_none());
    }

    #[test]
    fn test_list_set_difference() {
        let before = FieldValue::StringList(strings(&["a", "b", "c"]));
        let after = FieldValue::StringList(strings(&["c", "d", "a"]));
        let diff = compare_field("Groups", Some(&before), Some(&after)).unwrap();
        assert_eq!(diff.added, Some(FieldValue::StringList(strings(&["d"]))));
        assert_eq!(diff.removed, Some(FieldValue::StringList(strings(&["b"]))));
    }

    #[test]
    fn test_reordered_list_is_not_a_change() {
        let before = FieldValue::StringList(strings(&["a", "b"]));
        let after = FieldValue::StringList(strings(&["b", "a"]));
        assert!(compare_field("Groups", Some(&before), Some(&after)).is_none());
    }

    #[test]
    fn test_map_value_change_reports_both_sides() {
        let mut before = RegistryObject {
            key: "HKLM\\Run".to_string(),
            view: "64".to_string(),
            ..Default::default()
        };
        before.values.insert("Updater".into(), "a.exe".into());
        before.values.insert("Keep".into(), "k.exe".into());
        let mut after = before.clone();
        after.values.insert("Updater".into(), "evil.exe".into());
        after.subkeys.push("ignored".into());

        let diffs = generate_diffs(
            Some(&ObservationData::Registry(before)),
            Some(&ObservationData::Registry(after)),
        );
        assert_eq!(diffs.len(), 1, "subkeys are skipped: {diffs:?}");
        let mut added = BTreeMap::new();
        added.insert("Updater".to_string(), "evil.exe".to_string());
        let mut removed = BTreeMap::new();
        removed.insert("Updater".to_string(), "a.exe".to_string());
        assert_eq!(diffs[0].added, Some(FieldValue::StringMap(added)));
        assert_eq!(diffs[0].removed, Some(FieldValue::StringMap(removed)));
    }

    #[test]
    fn test_list_map_per_key_difference() {
        let mut before = ListMap::new();
        before.insert("alice".into(), strings(&["read"]));
        before.insert("bob".into(), strings(&["read", "write"]));
        let mut after = ListMap::new();
        after.insert("alice".into(), strings(&["read", "write"]));
        after.insert("bob".into(), strings(&["read", "write"]));

        let diff = compare_field(
            "Permissions",
            Some(&FieldValue::StringListMap(before)),
            Some(&FieldValue::StringListMap(after)),
        )
        .unwrap();
        let mut expected = ListMap::new();
        expected.insert("alice".into(), strings(&["write"]));
        assert_eq!(diff.added, Some(FieldValue::StringListMap(expected)));
        assert!(diff.removed.is_none());
    }

    #[test]
    fn test_skip_compare_field_ignored() {
        let before = FileSystemObject {
            path: "/etc/shadow".into(),
            last_accessed: Some("yesterday".into()),
            ..Default::default()
        };
        let after = FileSystemObject {
            last_accessed: Some("today".into()),
            ..before.clone()
        };
        let diffs = generate_diffs(
            Some(&ObservationData::File(before)),
            Some(&ObservationData::File(after)),
        );
        assert!(diffs.is_empty());
    }

    #[test]
    fn test_shape_mismatch_emits_one_sided_diffs() {
        let file = ObservationData::File(FileSystemObject {
            path: "/x".into(),
            ..Default::default()
        });
        let diffs = generate_diffs(Some(&file), Some(&port("nginx")));
        assert!(diffs.iter().any(|d| d.field == "Path" && d.added.is_none()));
        assert!(diffs.iter().any(|d| d.field == "Address" && d.removed.is_none()));
        let names: Vec<_> = diffs.iter().map(|d| d.field.as_str()).collect();
        let mut unique = names.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(names.len(), unique.len());
    }

    #[test]
    fn test_structured_ignores_order() {
        let before = FieldValue::Structured(serde_json::json!({"curves": ["p256", "p384"]}));
        let after = FieldValue::Structured(serde_json::json!({"curves": ["p384", "p256"]}));
        assert!(compare_field("Parameters", Some(&before), Some(&after)).is_none());
    }

    #[test]
    fn test_kind_change_falls_back() {
        let before = FieldValue::Int(1);
        let after = FieldValue::Text("1".into());
        let diff = compare_field("Size", Some(&before), Some(&after)).unwrap();
        assert_eq!(diff.removed, Some(before));
        assert_eq!(diff.added, Some(after));
    }
}
