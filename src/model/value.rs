//! Field values exposed by observations.
//!
//! Every observation kind lists its data members as `(name, FieldValue)`
//! pairs. The diff generator and rule evaluator both work over this closed
//! set, so there is no runtime type inspection anywhere in the comparison
//! path.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single field value of an observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Kind", content = "Value")]
pub enum FieldValue {
    /// Plain string
    Text(String),
    /// Signed integer (ports, sizes, ids)
    Int(i64),
    /// Boolean flag
    Bool(bool),
    /// Ordered string list, diffed as a set
    StringList(Vec<String>),
    /// String-keyed string map, diffed by entry
    StringMap(BTreeMap<String, String>),
    /// String-keyed list map (e.g. principal -> granted rights)
    StringListMap(BTreeMap<String, Vec<String>>),
    /// Keyed binary blobs (e.g. TPM PCR banks), diffed by entry
    BinaryMap(BTreeMap<String, Vec<u8>>),
    /// Anything else; compared with order-insensitive deep equality
    Structured(serde_json::Value),
}

impl FieldValue {
    /// Short name of the variant, used in logs.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Int(_) => "int",
            Self::Bool(_) => "bool",
            Self::StringList(_) => "string-list",
            Self::StringMap(_) => "string-map",
            Self::StringListMap(_) => "string-list-map",
            Self::BinaryMap(_) => "binary-map",
            Self::Structured(_) => "structured",
        }
    }

    /// Whether this is one of the scalar variants.
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(self, Self::Text(_) | Self::Int(_) | Self::Bool(_))
    }

    /// Whether this is one of the collection variants with set semantics.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(
            self,
            Self::StringList(_) | Self::StringMap(_) | Self::StringListMap(_) | Self::BinaryMap(_)
        )
    }

    /// Whether a collection value holds no elements.
    #[must_use]
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Self::StringList(v) => v.is_empty(),
            Self::StringMap(m) => m.is_empty(),
            Self::StringListMap(m) => m.is_empty(),
            Self::BinaryMap(m) => m.is_empty(),
            _ => false,
        }
    }

    /// Flatten the value into strings for rule clause comparison.
    ///
    /// Maps contribute both their keys and their values.
    #[must_use]
    pub fn to_strings(&self) -> Vec<String> {
        match self {
            Self::Text(s) => vec![s.clone()],
            Self::Int(i) => vec![i.to_string()],
            Self::Bool(b) => vec![b.to_string()],
            Self::StringList(v) => v.clone(),
            Self::StringMap(m) => m
                .iter()
                .flat_map(|(k, v)| [k.clone(), v.clone()])
                .collect(),
            Self::StringListMap(m) => m
                .iter()
                .flat_map(|(k, v)| std::iter::once(k.clone()).chain(v.iter().cloned()))
                .collect(),
            Self::BinaryMap(m) => m.keys().cloned().collect(),
            Self::Structured(v) => vec![v.to_string()],
        }
    }

    /// Interpret the value as a boolean, if it is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Render the value as JSON for structured comparison and reports.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::StringList(v) => serde_json::Value::from(v.clone()),
            Self::StringMap(m) => serde_json::Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                    .collect(),
            ),
            Self::StringListMap(m) => serde_json::Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v.clone())))
                    .collect(),
            ),
            Self::BinaryMap(m) => serde_json::Value::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::String(hex_string(v))))
                    .collect(),
            ),
            Self::Structured(v) => v.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::StringList(v) => write!(f, "[{}]", v.join(", ")),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Deep equality that ignores the order of array elements.
///
/// Arrays are compared as multisets; objects key by key.
#[must_use]
pub fn unordered_eq(a: &serde_json::Value, b: &serde_json::Value) -> bool {
    use serde_json::Value;
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            if xs.len() != ys.len() {
                return false;
            }
            let mut used = vec![false; ys.len()];
            xs.iter().all(|x| {
                ys.iter().enumerate().any(|(i, y)| {
                    if !used[i] && unordered_eq(x, y) {
                        used[i] = true;
                        true
                    } else {
                        false
                    }
                })
            })
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(k, xv)| ym.get(k).is_some_and(|yv| unordered_eq(xv, yv)))
        }
        _ => a == b,
    }
}

/// Conversion of plain Rust field types into [`FieldValue`].
///
/// Returning `None` means the field is null on this observation.
pub trait ToFieldValue {
    fn to_field_value(&self) -> Option<FieldValue>;
}

impl ToFieldValue for String {
    fn to_field_value(&self) -> Option<FieldValue> {
        Some(FieldValue::Text(self.clone()))
    }
}

impl ToFieldValue for bool {
    fn to_field_value(&self) -> Option<FieldValue> {
        Some(FieldValue::Bool(*self))
    }
}

macro_rules! int_field_value {
    ($($t:ty),*) => {
        $(
            impl ToFieldValue for $t {
                fn to_field_value(&self) -> Option<FieldValue> {
                    i64::try_from(*self).ok().map(FieldValue::Int)
                }
            }
        )*
    };
}

int_field_value!(i32, i64, u16, u32, u64);

impl ToFieldValue for Vec<String> {
    fn to_field_value(&self) -> Option<FieldValue> {
        Some(FieldValue::StringList(self.clone()))
    }
}

impl ToFieldValue for BTreeSet<String> {
    fn to_field_value(&self) -> Option<FieldValue> {
        Some(FieldValue::StringList(self.iter().cloned().collect()))
    }
}

impl ToFieldValue for BTreeMap<String, String> {
    fn to_field_value(&self) -> Option<FieldValue> {
        Some(FieldValue::StringMap(self.clone()))
    }
}

impl ToFieldValue for BTreeMap<String, Vec<String>> {
    fn to_field_value(&self) -> Option<FieldValue> {
        Some(FieldValue::StringListMap(self.clone()))
    }
}

impl ToFieldValue for BTreeMap<String, Vec<u8>> {
    fn to_field_value(&self) -> Option<FieldValue> {
        Some(FieldValue::BinaryMap(self.clone()))
    }
}

impl ToFieldValue for serde_json::Value {
    fn to_field_value(&self) -> Option<FieldValue> {
        if self.is_null() {
            None
        } else {
            Some(FieldValue::Structured(self.clone()))
        }
    }
}

impl<T: ToFieldValue> ToFieldValue for Option<T> {
    fn to_field_value(&self) -> Option<FieldValue> {
        self.as_ref().and_then(ToFieldValue::to_field_value)
    }
}

/// Build one `(name, value)` entry of an observation's field list.
pub fn field<T: ToFieldValue>(name: &'static str, value: &T) -> (&'static str, Option<FieldValue>) {
    (name, value.to_field_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_strings_flattens_maps() {
        let mut map = BTreeMap::new();
        map.insert("Run".to_string(), "evil.exe".to_string());
        let strings = FieldValue::StringMap(map).to_strings();
        assert_eq!(strings, vec!["Run".to_string(), "evil.exe".to_string()]);

        let mut acl = BTreeMap::new();
        acl.insert("root".to_string(), vec!["read".to_string(), "write".to_string()]);
        let strings = FieldValue::StringListMap(acl).to_strings();
        assert_eq!(strings, vec!["root", "read", "write"]);
    }

    #[test]
    fn test_scalar_strings() {
        assert_eq!(FieldValue::Int(443).to_strings(), vec!["443"]);
        assert_eq!(FieldValue::Bool(true).to_strings(), vec!["true"]);
    }

    #[test]
    fn test_unordered_eq_ignores_array_order() {
        assert!(unordered_eq(&json!([1, 2, 3]), &json!([3, 1, 2])));
        assert!(!unordered_eq(&json!([1, 1, 2]), &json!([1, 2, 2])));
        assert!(unordered_eq(
            &json!({"a": [1, {"b": [true, false]}]}),
            &json!({"a": [{"b": [false, true]}, 1]})
        ));
        assert!(!unordered_eq(&json!({"a": 1}), &json!({"a": 1, "b": 2})));
    }

    #[test]
    fn test_null_json_is_absent() {
        assert!(serde_json::Value::Null.to_field_value().is_none());
        assert!(None::<String>.to_field_value().is_none());
        assert_eq!(
            Some(22u16).to_field_value(),
            Some(FieldValue::Int(22))
        );
    }

    #[test]
    fn test_binary_map_renders_hex() {
        let mut pcrs = BTreeMap::new();
        pcrs.insert("sha256:0".to_string(), vec![0xde, 0xad]);
        assert_eq!(FieldValue::BinaryMap(pcrs).to_json(), json!({"sha256:0": "dead"}));
    }
}
