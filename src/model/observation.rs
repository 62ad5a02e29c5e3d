//! Observation envelope and the tagged variant over all kinds.

use super::kinds::{
    CertificateObject, ComObject, CryptographicKeyObject, DriverObject, EventLogObject,
    FileMonitorObject, FileSystemObject, FirewallObject, GroupAccountObject, ObservationKind,
    OpenPortObject, ProcessObject, RegistryObject, ServiceObject, TpmObject, UserAccountObject,
};
use super::value::FieldValue;
use crate::utils::content_hash_hex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of entity an observation describes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultType {
    File,
    Certificate,
    Port,
    Registry,
    Service,
    User,
    Group,
    Firewall,
    Com,
    #[serde(alias = "EVENT_LOG")]
    EventLog,
    Tpm,
    Key,
    Process,
    Driver,
    #[serde(alias = "FILE_MONITOR", alias = "FILEMONITOREVENT")]
    FileMonitor,
}

impl ResultType {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::File,
        Self::Certificate,
        Self::Port,
        Self::Registry,
        Self::Service,
        Self::User,
        Self::Group,
        Self::Firewall,
        Self::Com,
        Self::EventLog,
        Self::Tpm,
        Self::Key,
        Self::Process,
        Self::Driver,
        Self::FileMonitor,
    ];

    /// Canonical upper-case name, as used in rule documents and report keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "FILE",
            Self::Certificate => "CERTIFICATE",
            Self::Port => "PORT",
            Self::Registry => "REGISTRY",
            Self::Service => "SERVICE",
            Self::User => "USER",
            Self::Group => "GROUP",
            Self::Firewall => "FIREWALL",
            Self::Com => "COM",
            Self::EventLog => "EVENTLOG",
            Self::Tpm => "TPM",
            Self::Key => "KEY",
            Self::Process => "PROCESS",
            Self::Driver => "DRIVER",
            Self::FileMonitor => "FILEMONITOR",
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_uppercase();
        Self::ALL
            .into_iter()
            .find(|rt| rt.as_str() == normalized)
            .or_else(|| (normalized == "FILEMONITOREVENT").then_some(Self::FileMonitor))
            .ok_or_else(|| format!("unknown result type: {s}"))
    }
}

/// Payload of an observation, tagged by its [`ResultType`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ResultType", rename_all = "UPPERCASE")]
pub enum ObservationData {
    File(FileSystemObject),
    Certificate(CertificateObject),
    Port(OpenPortObject),
    Registry(RegistryObject),
    Service(ServiceObject),
    User(UserAccountObject),
    Group(GroupAccountObject),
    Firewall(FirewallObject),
    Com(ComObject),
    #[serde(alias = "EVENT_LOG")]
    EventLog(EventLogObject),
    Tpm(TpmObject),
    Key(CryptographicKeyObject),
    Process(ProcessObject),
    Driver(DriverObject),
    #[serde(alias = "FILE_MONITOR")]
    FileMonitor(FileMonitorObject),
}

macro_rules! for_each_kind {
    ($data:expr, $inner:ident => $body:expr) => {
        match $data {
            ObservationData::File($inner) => $body,
            ObservationData::Certificate($inner) => $body,
            ObservationData::Port($inner) => $body,
            ObservationData::Registry($inner) => $body,
            ObservationData::Service($inner) => $body,
            ObservationData::User($inner) => $body,
            ObservationData::Group($inner) => $body,
            ObservationData::Firewall($inner) => $body,
            ObservationData::Com($inner) => $body,
            ObservationData::EventLog($inner) => $body,
            ObservationData::Tpm($inner) => $body,
            ObservationData::Key($inner) => $body,
            ObservationData::Process($inner) => $body,
            ObservationData::Driver($inner) => $body,
            ObservationData::FileMonitor($inner) => $body,
        }
    };
}

const fn result_type_of<K: ObservationKind>(_: &K) -> ResultType {
    K::RESULT_TYPE
}

const fn skip_compare_of<K: ObservationKind>(_: &K) -> &'static [&'static str] {
    K::SKIP_COMPARE
}

impl ObservationData {
    #[must_use]
    pub fn result_type(&self) -> ResultType {
        for_each_kind!(self, o => result_type_of(o))
    }

    #[must_use]
    pub fn identity(&self) -> String {
        for_each_kind!(self, o => o.identity())
    }

    /// All data members of this observation's shape.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        for_each_kind!(self, o => o.fields())
    }

    /// Fields the diff generator ignores for this kind.
    #[must_use]
    pub fn skip_compare(&self) -> &'static [&'static str] {
        for_each_kind!(self, o => skip_compare_of(o))
    }

    /// Look up one field by name.
    ///
    /// The outer `Option` is `None` when the shape has no such member; the
    /// inner one is `None` when the member exists but is null.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Option<FieldValue>> {
        self.fields()
            .into_iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields().iter().any(|(n, _)| *n == name)
    }

    /// Hex content hash over the canonical JSON serialization.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        content_hash_hex(&bytes)
    }
}

/// One recorded fact about a system-state entity, owned by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Observation {
    pub run_id: String,
    /// Cross-run join key
    pub identity: String,
    /// Content hash of the full payload
    pub row_key: String,
    #[serde(flatten)]
    pub data: ObservationData,
}

impl Observation {
    /// Wrap a payload, deriving its identity and row key.
    pub fn new(run_id: impl Into<String>, data: ObservationData) -> Self {
        Self {
            run_id: run_id.into(),
            identity: data.identity(),
            row_key: data.content_hash(),
            data,
        }
    }

    #[must_use]
    pub fn result_type(&self) -> ResultType {
        self.data.result_type()
    }

    /// Whether two observations carry identical content.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.row_key == other.row_key
    }

    /// The payload as a JSON value, without the envelope.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.data).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(process: &str) -> ObservationData {
        ObservationData::Port(OpenPortObject {
            address: "0.0.0.0".to_string(),
            port: 443,
            protocol: "TCP".to_string(),
            process_name: Some(process.to_string()),
            ..Default::default()
        })
    }

    #[test]
    fn test_identity_stable_across_runs() {
        let a = Observation::new("run1", port("nginx"));
        let b = Observation::new("run2", port("httpd"));
        assert_eq!(a.identity, b.identity);
        assert_ne!(a.row_key, b.row_key);
    }

    #[test]
    fn test_row_key_ignores_run_id() {
        let a = Observation::new("run1", port("nginx"));
        let b = Observation::new("run2", port("nginx"));
        assert!(a.same_content(&b));
    }

    #[test]
    fn test_envelope_roundtrip_keeps_tag() {
        let obs = Observation::new("run1", port("nginx"));
        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["ResultType"], "PORT");
        assert_eq!(json["Port"], 443);
        assert_eq!(json["RunId"], "run1");
        let back: Observation = serde_json::from_value(json).unwrap();
        assert_eq!(back, obs);
    }

    #[test]
    fn test_field_lookup_distinguishes_missing_from_null() {
        let data = port("nginx");
        assert_eq!(data.field("Port"), Some(Some(FieldValue::Int(443))));
        assert_eq!(data.field("Family"), Some(None));
        assert_eq!(data.field("Path"), None);
        assert!(!data.has_field("Path"));
    }

    #[test]
    fn test_result_type_parse() {
        assert_eq!("port".parse::<ResultType>(), Ok(ResultType::Port));
        assert_eq!("event_log".parse::<ResultType>(), Ok(ResultType::EventLog));
        assert_eq!(
            "FileMonitorEvent".parse::<ResultType>(),
            Ok(ResultType::FileMonitor)
        );
        assert!("nope".parse::<ResultType>().is_err());
    }

    #[test]
    fn test_every_variant_reports_its_type() {
        let data = ObservationData::Tpm(TpmObject::default());
        assert_eq!(data.result_type(), ResultType::Tpm);
        assert!(data.skip_compare().is_empty());
        let data = ObservationData::File(FileSystemObject::default());
        assert_eq!(data.skip_compare(), &["LastAccessed"]);
    }
}
