//! Observation kinds.
//!
//! One struct per kind of system-state entity a collector can record. Each
//! struct declares its natural key ([`ObservationKind::identity`]), the full
//! list of its data members ([`ObservationKind::fields`]) and the members the
//! diff generator must ignore ([`ObservationKind::SKIP_COMPARE`]).
//!
//! Field names are PascalCase and identical to the serialized JSON names, so
//! rule clauses can refer to either interchangeably.

use super::observation::ResultType;
use super::value::{field, FieldValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Compile-time description of an observation kind.
pub trait ObservationKind {
    /// The variant tag for this kind.
    const RESULT_TYPE: ResultType;

    /// Fields excluded from field-level comparison.
    const SKIP_COMPARE: &'static [&'static str] = &[];

    /// Natural key that identifies the same entity across runs.
    fn identity(&self) -> String;

    /// All data members, in declaration order.
    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)>;
}

/// A file or directory on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FileSystemObject {
    pub path: String,
    pub is_directory: bool,
    pub is_executable: bool,
    pub is_link: bool,
    pub target: Option<String>,
    pub size: Option<u64>,
    pub owner: Option<String>,
    pub group: Option<String>,
    pub permissions: BTreeMap<String, String>,
    pub permissions_string: Option<String>,
    pub set_uid: bool,
    pub set_gid: bool,
    pub content_hash: Option<String>,
    pub signature_status: Option<String>,
    pub characteristics: Vec<String>,
    pub created: Option<String>,
    pub last_modified: Option<String>,
    pub last_accessed: Option<String>,
}

impl ObservationKind for FileSystemObject {
    const RESULT_TYPE: ResultType = ResultType::File;
    const SKIP_COMPARE: &'static [&'static str] = &["LastAccessed"];

    fn identity(&self) -> String {
        self.path.clone()
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Path", &self.path),
            field("IsDirectory", &self.is_directory),
            field("IsExecutable", &self.is_executable),
            field("IsLink", &self.is_link),
            field("Target", &self.target),
            field("Size", &self.size),
            field("Owner", &self.owner),
            field("Group", &self.group),
            field("Permissions", &self.permissions),
            field("PermissionsString", &self.permissions_string),
            field("SetUid", &self.set_uid),
            field("SetGid", &self.set_gid),
            field("ContentHash", &self.content_hash),
            field("SignatureStatus", &self.signature_status),
            field("Characteristics", &self.characteristics),
            field("Created", &self.created),
            field("LastModified", &self.last_modified),
            field("LastAccessed", &self.last_accessed),
        ]
    }
}

/// An X.509 certificate found in a certificate store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CertificateObject {
    pub store_location: String,
    pub store_name: String,
    pub thumbprint: String,
    pub subject: Option<String>,
    pub issuer: Option<String>,
    pub serial_number: Option<String>,
    pub not_before: Option<String>,
    pub not_after: Option<String>,
    pub key_usages: Vec<String>,
    pub pem: Option<String>,
}

impl ObservationKind for CertificateObject {
    const RESULT_TYPE: ResultType = ResultType::Certificate;
    const SKIP_COMPARE: &'static [&'static str] = &["Pem"];

    fn identity(&self) -> String {
        format!(
            "{}\\{}\\{}",
            self.store_location, self.store_name, self.thumbprint
        )
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("StoreLocation", &self.store_location),
            field("StoreName", &self.store_name),
            field("Thumbprint", &self.thumbprint),
            field("Subject", &self.subject),
            field("Issuer", &self.issuer),
            field("SerialNumber", &self.serial_number),
            field("NotBefore", &self.not_before),
            field("NotAfter", &self.not_after),
            field("KeyUsages", &self.key_usages),
            field("Pem", &self.pem),
        ]
    }
}

/// A listening network port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OpenPortObject {
    pub address: String,
    pub port: u16,
    pub protocol: String,
    pub family: Option<String>,
    pub process_name: Option<String>,
    pub process_id: Option<u32>,
}

impl ObservationKind for OpenPortObject {
    const RESULT_TYPE: ResultType = ResultType::Port;

    fn identity(&self) -> String {
        format!("{}:{}:{}", self.address, self.port, self.protocol)
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Address", &self.address),
            field("Port", &self.port),
            field("Protocol", &self.protocol),
            field("Family", &self.family),
            field("ProcessName", &self.process_name),
            field("ProcessId", &self.process_id),
        ]
    }
}

/// A registry key with its values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RegistryObject {
    pub key: String,
    pub view: String,
    pub subkeys: Vec<String>,
    pub values: BTreeMap<String, String>,
    pub permissions: BTreeMap<String, Vec<String>>,
    pub permissions_string: Option<String>,
}

impl ObservationKind for RegistryObject {
    const RESULT_TYPE: ResultType = ResultType::Registry;
    const SKIP_COMPARE: &'static [&'static str] = &["Subkeys"];

    fn identity(&self) -> String {
        format!("{}:{}", self.view, self.key)
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Key", &self.key),
            field("View", &self.view),
            field("Subkeys", &self.subkeys),
            field("Values", &self.values),
            field("Permissions", &self.permissions),
            field("PermissionsString", &self.permissions_string),
        ]
    }
}

/// A system service or daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceObject {
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub path_name: Option<String>,
    pub start_type: Option<String>,
    pub state: Option<String>,
    pub start_name: Option<String>,
    pub accept_stop: Option<bool>,
}

impl ObservationKind for ServiceObject {
    const RESULT_TYPE: ResultType = ResultType::Service;

    fn identity(&self) -> String {
        self.name.clone()
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Name", &self.name),
            field("DisplayName", &self.display_name),
            field("Description", &self.description),
            field("PathName", &self.path_name),
            field("StartType", &self.start_type),
            field("State", &self.state),
            field("StartName", &self.start_name),
            field("AcceptStop", &self.accept_stop),
        ]
    }
}

/// A local or domain user account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct UserAccountObject {
    pub name: String,
    pub domain: Option<String>,
    pub sid: Option<String>,
    pub uid: Option<String>,
    pub gid: Option<String>,
    pub full_name: Option<String>,
    pub home_directory: Option<String>,
    pub shell: Option<String>,
    pub disabled: Option<bool>,
    pub privileged: Option<bool>,
    pub password_required: Option<bool>,
    pub groups: Vec<String>,
    pub properties: BTreeMap<String, String>,
}

impl ObservationKind for UserAccountObject {
    const RESULT_TYPE: ResultType = ResultType::User;

    fn identity(&self) -> String {
        qualified_name(self.domain.as_deref(), &self.name)
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Name", &self.name),
            field("Domain", &self.domain),
            field("Sid", &self.sid),
            field("Uid", &self.uid),
            field("Gid", &self.gid),
            field("FullName", &self.full_name),
            field("HomeDirectory", &self.home_directory),
            field("Shell", &self.shell),
            field("Disabled", &self.disabled),
            field("Privileged", &self.privileged),
            field("PasswordRequired", &self.password_required),
            field("Groups", &self.groups),
            field("Properties", &self.properties),
        ]
    }
}

/// A local or domain group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GroupAccountObject {
    pub name: String,
    pub domain: Option<String>,
    pub sid: Option<String>,
    pub gid: Option<String>,
    pub description: Option<String>,
    pub users: Vec<String>,
}

impl ObservationKind for GroupAccountObject {
    const RESULT_TYPE: ResultType = ResultType::Group;

    fn identity(&self) -> String {
        qualified_name(self.domain.as_deref(), &self.name)
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Name", &self.name),
            field("Domain", &self.domain),
            field("Sid", &self.sid),
            field("Gid", &self.gid),
            field("Description", &self.description),
            field("Users", &self.users),
        ]
    }
}

/// A host firewall rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FirewallObject {
    pub name: String,
    pub direction: String,
    pub action: Option<String>,
    pub protocol: Option<String>,
    pub profiles: Vec<String>,
    pub application_name: Option<String>,
    pub local_addresses: Vec<String>,
    pub remote_addresses: Vec<String>,
    pub local_ports: Vec<String>,
    pub remote_ports: Vec<String>,
    pub is_enable: Option<bool>,
}

impl ObservationKind for FirewallObject {
    const RESULT_TYPE: ResultType = ResultType::Firewall;

    fn identity(&self) -> String {
        format!("{}:{}", self.direction, self.name)
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Name", &self.name),
            field("Direction", &self.direction),
            field("Action", &self.action),
            field("Protocol", &self.protocol),
            field("Profiles", &self.profiles),
            field("ApplicationName", &self.application_name),
            field("LocalAddresses", &self.local_addresses),
            field("RemoteAddresses", &self.remote_addresses),
            field("LocalPorts", &self.local_ports),
            field("RemotePorts", &self.remote_ports),
            field("IsEnable", &self.is_enable),
        ]
    }
}

/// A registered COM class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ComObject {
    pub clsid: String,
    pub description: Option<String>,
    pub inproc_server: Option<String>,
    pub local_server: Option<String>,
    pub threading_model: Option<String>,
}

impl ObservationKind for ComObject {
    const RESULT_TYPE: ResultType = ResultType::Com;

    fn identity(&self) -> String {
        self.clsid.clone()
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Clsid", &self.clsid),
            field("Description", &self.description),
            field("InprocServer", &self.inproc_server),
            field("LocalServer", &self.local_server),
            field("ThreadingModel", &self.threading_model),
        ]
    }
}

/// A single event log entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EventLogObject {
    pub source: String,
    pub timestamp: String,
    pub summary: String,
    pub level: Option<String>,
    pub process: Option<String>,
    pub data: Vec<String>,
}

impl ObservationKind for EventLogObject {
    const RESULT_TYPE: ResultType = ResultType::EventLog;

    fn identity(&self) -> String {
        format!("{}:{}:{}", self.source, self.timestamp, self.summary)
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Source", &self.source),
            field("Timestamp", &self.timestamp),
            field("Summary", &self.summary),
            field("Level", &self.level),
            field("Process", &self.process),
            field("Data", &self.data),
        ]
    }
}

/// State of a TPM device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TpmObject {
    pub location: String,
    pub manufacturer: Option<String>,
    pub version: Option<String>,
    pub timestamp: Option<String>,
    /// PCR banks keyed by `algorithm:index`
    pub pcrs: BTreeMap<String, Vec<u8>>,
    pub nv_indices: Vec<String>,
}

impl ObservationKind for TpmObject {
    const RESULT_TYPE: ResultType = ResultType::Tpm;

    fn identity(&self) -> String {
        self.location.clone()
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Location", &self.location),
            field("Manufacturer", &self.manufacturer),
            field("Version", &self.version),
            field("Timestamp", &self.timestamp),
            field("Pcrs", &self.pcrs),
            field("NvIndices", &self.nv_indices),
        ]
    }
}

/// A cryptographic key held by a key store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CryptographicKeyObject {
    pub source: String,
    pub key_id: String,
    pub algorithm: Option<String>,
    pub key_size: Option<u32>,
    pub exportable: Option<bool>,
    /// Algorithm-specific parameters as collected
    pub parameters: serde_json::Value,
}

impl ObservationKind for CryptographicKeyObject {
    const RESULT_TYPE: ResultType = ResultType::Key;

    fn identity(&self) -> String {
        format!("{}:{}", self.source, self.key_id)
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Source", &self.source),
            field("KeyId", &self.key_id),
            field("Algorithm", &self.algorithm),
            field("KeySize", &self.key_size),
            field("Exportable", &self.exportable),
            field("Parameters", &self.parameters),
        ]
    }
}

/// A running process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProcessObject {
    pub pid: u32,
    pub name: String,
    pub parent_pid: Option<u32>,
    pub path: Option<String>,
    pub user: Option<String>,
    pub start_time: Option<String>,
    pub command_line: Option<String>,
    pub threads: Option<u32>,
    pub modules: Vec<String>,
}

impl ObservationKind for ProcessObject {
    const RESULT_TYPE: ResultType = ResultType::Process;
    const SKIP_COMPARE: &'static [&'static str] = &["Threads"];

    fn identity(&self) -> String {
        format!("{}:{}", self.name, self.pid)
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Pid", &self.pid),
            field("Name", &self.name),
            field("ParentPid", &self.parent_pid),
            field("Path", &self.path),
            field("User", &self.user),
            field("StartTime", &self.start_time),
            field("CommandLine", &self.command_line),
            field("Threads", &self.threads),
            field("Modules", &self.modules),
        ]
    }
}

/// A kernel driver or module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DriverObject {
    pub name: String,
    pub display_name: Option<String>,
    pub path: Option<String>,
    pub driver_type: Option<String>,
    pub start_mode: Option<String>,
    pub state: Option<String>,
    pub signature_status: Option<String>,
    pub version: Option<String>,
}

impl ObservationKind for DriverObject {
    const RESULT_TYPE: ResultType = ResultType::Driver;

    fn identity(&self) -> String {
        self.name.clone()
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Name", &self.name),
            field("DisplayName", &self.display_name),
            field("Path", &self.path),
            field("DriverType", &self.driver_type),
            field("StartMode", &self.start_mode),
            field("State", &self.state),
            field("SignatureStatus", &self.signature_status),
            field("Version", &self.version),
        ]
    }
}

/// A file system change event recorded by a monitor run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct FileMonitorObject {
    pub path: String,
    pub old_path: Option<String>,
    pub name: Option<String>,
    pub change_type: String,
    pub timestamp: String,
    pub notify_filters: Vec<String>,
}

impl ObservationKind for FileMonitorObject {
    const RESULT_TYPE: ResultType = ResultType::FileMonitor;

    fn identity(&self) -> String {
        format!("{}:{}:{}", self.path, self.change_type, self.timestamp)
    }

    fn fields(&self) -> Vec<(&'static str, Option<FieldValue>)> {
        vec![
            field("Path", &self.path),
            field("OldPath", &self.old_path),
            field("Name", &self.name),
            field("ChangeType", &self.change_type),
            field("Timestamp", &self.timestamp),
            field("NotifyFilters", &self.notify_filters),
        ]
    }
}

fn qualified_name(domain: Option<&str>, name: &str) -> String {
    match domain {
        Some(d) if !d.is_empty() => format!("{d}\\{name}"),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_identity_uses_natural_key() {
        let port = OpenPortObject {
            address: "0.0.0.0".to_string(),
            port: 443,
            protocol: "TCP".to_string(),
            process_name: Some("nginx".to_string()),
            ..Default::default()
        };
        assert_eq!(port.identity(), "0.0.0.0:443:TCP");
    }

    #[test]
    fn test_user_identity_qualifies_domain() {
        let mut user = UserAccountObject {
            name: "alice".to_string(),
            ..Default::default()
        };
        assert_eq!(user.identity(), "alice");
        user.domain = Some("CORP".to_string());
        assert_eq!(user.identity(), "CORP\\alice");
    }

    #[test]
    fn test_field_names_match_serialized_names() {
        let file = FileSystemObject {
            path: "/etc/passwd".to_string(),
            target: Some("x".to_string()),
            size: Some(1),
            owner: Some("root".to_string()),
            group: Some("root".to_string()),
            permissions_string: Some("rw-r--r--".to_string()),
            content_hash: Some("abc".to_string()),
            signature_status: Some("Unsigned".to_string()),
            created: Some("t".to_string()),
            last_modified: Some("t".to_string()),
            last_accessed: Some("t".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&file).unwrap();
        let object = json.as_object().unwrap();
        for (name, _) in file.fields() {
            assert!(object.contains_key(name), "{name} missing from JSON");
        }
        assert_eq!(object.len(), file.fields().len());
    }

    #[test]
    fn test_skip_compare_names_exist() {
        let registry = RegistryObject::default();
        let names: Vec<_> = registry.fields().into_iter().map(|(n, _)| n).collect();
        for skipped in RegistryObject::SKIP_COMPARE {
            assert!(names.contains(skipped));
        }
    }
}
