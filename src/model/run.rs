//! Scan runs.

use super::observation::ResultType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating system family a run was collected on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    Windows,
    Linux,
    #[serde(alias = "OSX")]
    Macos,
    #[default]
    Unknown,
}

impl Platform {
    /// Platform of the running process.
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(target_os = "windows") {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else if cfg!(target_os = "macos") {
            Self::Macos
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Windows => write!(f, "WINDOWS"),
            Self::Linux => write!(f, "LINUX"),
            Self::Macos => write!(f, "MACOS"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            "macos" | "osx" => Ok(Self::Macos),
            "unknown" => Ok(Self::Unknown),
            _ => Err(format!("unknown platform: {s}")),
        }
    }
}

/// Full collection or continuous monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunType {
    #[default]
    Collect,
    Monitor,
}

/// One scan execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Run {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub platform: Platform,
    /// Kinds the collector was asked to gather
    #[serde(default)]
    pub result_types: Vec<ResultType>,
    #[serde(default, rename = "Type")]
    pub run_type: RunType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
}

impl Run {
    /// Create a collect run on the current platform, stamped now.
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            timestamp: Utc::now(),
            platform: Platform::current(),
            result_types: Vec::new(),
            run_type: RunType::Collect,
            os_version: None,
        }
    }

    #[must_use]
    pub const fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_result_types(mut self, result_types: Vec<ResultType>) -> Self {
        self.result_types = result_types;
        self
    }

    #[must_use]
    pub const fn with_run_type(mut self, run_type: RunType) -> Self {
        self.run_type = run_type;
        self
    }
}
