//! Severity verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Verdict assigned to a comparison result.
///
/// Totally ordered by [`Severity::rank`]; the most severe matched rule wins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String")]
pub enum Severity {
    Verbose = 0,
    #[default]
    Information = 1,
    Warning = 2,
    Fail = 3,
    Critical = 4,
}

impl Severity {
    pub const ALL: [Self; 5] = [
        Self::Verbose,
        Self::Information,
        Self::Warning,
        Self::Fail,
        Self::Critical,
    ];

    #[must_use]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verbose => "Verbose",
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Fail => "Fail",
            Self::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "verbose" | "debug" => Ok(Self::Verbose),
            "information" | "info" => Ok(Self::Information),
            "warning" | "warn" => Ok(Self::Warning),
            "fail" | "error" => Ok(Self::Fail),
            "critical" | "fatal" => Ok(Self::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_order() {
        assert!(Severity::Verbose < Severity::Information);
        assert!(Severity::Information < Severity::Warning);
        assert!(Severity::Warning < Severity::Fail);
        assert!(Severity::Fail < Severity::Critical);
        assert_eq!(Severity::Critical.rank(), 4);
    }

    #[test]
    fn test_aliases_case_insensitive() {
        assert_eq!("FATAL".parse::<Severity>(), Ok(Severity::Critical));
        assert_eq!("Error".parse::<Severity>(), Ok(Severity::Fail));
        assert_eq!("debug".parse::<Severity>(), Ok(Severity::Verbose));
        let s: Severity = serde_json::from_str("\"WARNING\"").unwrap();
        assert_eq!(s, Severity::Warning);
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"Warning\"");
    }
}
