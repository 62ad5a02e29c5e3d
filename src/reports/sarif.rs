//! SARIF 2.1.0 report generator for CI/CD integration.

use super::{ReportConfig, ReportError, ReportFormat, ReportGenerator};
use crate::diff::{ChangeType, CompareResult, ComparisonOutcome};
use crate::model::{ResultType, Severity};
use serde::Serialize;
use std::collections::BTreeMap;

const SARIF_SCHEMA: &str = "https://json.schemastore.org/sarif-2.1.0.json";
const INFORMATION_URI: &str = "https://github.com/surface-diff/surface-diff";

/// SARIF report generator
pub struct SarifReporter {
    /// Include results whose verdict is below Warning
    include_info: bool,
}

impl SarifReporter {
    /// Create a new SARIF reporter
    #[must_use]
    pub const fn new() -> Self {
        Self { include_info: true }
    }

    /// Set whether to include informational results
    #[must_use]
    pub const fn include_info(mut self, include: bool) -> Self {
        self.include_info = include;
        self
    }
}

impl Default for SarifReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator for SarifReporter {
    fn generate_report(
        &self,
        outcome: &ComparisonOutcome,
        config: &ReportConfig,
    ) -> Result<String, ReportError> {
        let mut rules: BTreeMap<String, SarifRule> = change_rules()
            .into_iter()
            .map(|r| (r.id.clone(), r))
            .collect();
        let mut results = Vec::new();

        for result in outcome.iter_results().filter(|r| config.includes(r)) {
            let level = result.analysis.map_or(SarifLevel::Note, severity_to_level);
            if !self.include_info && matches!(level, SarifLevel::Note | SarifLevel::None) {
                continue;
            }

            if result.rules.is_empty() {
                results.push(SarifResult {
                    rule_id: change_rule_id(result.change_type).to_string(),
                    level,
                    message: SarifMessage {
                        text: describe(result, config.include_diffs),
                    },
                    locations: locations(result),
                });
                continue;
            }

            for name in &result.rules {
                let id = analysis_rule_id(name);
                rules.entry(id.clone()).or_insert_with(|| SarifRule {
                    id: id.clone(),
                    name: name.clone(),
                    short_description: SarifMessage { text: name.clone() },
                    default_configuration: SarifConfiguration { level },
                });
                results.push(SarifResult {
                    rule_id: id,
                    level,
                    message: SarifMessage {
                        text: format!("{name}: {}", describe(result, config.include_diffs)),
                    },
                    locations: locations(result),
                });
            }
        }

        let report = SarifReport {
            schema: SARIF_SCHEMA.to_string(),
            version: "2.1.0".to_string(),
            runs: vec![SarifRun {
                tool: SarifTool {
                    driver: SarifDriver {
                        name: config.metadata.tool.clone(),
                        version: config.metadata.version.clone(),
                        information_uri: INFORMATION_URI.to_string(),
                        rules: rules.into_values().collect(),
                    },
                },
                results,
            }],
        };

        Ok(serde_json::to_string_pretty(&report)?)
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Sarif
    }
}

const fn severity_to_level(severity: Severity) -> SarifLevel {
    match severity {
        Severity::Critical | Severity::Fail => SarifLevel::Error,
        Severity::Warning => SarifLevel::Warning,
        Severity::Information | Severity::Verbose => SarifLevel::Note,
    }
}

const fn change_rule_id(change_type: ChangeType) -> &'static str {
    match change_type {
        ChangeType::Created => "SURFACE-DIFF-001",
        ChangeType::Deleted => "SURFACE-DIFF-002",
        ChangeType::Modified => "SURFACE-DIFF-003",
        ChangeType::Renamed => "SURFACE-DIFF-004",
        ChangeType::Invalid => "SURFACE-DIFF-005",
    }
}

/// Stable id for an analysis rule, derived from its name.
fn analysis_rule_id(name: &str) -> String {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    format!("SURFACE-RULE-{slug}")
}

fn describe(result: &CompareResult, include_diffs: bool) -> String {
    let verb = match result.change_type {
        ChangeType::Created => "created",
        ChangeType::Deleted => "deleted",
        ChangeType::Modified => "modified",
        ChangeType::Renamed => "renamed",
        ChangeType::Invalid => "invalid",
    };
    let mut text = format!("{} {verb}: {}", result.result_type, result.identity());
    if include_diffs && !result.diffs.is_empty() {
        let fields: Vec<&str> = result.diffs.iter().map(|d| d.field.as_str()).collect();
        text.push_str(&format!(" (changed: {})", fields.join(", ")));
    }
    text
}

/// File results point at the file; everything else is a logical location.
fn locations(result: &CompareResult) -> Vec<SarifLocation> {
    if result.result_type == ResultType::File {
        vec![SarifLocation {
            physical_location: Some(SarifPhysicalLocation {
                artifact_location: SarifArtifactLocation {
                    uri: result.identity().to_string(),
                },
            }),
            logical_locations: Vec::new(),
        }]
    } else {
        vec![SarifLocation {
            physical_location: None,
            logical_locations: vec![SarifLogicalLocation {
                name: result.identity().to_string(),
                kind: result.result_type.to_string(),
            }],
        }]
    }
}

fn change_rules() -> Vec<SarifRule> {
    [
        (ChangeType::Created, "EntityCreated", "Entity appeared in the compare run"),
        (ChangeType::Deleted, "EntityDeleted", "Entity disappeared from the compare run"),
        (ChangeType::Modified, "EntityModified", "Entity content changed between runs"),
        (ChangeType::Renamed, "EntityRenamed", "Entity was renamed between runs"),
        (ChangeType::Invalid, "EntityInvalid", "Entity could not be compared"),
    ]
    .into_iter()
    .map(|(ct, name, text)| SarifRule {
        id: change_rule_id(ct).to_string(),
        name: name.to_string(),
        short_description: SarifMessage {
            text: text.to_string(),
        },
        default_configuration: SarifConfiguration {
            level: SarifLevel::Note,
        },
    })
    .collect()
}

// SARIF structures

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: String,
    version: String,
    runs: Vec<SarifRun>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifDriver {
    name: String,
    version: String,
    information_uri: String,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifRule {
    id: String,
    name: String,
    short_description: SarifMessage,
    default_configuration: SarifConfiguration,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifConfiguration {
    level: SarifLevel,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifResult {
    rule_id: String,
    level: SarifLevel,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifMessage {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    physical_location: Option<SarifPhysicalLocation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    logical_locations: Vec<SarifLogicalLocation>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifPhysicalLocation {
    artifact_location: SarifArtifactLocation,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifArtifactLocation {
    uri: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SarifLogicalLocation {
    name: String,
    kind: String,
}

#[derive(Serialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum SarifLevel {
    #[allow(dead_code)]
    None,
    Note,
    Warning,
    Error,
}
