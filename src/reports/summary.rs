//! Summary report generator for shell output.
//!
//! Provides a compact, human-readable summary for terminal usage.

use super::{ReportConfig, ReportError, ReportFormat, ReportGenerator};
use crate::diff::{bucket_key, ChangeType, ComparisonOutcome, ComparisonStatus};
use crate::model::Severity;

/// Apply ANSI color formatting if colored output is enabled.
fn ansi_color(text: &str, color: &str, colored: bool) -> String {
    if colored {
        match color {
            "red" => format!("\x1b[31m{text}\x1b[0m"),
            "green" => format!("\x1b[32m{text}\x1b[0m"),
            "yellow" => format!("\x1b[33m{text}\x1b[0m"),
            "cyan" => format!("\x1b[36m{text}\x1b[0m"),
            "bold" => format!("\x1b[1m{text}\x1b[0m"),
            "dim" => format!("\x1b[2m{text}\x1b[0m"),
            _ => text.to_string(),
        }
    } else {
        text.to_string()
    }
}

const fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::Fail => "red",
        Severity::Warning => "yellow",
        Severity::Information => "cyan",
        Severity::Verbose => "dim",
    }
}

const fn change_marker(change_type: ChangeType) -> (&'static str, &'static str) {
    match change_type {
        ChangeType::Created => ("+", "green"),
        ChangeType::Deleted => ("-", "red"),
        ChangeType::Modified => ("~", "yellow"),
        ChangeType::Renamed => (">", "cyan"),
        ChangeType::Invalid => ("!", "red"),
    }
}

/// Summary reporter for shell output
pub struct SummaryReporter {
    /// Use colored output
    colored: bool,
    /// Identities listed per bucket before eliding
    max_listed: usize,
}

impl SummaryReporter {
    /// Create a new summary reporter
    #[must_use]
    pub const fn new() -> Self {
        Self {
            colored: true,
            max_listed: 5,
        }
    }

    /// Disable colored output
    #[must_use]
    pub const fn no_color(mut self) -> Self {
        self.colored = false;
        self
    }

    /// Set how many identities to list per bucket
    #[must_use]
    pub const fn max_listed(mut self, max: usize) -> Self {
        self.max_listed = max;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        ansi_color(text, color, self.colored)
    }
}

impl Default for SummaryReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator for SummaryReporter {
    fn generate_report(
        &self,
        outcome: &ComparisonOutcome,
        config: &ReportConfig,
    ) -> Result<String, ReportError> {
        let mut lines = Vec::new();

        // Header
        lines.push(self.color("Attack Surface Diff", "bold"));
        lines.push(self.color("─".repeat(40).as_str(), "dim"));
        lines.push(format!(
            "{}  {} → {}",
            self.color("Runs:", "cyan"),
            outcome.first_run.as_deref().unwrap_or("(none)"),
            outcome.second_run.as_deref().unwrap_or("(none)")
        ));
        let status = match (outcome.status, outcome.from_store) {
            (ComparisonStatus::Completed, true) => "completed (stored)".to_string(),
            (status, _) if outcome.cancelled => format!("{status} (cancelled)"),
            (status, _) => status.to_string(),
        };
        lines.push(format!("{}  {status}", self.color("Status:", "cyan")));
        lines.push(String::new());

        // Buckets
        if outcome.is_empty() {
            lines.push(self.color("No changes", "green"));
        } else {
            lines.push(self.color("Changes:", "bold"));
        }
        for ((rt, ct), results) in &outcome.results {
            let shown: Vec<_> = results.iter().filter(|r| config.includes(r)).collect();
            if shown.is_empty() {
                continue;
            }
            let (marker, color) = change_marker(*ct);
            lines.push(format!(
                "  {} {}",
                self.color(&format!("{marker}{}", shown.len()), color),
                bucket_key(*rt, *ct)
            ));
            for result in shown.iter().take(self.max_listed) {
                let verdict = result.analysis.map_or_else(String::new, |s| {
                    format!(" [{}]", self.color(s.as_str(), severity_color(s)))
                });
                lines.push(format!("      {}{verdict}", result.identity()));
            }
            if shown.len() > self.max_listed {
                lines.push(self.color(
                    &format!("      … {} more", shown.len() - self.max_listed),
                    "dim",
                ));
            }
        }

        // Severity histogram
        let counts = outcome.severity_counts();
        if !counts.is_empty() {
            lines.push(String::new());
            lines.push(self.color("Severity:", "bold"));
            for severity in Severity::ALL.iter().rev() {
                if let Some(n) = counts.get(severity) {
                    lines.push(format!(
                        "  {:<12} {n}",
                        self.color(severity.as_str(), severity_color(*severity))
                    ));
                }
            }
        }

        if !outcome.warnings.is_empty() {
            lines.push(String::new());
            lines.push(self.color("Warnings:", "yellow"));
            for warning in &outcome.warnings {
                lines.push(format!("  {warning}"));
            }
        }

        lines.push(String::new());
        lines.push(format!(
            "{} {} results in {} ms",
            self.color("Total:", "bold"),
            outcome.total(),
            outcome.timings.total().as_millis()
        ));

        Ok(lines.join("\n"))
    }

    fn format(&self) -> ReportFormat {
        ReportFormat::Summary
    }
}
