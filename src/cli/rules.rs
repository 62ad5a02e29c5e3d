//! Rule inspection commands.

use crate::analyzer::{read_rule_document, RuleSet};
use crate::config::AppConfig;
use crate::model::ResultType;
use crate::pipeline::load_rules;
use anyhow::{Context, Result};
use std::path::Path;

/// Print the effective rule set.
pub fn run_rules_show(config: &AppConfig, json: bool) -> Result<()> {
    let rules = load_rules(&config.rules);
    if json {
        println!("{}", serde_json::to_string_pretty(rules.document())?);
        return Ok(());
    }
    print!("{}", describe(&rules));
    Ok(())
}

/// Validate a rule document, returning the exit code.
///
/// Every problem is reported; the embedded fallback is never used here.
pub fn run_rules_validate(path: &Path) -> Result<i32> {
    let document = read_rule_document(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let count = document.rules.len();
    match RuleSet::new(document) {
        Ok(_) => {
            println!("{}: {count} rule(s) OK", path.display());
            Ok(crate::pipeline::exit_codes::SUCCESS)
        }
        Err(e) => {
            println!("{}: {e}", path.display());
            Ok(crate::pipeline::exit_codes::RULES_INVALID)
        }
    }
}

fn describe(rules: &RuleSet) -> String {
    let mut out = String::new();
    for rule in rules.rules() {
        let changes = rule.change_types.as_ref().map_or_else(
            || "any".to_string(),
            |cts| cts.iter().map(ToString::to_string).collect::<Vec<_>>().join(","),
        );
        out.push_str(&format!(
            "[{}] {} ({} {})\n",
            rule.flag, rule.name, rule.result_type, changes
        ));
        for clause in &rule.clauses {
            out.push_str(&format!(
                "    {} {} {}\n",
                clause.field,
                clause.operation,
                clause.data.join(", ")
            ));
        }
    }
    out.push_str("Default levels:\n");
    for rt in ResultType::ALL {
        out.push_str(&format!("    {rt}: {}\n", rules.default_level(rt)));
    }
    out
}
