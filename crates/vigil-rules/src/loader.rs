use std::path::Path;

use crate::error::RuleError;
use crate::rule::{compile_rules, Rule, RuleSpec};

/// Load and compile rules from a YAML file.
///
/// Individual rules that fail to compile are skipped with a warning; an
/// unreadable or unparseable file is an error the caller degrades from
/// (the daemon runs the cycle with no rules).
pub fn load_rules(path: &Path) -> Result<Vec<Rule>, RuleError> {
    let content = std::fs::read_to_string(path)?;
    let specs: Vec<RuleSpec> = serde_yaml::from_str(&content)?;
    let total = specs.len();
    let rules = compile_rules(specs);
    tracing::info!(
        path = %path.display(),
        loaded = rules.len(),
        skipped = total - rules.len(),
        "Loaded rules"
    );
    Ok(rules)
}
