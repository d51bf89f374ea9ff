use std::fs;
use std::path::Path;

use bl_compiler::parse_rule_list;
use bl_core::{Freshness, Matcher, RuleSet, RuleSetSummary};
use bl_update::{Blacklist, RefreshOutcome};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    pub source: String,
    pub rule_file: Option<String>,
    #[serde(flatten)]
    pub summary: RuleSetSummary,
}

impl InfoReport {
    pub fn from_blacklist(blacklist: &Blacklist) -> Self {
        Self {
            source: blacklist.source().to_string(),
            rule_file: blacklist.rule_file_path().map(|p| p.display().to_string()),
            summary: blacklist.rule_set().summary(),
        }
    }

    pub fn to_text(&self) -> String {
        let rule_file = self.rule_file.as_deref().unwrap_or("(none configured)");
        format!(
            "Blacklist: {}\n  Rule file:   {}\n  Literals:    {}\n  Patterns:    {}\n  Last update: {}",
            self.source,
            rule_file,
            self.summary.literals,
            self.summary.patterns,
            format_freshness(self.summary.freshness),
        )
    }
}

pub fn format_freshness(freshness: Option<Freshness>) -> String {
    freshness.map_or_else(|| "unknown".to_string(), |ts| ts.format("%Y/%m/%d %H:%M:%S").to_string())
}

/// One line per input: verdict plus the rule that hit.
pub fn verdict_line(rule_set: &RuleSet, input: &str) -> (bool, String) {
    match Matcher::new(rule_set).find_hit(input) {
        Some(hit) => (true, format!("BLACKLISTED  {input:?} ({hit})")),
        None => (false, format!("ok           {input:?}")),
    }
}

pub fn describe_outcome(outcome: RefreshOutcome) -> &'static str {
    match outcome {
        RefreshOutcome::NotModified => "not modified",
        RefreshOutcome::Stale => "remote list is not newer, kept current rules",
        RefreshOutcome::Updated => "updated",
        RefreshOutcome::Busy => "another update is in progress",
        RefreshOutcome::Failed => "update failed, kept current rules",
    }
}

pub fn validate_file(path: &Path) -> Result<RuleSetSummary, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    let rule_set = parse_rule_list(&text)
        .map_err(|e| format!("Invalid rule file '{}': {}", path.display(), e))?;
    Ok(rule_set.summary())
}
