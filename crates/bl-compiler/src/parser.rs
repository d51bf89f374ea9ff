use bl_core::types::{Freshness, LiteralRule, PatternRule, Rule, RuleSet, RuleSetError};
use chrono::NaiveDateTime;

/// Marker for the comment carrying the list's timestamp.
pub const LAST_UPDATE_MARKER: &str = "Last update:";

/// `yyyy/MM/dd HH:mm:ss`, e.g. `2004/03/08 23:17:30`.
pub const LAST_UPDATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Error type for rule list parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid regex rule on line {line} ({rule}): {source}")]
    Regex {
        line: usize,
        rule: String,
        #[source]
        source: regex::Error,
    },
    #[error(transparent)]
    RuleSet(#[from] RuleSetError),
}

/// Parse a whole rule list.
///
/// Comment lines start with `#`; the last parseable `Last update:` comment
/// becomes the rule set's freshness. A regex-shaped rule that does not compile
/// fails the whole list.
pub fn parse_rule_list(text: &str) -> Result<RuleSet, ParseError> {
    let mut rules = Vec::new();
    let mut freshness = None;

    for (index, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }

        if line.starts_with('#') {
            if let Some(timestamp) = parse_last_update(line) {
                freshness = Some(timestamp);
            }
            continue;
        }

        match parse_rule_line(line) {
            Ok(Some(rule)) => rules.push(rule),
            Ok(None) => {}
            Err(source) => {
                return Err(ParseError::Regex {
                    line: index + 1,
                    rule: strip_inline_comment(line).to_string(),
                    source,
                });
            }
        }
    }

    Ok(RuleSet::new(rules, freshness)?)
}

/// Parse a single non-comment line.
///
/// Returns `Ok(None)` when nothing is left after comment stripping. Rules
/// containing `(` are regexes, everything else is a literal substring.
pub fn parse_rule_line(line: &str) -> Result<Option<Rule>, regex::Error> {
    let rule = strip_inline_comment(line);
    if rule.is_empty() {
        return Ok(None);
    }

    if rule.contains('(') {
        return PatternRule::new(rule).map(|rule| Some(Rule::from(rule)));
    }

    Ok(Some(Rule::from(LiteralRule::new(rule))))
}

/// Extract the timestamp from a `# Last update: 2004/03/08 23:17:30` comment.
///
/// Anything after the timestamp is ignored. Timestamps are read as UTC.
pub fn parse_last_update(line: &str) -> Option<Freshness> {
    let pos = line.find(LAST_UPDATE_MARKER)?;
    let value = line[pos + LAST_UPDATE_MARKER.len()..].trim();

    match NaiveDateTime::parse_and_remainder(value, LAST_UPDATE_FORMAT) {
        Ok((timestamp, _)) => Some(timestamp.and_utc()),
        Err(e) => {
            log::debug!("Unparseable last update {value:?}: {e}");
            None
        }
    }
}

/// Strip an inline `# comment`.
///
/// The character directly before `#` goes with the comment even when it is
/// not whitespace; existing rule files rely on this.
fn strip_inline_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) if pos > 0 => {
            let end = line[..pos].char_indices().next_back().map_or(0, |(i, _)| i);
            line[..end].trim()
        }
        _ => line.trim(),
    }
}
