//! Core Matching Engine
//!
//! Every submitted comment goes through here. Literal rules are tested
//! before regex rules and the first hit wins.

use std::fmt;

use crate::types::{LiteralRule, PatternRule, RuleSet};

/// The rule responsible for a positive verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleHit<'a> {
    Literal(&'a LiteralRule),
    Pattern {
        rule: &'a PatternRule,
        matched: &'a str,
    },
}

impl fmt::Display for RuleHit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(rule) => write!(f, "matched:{}:", rule.as_str()),
            Self::Pattern { rule, matched } => {
                write!(f, "{} matched by {}", matched, rule.as_str())
            }
        }
    }
}

/// Matcher over a single rule set snapshot.
pub struct Matcher<'a> {
    rule_set: &'a RuleSet,
}

impl<'a> Matcher<'a> {
    pub fn new(rule_set: &'a RuleSet) -> Self {
        Self { rule_set }
    }

    /// Does the input hit any rule?
    ///
    /// With debug logging enabled the rules are scanned in source order so the
    /// first-listed hit can be reported; otherwise literals go through the
    /// automaton. The verdict is the same either way.
    pub fn is_blacklisted(&self, input: &str) -> bool {
        if input.is_empty() {
            return false;
        }

        if log::log_enabled!(log::Level::Debug) {
            return match self.find_hit(input) {
                Some(hit) => {
                    log::debug!("{hit}");
                    true
                }
                None => false,
            };
        }

        self.rule_set.literal_index.is_match(input)
            || self.rule_set.patterns().iter().any(|rule| rule.is_hit(input))
    }

    /// Find the first rule that hits, literals first.
    pub fn find_hit<'i>(&self, input: &'i str) -> Option<RuleHit<'i>>
    where
        'a: 'i,
    {
        if input.is_empty() {
            return None;
        }

        if let Some(rule) = self.rule_set.literals().iter().find(|rule| rule.is_hit(input)) {
            return Some(RuleHit::Literal(rule));
        }

        self.rule_set
            .patterns()
            .iter()
            .find_map(|rule| rule.find(input).map(|matched| RuleHit::Pattern { rule, matched }))
    }
}

/// Classify `input` against `rule_set`.
pub fn is_blacklisted(rule_set: &RuleSet, input: &str) -> bool {
    Matcher::new(rule_set).is_blacklisted(input)
}

impl RuleSet {
    pub fn is_blacklisted(&self, input: &str) -> bool {
        is_blacklisted(self, input)
    }
}
