//! Core type definitions for the blacklist
//!
//! Rules come in two flavours: literal substrings and regular expressions.
//! Both are collected into a [`RuleSet`], which is never mutated after it
//! has been built.

use std::fmt;

use aho_corasick::AhoCorasick;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;

/// Timestamp describing how fresh a rule source is.
pub type Freshness = DateTime<Utc>;

/// Error type for rule set construction.
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    #[error("Failed to build literal index: {0}")]
    LiteralIndex(#[from] aho_corasick::BuildError),
}

// =============================================================================
// Rules
// =============================================================================

/// A rule that hits when its text occurs anywhere in the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiteralRule {
    text: String,
}

impl LiteralRule {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Case-sensitive substring containment.
    pub fn is_hit(&self, input: &str) -> bool {
        input.contains(self.text.as_str())
    }
}

/// A rule that hits when its regex finds a match anywhere in the input.
#[derive(Debug, Clone)]
pub struct PatternRule {
    compiled: Regex,
}

impl PatternRule {
    /// Compile a pattern rule from its source text.
    pub fn new(source: &str) -> Result<Self, regex::Error> {
        Regex::new(source).map(Self::from_regex)
    }

    pub fn from_regex(compiled: Regex) -> Self {
        Self { compiled }
    }

    pub fn as_str(&self) -> &str {
        self.compiled.as_str()
    }

    pub fn is_hit(&self, input: &str) -> bool {
        self.compiled.is_match(input)
    }

    /// Unanchored search; returns the matched slice of `input`.
    pub fn find<'h>(&self, input: &'h str) -> Option<&'h str> {
        self.compiled.find(input).map(|m| m.as_str())
    }
}

impl PartialEq for PatternRule {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for PatternRule {}

/// A single blacklist rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Literal(LiteralRule),
    Pattern(PatternRule),
}

impl Rule {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(rule) => rule.as_str(),
            Self::Pattern(rule) => rule.as_str(),
        }
    }
}

impl From<LiteralRule> for Rule {
    fn from(rule: LiteralRule) -> Self {
        Self::Literal(rule)
    }
}

impl From<PatternRule> for Rule {
    fn from(rule: PatternRule) -> Self {
        Self::Pattern(rule)
    }
}

// =============================================================================
// Rule Set
// =============================================================================

/// Immutable snapshot of all active rules.
///
/// Literals and patterns keep the order they were listed in the source text;
/// that order is the order they are tested in.
#[derive(Debug, Clone)]
pub struct RuleSet {
    literals: Vec<LiteralRule>,
    patterns: Vec<PatternRule>,
    /// Multi-pattern index over `literals`, same containment semantics.
    pub(crate) literal_index: AhoCorasick,
    freshness: Option<Freshness>,
}

impl RuleSet {
    /// Build a rule set from rules in source order.
    pub fn new(
        rules: impl IntoIterator<Item = Rule>,
        freshness: Option<Freshness>,
    ) -> Result<Self, RuleSetError> {
        let mut literals = Vec::new();
        let mut patterns = Vec::new();

        for rule in rules {
            match rule {
                Rule::Literal(rule) => literals.push(rule),
                Rule::Pattern(rule) => patterns.push(rule),
            }
        }

        let literal_index = AhoCorasick::new(literals.iter().map(LiteralRule::as_str))?;

        Ok(Self {
            literals,
            patterns,
            literal_index,
            freshness,
        })
    }

    pub fn literals(&self) -> &[LiteralRule] {
        &self.literals
    }

    pub fn patterns(&self) -> &[PatternRule] {
        &self.patterns
    }

    pub fn freshness(&self) -> Option<Freshness> {
        self.freshness
    }

    /// Replace the freshness timestamp before the set is published.
    pub fn with_freshness(mut self, freshness: Option<Freshness>) -> Self {
        self.freshness = freshness;
        self
    }

    /// Total number of rules.
    pub fn len(&self) -> usize {
        self.literals.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> RuleSetSummary {
        RuleSetSummary {
            literals: self.literals.len(),
            patterns: self.patterns.len(),
            freshness: self.freshness,
        }
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literals: Vec<&str> = self.literals.iter().map(LiteralRule::as_str).collect();
        let patterns: Vec<&str> = self.patterns.iter().map(PatternRule::as_str).collect();
        writeln!(f, "blacklist {:?}", literals)?;
        write!(f, "Regex blacklist {:?}", patterns)
    }
}

/// Counts and freshness of a rule set, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleSetSummary {
    pub literals: usize,
    pub patterns: usize,
    pub freshness: Option<Freshness>,
}
