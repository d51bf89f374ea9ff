//! Blacklist Core Library
//!
//! This crate provides the rule model and matching engine for the comment-spam
//! blacklist classifier.
//!
//! # Architecture
//!
//! A [`RuleSet`] is an immutable snapshot of literal substring rules and
//! compiled regex rules, plus the freshness timestamp of the source it was
//! parsed from. Refreshing never edits a rule set in place: a new one is built
//! and swapped in by reference, so a [`Matcher`] always sees one consistent
//! snapshot.
//!
//! # Modules
//!
//! - `types`: Rule variants, the `RuleSet` snapshot and its summary
//! - `matcher`: Literal-then-regex matching with first-hit short-circuit

pub mod matcher;
pub mod types;

// Re-export commonly used types
pub use matcher::{is_blacklisted, Matcher, RuleHit};
pub use types::{Freshness, LiteralRule, PatternRule, Rule, RuleSet, RuleSetError, RuleSetSummary};
