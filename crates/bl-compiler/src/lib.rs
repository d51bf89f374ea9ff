//! Blacklist Rule Compiler
//!
//! This crate parses MT-Blacklist style rule files into a `RuleSet`.

pub mod parser;

pub use parser::{parse_last_update, parse_rule_line, parse_rule_list, ParseError, LAST_UPDATE_FORMAT, LAST_UPDATE_MARKER};
