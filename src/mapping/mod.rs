//! Named rule sets.
//!
//! A rule set evaluates ordered rules against one record, either listing
//! every match or returning the value of the first match.

mod rules;

pub use rules::{CompiledRule, RuleSet, evaluate_rules_first};
