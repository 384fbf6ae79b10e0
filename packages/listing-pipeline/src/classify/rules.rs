//! Ordered rule ladders.
//!
//! Each classifier is a `static` table of rules evaluated top to bottom; the
//! first rule that applies wins. Priority is therefore the table order.

use regex::Regex;
use std::sync::LazyLock;

/// One rung of a classifier ladder.
pub struct Rule<T: 'static> {
    pub name: &'static str,
    pub pattern: &'static LazyLock<Regex>,
    /// Suppresses the rule when this also matches
    pub unless: Option<&'static LazyLock<Regex>>,
    pub result: T,
}

impl<T> Rule<T> {
    pub fn applies(&self, text: &str) -> bool {
        self.pattern.is_match(text) && !self.unless.is_some_and(|u| u.is_match(text))
    }
}

/// First applicable rule, in table order.
pub fn first_match<'r, T>(rules: &'r [Rule<T>], text: &str) -> Option<&'r Rule<T>> {
    rules.iter().find(|rule| rule.applies(text))
}

/// Text the ladders run over: lowercased, whitespace collapsed,
/// punctuation kept (serial numbers and grades depend on it).
pub fn rule_text(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
