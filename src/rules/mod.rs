//! Rule tables and the matchers built from them.
//!
//! A rule is an immutable `(regex, label)` pair. Tables are ordered and are
//! evaluated top to bottom, yielding either the first match or every match.

pub mod commands;
pub mod readonly;
pub mod secrets;
pub mod urls;

use crate::config::{ConfigError, compile_regex, compile_regex_ci};
use regex::{Match, Regex};

/// A compiled pattern with a human-readable classification.
#[derive(Debug, Clone)]
pub struct Rule {
    pub label: String,
    pub pattern: String,
    regex: Regex,
}

impl Rule {
    pub fn new(pattern: &str, label: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            label: label.into(),
            pattern: pattern.to_string(),
            regex: compile_regex(pattern)?,
        })
    }

    pub fn case_insensitive(pattern: &str, label: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            label: label.into(),
            pattern: pattern.to_string(),
            regex: compile_regex_ci(pattern)?,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn find<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        self.regex.find(text)
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// An ordered list of rules.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

impl RuleTable {
    /// Compile a static `(pattern, label)` table.
    pub fn compile(specs: &[(&str, &str)], case_insensitive: bool) -> Result<Self, ConfigError> {
        let rules = specs
            .iter()
            .map(|(pattern, label)| {
                if case_insensitive {
                    Rule::case_insensitive(pattern, *label)
                } else {
                    Rule::new(pattern, *label)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// The first rule (in table order) matching `text`.
    pub fn first_match(&self, text: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.is_match(text))
    }

    /// Every rule matching `text`, in table order.
    pub fn matches<'a>(&'a self, text: &'a str) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |r| r.is_match(text))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<Rule> for RuleTable {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[(&str, &str)] = &[(r"foo", "Foo"), (r"ba[rz]", "Bar"), (r"foo\w+", "Foo word")];

    #[test]
    fn test_first_match_respects_order() {
        let table = RuleTable::compile(TABLE, false).unwrap();
        assert_eq!(table.first_match("foobar").unwrap().label, "Foo");
        assert_eq!(table.first_match("baz").unwrap().label, "Bar");
        assert!(table.first_match("qux").is_none());
    }

    #[test]
    fn test_all_matches() {
        let table = RuleTable::compile(TABLE, false).unwrap();
        let labels: Vec<_> = table.matches("foobar").map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Foo", "Bar", "Foo word"]);
    }

    #[test]
    fn test_case_sensitivity() {
        assert!(RuleTable::compile(TABLE, false).unwrap().first_match("FOO").is_none());
        assert!(RuleTable::compile(TABLE, true).unwrap().first_match("FOO").is_some());
    }

    #[test]
    fn test_invalid_pattern_names_pattern() {
        let err = RuleTable::compile(&[("(", "broken")], false).unwrap_err();
        assert!(err.to_string().contains("'('"));
    }
}
