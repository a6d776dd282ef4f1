//! Query expansion
//!
//! Grows a query with alternative terms from two fixed tables: acronyms
//! (`minimal`) and synonyms (`full`, on top of acronyms). Expansion only
//! appends terms, never removes or reorders what the user typed, and never
//! appends a term that is already present. Added terms are themselves
//! expanded until nothing new appears, so expanding an expanded query is a
//! no-op.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RecallError;

/// How aggressively to grow a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpansionLevel {
    /// Query unchanged
    None,
    /// Acronym additions
    #[default]
    Minimal,
    /// Acronyms plus synonyms
    Full,
}

impl ExpansionLevel {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minimal => "minimal",
            Self::Full => "full",
        }
    }
}

impl FromStr for ExpansionLevel {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "minimal" | "min" => Ok(Self::Minimal),
            "full" | "max" => Ok(Self::Full),
            other => Err(RecallError::InvalidArgument(format!(
                "unknown expansion level '{other}' (expected none, minimal, full)"
            ))),
        }
    }
}

impl std::fmt::Display for ExpansionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

const ACRONYMS: &[(&str, &str)] = &[
    ("pr", "pull request"),
    ("prs", "pull requests"),
    ("ci", "continuous integration"),
    ("cd", "continuous deployment"),
    ("db", "database"),
    ("api", "interface endpoint"),
    ("ui", "user interface"),
    ("ux", "user experience"),
    ("cli", "command line"),
    ("auth", "authentication"),
    ("authn", "authentication"),
    ("authz", "authorization"),
    ("env", "environment"),
    ("config", "configuration"),
    ("repo", "repository"),
    ("deps", "dependencies"),
    ("dep", "dependency"),
    ("impl", "implementation"),
    ("fn", "function"),
    ("ts", "typescript"),
    ("js", "javascript"),
    ("k8s", "kubernetes"),
    ("mcp", "model context protocol"),
    ("llm", "language model"),
    ("e2e", "end to end"),
    ("oom", "out of memory"),
    ("perf", "performance"),
    ("msg", "message"),
    ("err", "error"),
];

const SYNONYMS: &[(&str, &str)] = &[
    ("refactor", "refactoring"),
    ("refactoring", "refactor"),
    ("bug", "defect issue"),
    ("fix", "fixed"),
    ("fixed", "fix"),
    ("test", "tests testing"),
    ("tests", "test testing"),
    ("testing", "test tests"),
    ("error", "failure"),
    ("failure", "error"),
    ("deploy", "deployment release"),
    ("deployment", "deploy release"),
    ("release", "deploy"),
    ("authentication", "login"),
    ("login", "authentication"),
    ("configuration", "settings"),
    ("settings", "configuration"),
    ("database", "schema"),
    ("schema", "database"),
    ("slow", "performance latency"),
    ("performance", "latency"),
    ("latency", "performance"),
    ("crash", "panic failure"),
    ("panic", "crash"),
    ("docs", "documentation"),
    ("documentation", "docs"),
    ("convention", "conventions rule"),
    ("conventions", "convention rule"),
    ("rule", "rules convention"),
    ("rules", "rule convention"),
    ("decision", "decided"),
    ("decided", "decision"),
];

fn lookup(table: &'static [(&'static str, &'static str)], term: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(key, _)| *key == term)
        .map(|(_, value)| *value)
}

/// Lowercased word with surrounding punctuation removed.
fn normalize(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

/// Expand `query` at `level`.
#[must_use]
pub fn expand(query: &str, level: ExpansionLevel) -> String {
    if level == ExpansionLevel::None {
        return query.to_string();
    }

    let original: Vec<&str> = query.split_whitespace().collect();
    let mut present: HashSet<String> = original.iter().map(|w| normalize(w)).collect();
    let mut pending: Vec<String> = original.iter().map(|w| normalize(w)).collect();
    let mut added: Vec<String> = Vec::new();

    let mut cursor = 0;
    while cursor < pending.len() {
        let term = pending[cursor].clone();
        cursor += 1;
        if term.is_empty() {
            continue;
        }

        let mut alternatives: Vec<&'static str> = Vec::new();
        if let Some(value) = lookup(ACRONYMS, &term) {
            alternatives.push(value);
        }
        if level == ExpansionLevel::Full {
            if let Some(value) = lookup(SYNONYMS, &term) {
                alternatives.push(value);
            }
        }

        for alternative in alternatives {
            for word in alternative.split_whitespace() {
                if present.insert(word.to_string()) {
                    added.push(word.to_string());
                    pending.push(word.to_string());
                }
            }
        }
    }

    if added.is_empty() {
        return query.to_string();
    }

    let mut out = original.join(" ");
    for word in &added {
        out.push(' ');
        out.push_str(word);
    }
    out
}

/// Terms `expand` would add at `level`, in order.
#[must_use]
pub fn added_terms(query: &str, level: ExpansionLevel) -> Vec<String> {
    let expanded = expand(query, level);
    let base = query.split_whitespace().count();
    expanded
        .split_whitespace()
        .skip(base)
        .map(ToString::to_string)
        .collect()
}
