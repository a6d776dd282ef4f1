//! Strategy kinds and per-strategy execution records

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::document::Document;
use crate::error::{ErrorCode, RecallError};

/// One independent retrieval method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Keyword index, raw query
    DirectFts,
    /// Keyword index, expanded query
    ExpandedFts,
    /// Embedding similarity, raw query
    Semantic,
    /// Generated-summary index, expanded query
    Summaries,
}

/// Which form of the query a strategy receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryForm {
    Raw,
    Expanded,
}

/// Which bound back-end of a layer serves a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Fts,
    Vector,
    Summaries,
}

impl StrategyKind {
    pub const ALL: [Self; 4] = [
        Self::DirectFts,
        Self::ExpandedFts,
        Self::Semantic,
        Self::Summaries,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DirectFts => "direct_fts",
            Self::ExpandedFts => "expanded_fts",
            Self::Semantic => "semantic",
            Self::Summaries => "summaries",
        }
    }

    /// Keyword strategies take the expanded query; embedding similarity takes
    /// the raw one since extra terms dilute the semantic signal.
    #[must_use]
    pub const fn query_form(&self) -> QueryForm {
        match self {
            Self::DirectFts | Self::Semantic => QueryForm::Raw,
            Self::ExpandedFts | Self::Summaries => QueryForm::Expanded,
        }
    }

    #[must_use]
    pub const fn backend(&self) -> Backend {
        match self {
            Self::DirectFts | Self::ExpandedFts => Backend::Fts,
            Self::Semantic => Backend::Vector,
            Self::Summaries => Backend::Summaries,
        }
    }

    /// Parse a comma-separated list, preserving order and dropping repeats.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, RecallError> {
        let mut out = Vec::new();
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kind = part.parse::<Self>()?;
            if !out.contains(&kind) {
                out.push(kind);
            }
        }
        Ok(out)
    }
}

impl FromStr for StrategyKind {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "direct_fts" | "fts" | "direct" => Ok(Self::DirectFts),
            "expanded_fts" | "expanded" => Ok(Self::ExpandedFts),
            "semantic" | "vector" => Ok(Self::Semantic),
            "summaries" | "summary" => Ok(Self::Summaries),
            other => Err(RecallError::UnknownStrategy(other.to_string())),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One strategy execution record. Built once by the runner, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyOutcome {
    pub strategy: StrategyKind,
    /// Strategy-ranked hits, rank 1 first. Empty unless `succeeded`.
    pub documents: Vec<Document>,
    pub duration_ms: u64,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    pub timed_out: bool,
}

impl StrategyOutcome {
    #[must_use]
    pub const fn success(strategy: StrategyKind, documents: Vec<Document>, duration_ms: u64) -> Self {
        Self {
            strategy,
            documents,
            duration_ms,
            succeeded: true,
            error: None,
            error_code: None,
            timed_out: false,
        }
    }

    /// Failed outcome carrying `err`'s message and code.
    #[must_use]
    pub fn from_error(strategy: StrategyKind, err: &RecallError, duration_ms: u64) -> Self {
        Self {
            strategy,
            documents: Vec::new(),
            duration_ms,
            succeeded: false,
            error: Some(err.to_string()),
            error_code: Some(err.code()),
            timed_out: matches!(err, RecallError::StrategyTimeout { .. }),
        }
    }

    #[must_use]
    pub fn failure(strategy: StrategyKind, message: impl Into<String>, duration_ms: u64) -> Self {
        let err = RecallError::StrategyFailure {
            strategy: strategy.as_str().to_string(),
            message: message.into(),
        };
        Self::from_error(strategy, &err, duration_ms)
    }

    #[must_use]
    pub fn timeout(strategy: StrategyKind, timeout_ms: u64, duration_ms: u64) -> Self {
        let err = RecallError::StrategyTimeout {
            strategy: strategy.as_str().to_string(),
            timeout_ms,
        };
        Self::from_error(strategy, &err, duration_ms)
    }

    /// Top document of a successful outcome
    #[must_use]
    pub fn top(&self) -> Option<&Document> {
        if self.succeeded {
            self.documents.first()
        } else {
            None
        }
    }
}
