//! Confidence signal from strategy agreement

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::result::FusedDocument;
use super::strategy::StrategyOutcome;
use crate::config::ConfidenceConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Score a fused answer set. First matching rule wins:
///
/// 1. `High` when at least two strategies succeeded and some id sits in the
///    top-N of `min_corroborating_strategies` of them.
/// 2. `High` when exactly one strategy succeeded and its top hit's native
///    score exceeds `high_score_threshold`.
/// 3. `Medium` when any strategy succeeded with at least one document.
/// 4. `Low` otherwise, including an empty fused list.
#[must_use]
pub fn score(
    outcomes: &[StrategyOutcome],
    fused: &[FusedDocument],
    config: &ConfidenceConfig,
) -> Confidence {
    if fused.is_empty() {
        return Confidence::Low;
    }

    let succeeded: Vec<&StrategyOutcome> = outcomes.iter().filter(|o| o.succeeded).collect();

    if succeeded.len() >= 2 && is_corroborated(&succeeded, config) {
        return Confidence::High;
    }

    if succeeded.len() == 1 {
        if let Some(top) = succeeded[0].documents.first() {
            if top.score > config.high_score_threshold {
                return Confidence::High;
            }
        }
    }

    if succeeded.iter().any(|o| !o.documents.is_empty()) {
        return Confidence::Medium;
    }

    Confidence::Low
}

fn is_corroborated(succeeded: &[&StrategyOutcome], config: &ConfidenceConfig) -> bool {
    let mut votes: HashMap<&str, usize> = HashMap::new();
    for outcome in succeeded {
        let mut seen = HashSet::new();
        for doc in outcome.documents.iter().take(config.corroboration_top_n) {
            if seen.insert(doc.id.as_str()) {
                *votes.entry(doc.id.as_str()).or_default() += 1;
            }
        }
    }
    votes
        .values()
        .any(|count| *count >= config.min_corroborating_strategies)
}
