//! Engine output types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::confidence::Confidence;
use super::document::Document;
use super::fallback::{FallbackKind, FallbackRecord};
use super::layer::MemoryLayer;
use super::strategy::{StrategyKind, StrategyOutcome};

/// One deduplicated entry of the fused list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedDocument {
    /// Best-ranked copy of the hit
    pub document: Document,
    /// Summed RRF contributions
    pub fused_score: f64,
    /// Strategies that returned this id, in outcome order
    pub found_by: Vec<StrategyKind>,
    /// 1-indexed rank per strategy
    pub ranks: BTreeMap<StrategyKind, usize>,
}

impl FusedDocument {
    /// Wrap a fallback hit, which carries no strategy provenance.
    #[must_use]
    pub fn unranked(document: Document) -> Self {
        Self {
            document,
            fused_score: 0.0,
            found_by: Vec::new(),
            ranks: BTreeMap::new(),
        }
    }
}

/// Which coordinator operation produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    MultiStrategy,
    WithFallbacks,
}

impl SearchType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MultiStrategy => "multi_strategy",
            Self::WithFallbacks => "with_fallbacks",
        }
    }
}

/// Complete answer to one query, diagnostics included
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedResult {
    pub query: String,
    pub expanded_query: String,
    pub layer: MemoryLayer,
    pub search_type: SearchType,
    pub documents: Vec<FusedDocument>,
    pub confidence: Confidence,
    pub strategies_attempted: Vec<StrategyKind>,
    pub strategies_succeeded: Vec<StrategyKind>,
    pub strategy_outcomes: Vec<StrategyOutcome>,
    pub fallbacks_attempted: Vec<FallbackKind>,
    pub fallbacks_used: Vec<FallbackKind>,
    pub fallback_outcomes: Vec<FallbackRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clarification_prompt: Option<String>,
}

impl FusedResult {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Outcome of `kind`, when it was attempted
    #[must_use]
    pub fn outcome(&self, kind: StrategyKind) -> Option<&StrategyOutcome> {
        self.strategy_outcomes.iter().find(|o| o.strategy == kind)
    }

    /// Ids in ranked order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|d| d.document.id.as_str())
    }
}
