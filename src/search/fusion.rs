//! RRF (Reciprocal Rank Fusion) across strategy outcomes
//!
//! Merges the ranked lists of every successful strategy into one list keyed
//! by document id. Native scores are not comparable across strategies, so
//! only ranks matter.
//!
//! ## Algorithm
//!
//! RRF score for document d:
//! ```text
//! RRF(d) = Σ 1 / (k + rank_i(d))
//! ```
//!
//! Where:
//! - k is a smoothing constant (default 60)
//! - rank_i(d) is the 1-indexed position of d in strategy list i
//!
//! Ties on the summed score fall back to the best individual rank, then to
//! the earliest appearance (outcome order, then rank), then to the id, so the
//! output never depends on which strategy finished first.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::result::FusedDocument;
use super::strategy::StrategyOutcome;

/// Reciprocal Rank Fusion configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    /// K parameter (smoothing constant, default: 60)
    /// Higher values reduce the impact of rank differences
    pub k: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { k: 60.0 }
    }
}

impl FusionConfig {
    /// Create config with custom k value
    #[must_use]
    pub const fn with_k(k: f64) -> Self {
        Self { k }
    }

    /// Contribution of a 1-indexed rank
    #[must_use]
    pub fn contribution(&self, rank: usize) -> f64 {
        1.0 / (self.k + rank_to_f64(rank))
    }
}

#[allow(clippy::cast_precision_loss)]
const fn rank_to_f64(rank: usize) -> f64 {
    rank as f64
}

struct Accumulator {
    entry: FusedDocument,
    best_rank: usize,
    first_seen: (usize, usize),
}

/// Fuse outcomes into at most `limit` deduplicated documents.
///
/// Failed and timed-out outcomes contribute nothing. Within one list only the
/// first occurrence of an id counts.
#[must_use]
pub fn fuse(outcomes: &[StrategyOutcome], limit: usize, config: &FusionConfig) -> Vec<FusedDocument> {
    let mut scores: HashMap<&str, Accumulator> = HashMap::new();

    for (outcome_idx, outcome) in outcomes.iter().enumerate() {
        if !outcome.succeeded {
            continue;
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for (idx, doc) in outcome.documents.iter().enumerate() {
            if !seen.insert(doc.id.as_str()) {
                continue;
            }
            let rank = idx + 1;
            let contribution = config.contribution(rank);

            scores
                .entry(doc.id.as_str())
                .and_modify(|acc| {
                    acc.entry.fused_score += contribution;
                    if !acc.entry.found_by.contains(&outcome.strategy) {
                        acc.entry.found_by.push(outcome.strategy);
                    }
                    acc.entry
                        .ranks
                        .entry(outcome.strategy)
                        .and_modify(|r| *r = (*r).min(rank))
                        .or_insert(rank);
                    if rank < acc.best_rank {
                        acc.best_rank = rank;
                        acc.entry.document = doc.clone();
                    }
                })
                .or_insert_with(|| Accumulator {
                    entry: FusedDocument {
                        document: doc.clone(),
                        fused_score: contribution,
                        found_by: vec![outcome.strategy],
                        ranks: BTreeMap::from([(outcome.strategy, rank)]),
                    },
                    best_rank: rank,
                    first_seen: (outcome_idx, rank),
                });
        }
    }

    let mut fused: Vec<Accumulator> = scores.into_values().collect();
    fused.sort_by(|a, b| {
        b.entry
            .fused_score
            .total_cmp(&a.entry.fused_score)
            .then_with(|| a.best_rank.cmp(&b.best_rank))
            .then_with(|| a.first_seen.cmp(&b.first_seen))
            .then_with(|| a.entry.document.id.cmp(&b.entry.document.id))
    });

    fused.into_iter().take(limit).map(|acc| acc.entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{Document, MemoryLayer, StrategyKind};

    fn doc(id: &str) -> Document {
        Document::new(id, format!("content {id}"), 0.3, MemoryLayer::Transcripts)
    }

    fn ok(kind: StrategyKind, ids: &[&str]) -> StrategyOutcome {
        StrategyOutcome::success(kind, ids.iter().map(|id| doc(id)).collect(), 1)
    }

    fn ids(fused: &[FusedDocument]) -> Vec<&str> {
        fused.iter().map(|f| f.document.id.as_str()).collect()
    }

    #[test]
    fn shared_document_ranks_first() {
        let outcomes = vec![
            ok(StrategyKind::DirectFts, &["a", "b"]),
            ok(StrategyKind::Semantic, &["b", "c"]),
        ];
        let fused = fuse(&outcomes, 10, &FusionConfig::default());

        assert_eq!(ids(&fused), vec!["b", "a", "c"]);
        let expected_b = 1.0 / 62.0 + 1.0 / 61.0;
        assert!((fused[0].fused_score - expected_b).abs() < 1e-12);
        assert_eq!(
            fused[0].found_by,
            vec![StrategyKind::DirectFts, StrategyKind::Semantic]
        );
        assert_eq!(fused[0].ranks[&StrategyKind::DirectFts], 2);
        assert_eq!(fused[0].ranks[&StrategyKind::Semantic], 1);
    }

    #[test]
    fn equal_scores_break_on_earliest_appearance() {
        let outcomes = vec![
            ok(StrategyKind::DirectFts, &["x"]),
            ok(StrategyKind::Semantic, &["y"]),
        ];
        let fused = fuse(&outcomes, 10, &FusionConfig::default());
        assert_eq!(ids(&fused), vec!["x", "y"]);

        let reversed = vec![
            ok(StrategyKind::Semantic, &["y"]),
            ok(StrategyKind::DirectFts, &["x"]),
        ];
        let fused = fuse(&reversed, 10, &FusionConfig::default());
        assert_eq!(ids(&fused), vec!["y", "x"]);
    }

    #[test]
    fn failed_outcomes_contribute_nothing() {
        let mut failed = ok(StrategyKind::Semantic, &["z"]);
        failed.succeeded = false;
        let outcomes = vec![ok(StrategyKind::DirectFts, &["a"]), failed];

        let fused = fuse(&outcomes, 10, &FusionConfig::default());
        assert_eq!(ids(&fused), vec!["a"]);
    }

    #[test]
    fn repeated_id_counts_once_per_list() {
        let outcomes = vec![ok(StrategyKind::DirectFts, &["a", "b", "a"])];
        let fused = fuse(&outcomes, 10, &FusionConfig::default());

        assert_eq!(ids(&fused), vec!["a", "b"]);
        assert!((fused[0].fused_score - 1.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn keeps_best_ranked_copy_of_document() {
        let mut late = doc("a");
        late.content = "second copy".to_string();
        let outcomes = vec![
            StrategyOutcome::success(StrategyKind::DirectFts, vec![doc("q"), late], 1),
            ok(StrategyKind::Semantic, &["a"]),
        ];
        let fused = fuse(&outcomes, 10, &FusionConfig::default());
        let a = fused.iter().find(|f| f.document.id == "a").unwrap();
        assert_eq!(a.document.content, "content a");
    }

    #[test]
    fn truncates_to_limit() {
        let outcomes = vec![ok(StrategyKind::DirectFts, &["a", "b", "c", "d"])];
        let fused = fuse(&outcomes, 2, &FusionConfig::default());
        assert_eq!(ids(&fused), vec!["a", "b"]);
        assert!(fuse(&outcomes, 0, &FusionConfig::default()).is_empty());
    }

    #[test]
    fn no_successes_is_empty() {
        let outcomes = vec![StrategyOutcome::timeout(StrategyKind::DirectFts, 10, 10)];
        assert!(fuse(&outcomes, 10, &FusionConfig::default()).is_empty());
        assert!(fuse(&[], 10, &FusionConfig::default()).is_empty());
    }

    #[test]
    fn corroboration_beats_single_top_rank_for_any_k() {
        for k in [0.5, 1.0, 10.0, 60.0, 1000.0] {
            let outcomes = vec![
                ok(StrategyKind::DirectFts, &["solo", "both"]),
                ok(StrategyKind::Semantic, &["both"]),
                ok(StrategyKind::Summaries, &["both"]),
            ];
            let fused = fuse(&outcomes, 10, &FusionConfig::with_k(k));
            assert_eq!(fused[0].document.id, "both", "k = {k}");
        }
    }
}
