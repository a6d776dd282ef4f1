use std::collections::HashSet;

use proptest::prelude::*;

use recall::config::ConfidenceConfig;
use recall::search::confidence;
use recall::search::{
    Confidence, Document, FusionConfig, MemoryLayer, StrategyKind, StrategyOutcome, fuse,
};

fn arb_kind() -> impl Strategy<Value = StrategyKind> {
    prop_oneof![
        Just(StrategyKind::DirectFts),
        Just(StrategyKind::ExpandedFts),
        Just(StrategyKind::Semantic),
        Just(StrategyKind::Summaries),
    ]
}

fn arb_outcome() -> impl Strategy<Value = StrategyOutcome> {
    (
        arb_kind(),
        prop::collection::vec("[a-h]", 0..8),
        any::<bool>(),
    )
        .prop_map(|(kind, ids, succeeded)| {
            if succeeded {
                let documents = ids
                    .iter()
                    .map(|id| Document::new(id.clone(), "x", 0.3, MemoryLayer::Transcripts))
                    .collect();
                StrategyOutcome::success(kind, documents, 1)
            } else {
                StrategyOutcome::failure(kind, "down", 1)
            }
        })
}

fn ids(docs: &[recall::search::FusedDocument]) -> Vec<String> {
    docs.iter().map(|d| d.document.id.clone()).collect()
}

proptest! {
    #[test]
    fn fusion_is_deterministic_and_deduplicated(
        outcomes in prop::collection::vec(arb_outcome(), 0..5),
        limit in 1usize..12,
        k in 1.0f64..200.0,
    ) {
        let config = FusionConfig::with_k(k);
        let first = fuse(&outcomes, limit, &config);
        let second = fuse(&outcomes, limit, &config);
        prop_assert_eq!(ids(&first), ids(&second));
        prop_assert!(first.len() <= limit);

        let unique: HashSet<_> = first.iter().map(|d| d.document.id.clone()).collect();
        prop_assert_eq!(unique.len(), first.len());

        for pair in first.windows(2) {
            prop_assert!(pair[0].fused_score >= pair[1].fused_score);
        }
    }

    #[test]
    fn zero_successes_mean_low_confidence(
        kinds in prop::collection::vec(arb_kind(), 0..4),
    ) {
        let outcomes: Vec<_> = kinds
            .into_iter()
            .map(|kind| StrategyOutcome::failure(kind, "down", 1))
            .collect();
        let fused = fuse(&outcomes, 10, &FusionConfig::default());
        prop_assert!(fused.is_empty());
        prop_assert_eq!(
            confidence::score(&outcomes, &fused, &ConfidenceConfig::default()),
            Confidence::Low
        );
    }

    #[test]
    fn two_first_places_beat_one_for_any_k(k in 0.001f64..1_000_000.0) {
        let doc = |id: &str| Document::new(id, "x", 0.1, MemoryLayer::Transcripts);
        let outcomes = vec![
            StrategyOutcome::success(StrategyKind::DirectFts, vec![doc("solo"), doc("both")], 1),
            StrategyOutcome::success(StrategyKind::Semantic, vec![doc("both")], 1),
        ];
        let fused = fuse(&outcomes, 10, &FusionConfig::with_k(k));
        prop_assert_eq!(fused[0].document.id.as_str(), "both");
    }
}
