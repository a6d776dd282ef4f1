use std::sync::Arc;
use std::time::Duration;

use recall::RecallError;
use recall::config::Config;
use recall::search::{
    Confidence, FallbackKind, FallbackOptions, LayerBinding, LayerRegistry, MemoryLayer,
    SearchCoordinator, SearchRequest, SearchType, StrategyKind,
};

use crate::fixture::{FixedRecency, ListAdapter, auth_flow_coordinator, doc, empty_coordinator};

fn keyword_and_semantic(query: &str) -> SearchRequest {
    SearchRequest::new(query).strategies(vec![StrategyKind::DirectFts, StrategyKind::Semantic])
}

#[tokio::test]
async fn auth_flow_corroborated_hit_ranks_first() {
    let coordinator = auth_flow_coordinator();
    let result = coordinator
        .search(&keyword_and_semantic("auth flow"))
        .await
        .unwrap();

    assert_eq!(result.ids().collect::<Vec<_>>(), vec!["B", "A", "C"]);
    assert_eq!(result.confidence, Confidence::High);
    assert_eq!(result.search_type, SearchType::MultiStrategy);
    assert_eq!(result.layer, MemoryLayer::Transcripts);
    assert_eq!(
        result.strategies_succeeded,
        vec![StrategyKind::DirectFts, StrategyKind::Semantic]
    );

    let top = &result.documents[0];
    assert!((top.fused_score - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
    assert_eq!(top.found_by, vec![StrategyKind::DirectFts, StrategyKind::Semantic]);
}

#[tokio::test]
async fn empty_strategies_without_fallbacks_are_low_and_silent() {
    let result = empty_coordinator()
        .search(&keyword_and_semantic("anything"))
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.confidence, Confidence::Low);
    assert!(result.clarification_prompt.is_none());
    assert!(result.fallbacks_attempted.is_empty());
}

#[tokio::test]
async fn exhausted_fallbacks_ask_for_clarification() {
    let coordinator = empty_coordinator().with_recency_scanner(Arc::new(FixedRecency(Vec::new())));
    let options = FallbackOptions::default().with_brute_force(false);

    let result = coordinator
        .search_with_fallbacks(&keyword_and_semantic("deploy worker"), &options)
        .await
        .unwrap();

    assert_eq!(result.search_type, SearchType::WithFallbacks);
    assert!(result.is_empty());
    assert_eq!(result.confidence, Confidence::Low);
    assert_eq!(
        result.fallbacks_attempted,
        vec![FallbackKind::RecencyScan, FallbackKind::Clarification]
    );
    assert!(result.fallbacks_used.is_empty());
    let prompt = result.clarification_prompt.unwrap();
    assert!(prompt.contains("deploy worker"));
}

#[tokio::test]
async fn recency_hits_replace_empty_answer() {
    let coordinator = empty_coordinator()
        .with_recency_scanner(Arc::new(FixedRecency(vec![doc("R1", 0.5), doc("R2", 0.4)])));

    let result = coordinator
        .search_with_fallbacks(&keyword_and_semantic("deploy"), &FallbackOptions::default())
        .await
        .unwrap();

    assert_eq!(result.ids().collect::<Vec<_>>(), vec!["R1", "R2"]);
    assert_eq!(result.confidence, Confidence::Medium);
    assert_eq!(result.fallbacks_used, vec![FallbackKind::RecencyScan]);
    assert!(result.clarification_prompt.is_none());
}

#[tokio::test]
async fn empty_query_fails_before_any_strategy_runs() {
    let fts = Arc::new(ListAdapter::new("fts", &["A"]));
    let registry = LayerRegistry::new().bind(
        MemoryLayer::Transcripts,
        LayerBinding::new().with_fts(fts.clone()),
    );
    let coordinator = SearchCoordinator::new(registry, &Config::default());

    let err = coordinator.search(&SearchRequest::new("   ")).await.unwrap_err();
    assert!(matches!(err, RecallError::EmptyQuery));
    assert!(err.is_argument_error());
    assert_eq!(fts.calls(), 0);

    let err = coordinator
        .search_with_fallbacks(&SearchRequest::new(""), &FallbackOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecallError::EmptyQuery));
    assert_eq!(fts.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn timed_out_strategy_does_not_hold_back_siblings() {
    let registry = LayerRegistry::new().bind(
        MemoryLayer::Transcripts,
        LayerBinding::new()
            .with_fts(Arc::new(ListAdapter::new("fts", &["A", "B"])))
            .with_vector(Arc::new(ListAdapter::slow(
                "vector",
                &["C"],
                Duration::from_secs(30),
            ))),
    );
    let coordinator = SearchCoordinator::new(registry, &Config::default());

    let started = tokio::time::Instant::now();
    let result = coordinator
        .search(&keyword_and_semantic("auth").timeout(Duration::from_millis(100)))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(result.ids().collect::<Vec<_>>(), vec!["A", "B"]);
    let semantic = result.outcome(StrategyKind::Semantic).unwrap();
    assert!(semantic.timed_out);
    assert!(!semantic.succeeded);
    assert_eq!(result.strategies_succeeded, vec![StrategyKind::DirectFts]);
}

#[tokio::test(start_paused = true)]
async fn fused_order_ignores_completion_order() {
    let registry = LayerRegistry::new().bind(
        MemoryLayer::Transcripts,
        LayerBinding::new()
            .with_fts(Arc::new(ListAdapter::slow(
                "fts",
                &["A", "B"],
                Duration::from_millis(400),
            )))
            .with_vector(Arc::new(ListAdapter::new("vector", &["B", "C"]))),
    );
    let coordinator = SearchCoordinator::new(registry, &Config::default());

    let result = coordinator
        .search(&keyword_and_semantic("auth flow").timeout(Duration::from_secs(2)))
        .await
        .unwrap();

    let fts = result.outcome(StrategyKind::DirectFts).unwrap();
    let vector = result.outcome(StrategyKind::Semantic).unwrap();
    assert!(fts.succeeded);
    assert!(fts.duration_ms >= 400);
    assert!(vector.duration_ms < fts.duration_ms);

    let reference = auth_flow_coordinator()
        .search(&keyword_and_semantic("auth flow"))
        .await
        .unwrap();
    assert_eq!(result.ids().collect::<Vec<_>>(), vec!["B", "A", "C"]);
    assert_eq!(
        result.ids().collect::<Vec<_>>(),
        reference.ids().collect::<Vec<_>>()
    );
    assert_eq!(result.confidence, Confidence::High);
}

#[tokio::test]
async fn concurrent_queries_share_one_coordinator() {
    let coordinator = Arc::new(auth_flow_coordinator());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let coordinator = coordinator.clone();
            tokio::spawn(async move {
                coordinator
                    .search(&keyword_and_semantic("auth flow"))
                    .await
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.ids().collect::<Vec<_>>(), vec!["B", "A", "C"]);
    }
}
