use tempfile::TempDir;

use recall::app::build_coordinator;
use recall::RecallError;
use recall::config::{Config, SearchConfig, SourcesConfig};
use recall::search::{
    Confidence, FallbackKind, FallbackOptions, MemoryLayer, SearchRequest, StrategyKind,
};

fn message(uuid: &str, role: &str, text: &str) -> String {
    serde_json::json!({
        "type": role,
        "uuid": uuid,
        "sessionId": "s1",
        "message": {"role": role, "content": text},
    })
    .to_string()
}

fn workspace() -> (TempDir, Config) {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("project");
    let sessions = temp.path().join("sessions");
    std::fs::create_dir_all(project.join(".claude/rules")).unwrap();
    std::fs::create_dir_all(&sessions).unwrap();

    std::fs::write(
        project.join("CLAUDE.md"),
        "# Conventions\nAlways run cargo fmt before committing.",
    )
    .unwrap();
    std::fs::write(
        project.join(".claude/rules/errors.md"),
        "---\ntitle: Errors\n---\nPropagate errors with thiserror enums.",
    )
    .unwrap();

    let lines = [
        message("m1", "user", "The deploy script for the worker keeps failing"),
        message("m2", "assistant", "The worker deploy needs the staging credentials"),
        message("m3", "user", "Unrelated question about lunch"),
        serde_json::json!({
            "type": "summary",
            "summary": "Fixing the worker deploy script",
            "leafUuid": "m2"
        })
        .to_string(),
    ];
    std::fs::write(sessions.join("s1.jsonl"), lines.join("\n")).unwrap();

    let config = Config {
        sources: SourcesConfig {
            sessions_dir: Some(sessions),
            git: false,
            ..SourcesConfig::default()
        },
        ..Config::default()
    };
    (temp, config)
}

fn project(temp: &TempDir) -> std::path::PathBuf {
    temp.path().join("project")
}

#[tokio::test]
async fn transcripts_search_over_real_indexes() {
    let (temp, config) = workspace();
    let coordinator = build_coordinator(&config, &project(&temp)).unwrap();

    let result = coordinator
        .search(&SearchRequest::new("worker deploy"))
        .await
        .unwrap();

    let ids: Vec<&str> = result.ids().collect();
    assert!(ids.contains(&"m1"));
    assert!(ids.contains(&"m2"));
    assert!(result.strategies_attempted.contains(&StrategyKind::DirectFts));
    assert!(result.strategies_attempted.contains(&StrategyKind::Summaries));
    assert!(result.outcome(StrategyKind::DirectFts).unwrap().succeeded);
    assert_ne!(result.confidence, Confidence::Low);
}

#[tokio::test]
async fn rules_layer_finds_conventions() {
    let (temp, config) = workspace();
    let coordinator = build_coordinator(&config, &project(&temp)).unwrap();

    let result = coordinator
        .search(&SearchRequest::new("thiserror").layer(MemoryLayer::Rules))
        .await
        .unwrap();

    assert_eq!(
        result.documents[0].document.id,
        "rules:.claude/rules/errors.md"
    );
}

#[tokio::test]
async fn oversized_limit_is_an_argument_error() {
    let (temp, config) = workspace();
    let coordinator = build_coordinator(&config, &project(&temp)).unwrap();

    let err = coordinator
        .search(&SearchRequest::new("deploy").layer(MemoryLayer::Rules).limit(1 << 40))
        .await
        .unwrap_err();

    assert!(matches!(err, RecallError::InvalidArgument(_)));
    assert!(err.is_argument_error());
}

#[tokio::test]
async fn bm25_clamps_limit_to_index_size() {
    let (temp, config) = workspace();
    let config = Config {
        search: SearchConfig {
            max_limit: usize::MAX,
            ..SearchConfig::default()
        },
        ..config
    };
    let coordinator = build_coordinator(&config, &project(&temp)).unwrap();

    let result = coordinator
        .search(
            &SearchRequest::new("thiserror")
                .layer(MemoryLayer::Rules)
                .limit(1 << 40),
        )
        .await
        .unwrap();

    assert!(result.outcome(StrategyKind::DirectFts).unwrap().succeeded);
    assert_eq!(
        result.documents[0].document.id,
        "rules:.claude/rules/errors.md"
    );
}

#[tokio::test]
async fn unbound_layer_falls_back_to_recent_sessions() {
    let (temp, config) = workspace();
    let coordinator = build_coordinator(&config, &project(&temp)).unwrap();

    let plain = coordinator
        .search(&SearchRequest::new("staging credentials").layer(MemoryLayer::Team))
        .await
        .unwrap();
    assert!(plain.is_empty());
    assert!(plain.strategies_attempted.is_empty());
    assert_eq!(plain.confidence, Confidence::Low);

    let rescued = coordinator
        .search_with_fallbacks(
            &SearchRequest::new("staging credentials").layer(MemoryLayer::Team),
            &FallbackOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(rescued.fallbacks_used, vec![FallbackKind::RecencyScan]);
    assert_eq!(rescued.confidence, Confidence::Medium);
    assert_eq!(rescued.documents[0].document.id, "m2");
}

#[tokio::test]
async fn brute_force_scan_runs_when_recency_is_off() {
    let (temp, config) = workspace();
    let coordinator = build_coordinator(&config, &project(&temp)).unwrap();
    let options = FallbackOptions::default()
        .with_recency(false)
        .with_brute_force(true);

    let result = coordinator
        .search_with_fallbacks(
            &SearchRequest::new("lunch").layer(MemoryLayer::Team),
            &options,
        )
        .await
        .unwrap();

    assert_eq!(result.fallbacks_attempted, vec![FallbackKind::BruteForce]);
    assert_eq!(result.ids().collect::<Vec<_>>(), vec!["m3"]);
    assert_eq!(result.confidence, Confidence::Low);
}

#[test]
fn missing_sessions_root_still_builds() {
    let temp = TempDir::new().unwrap();
    let config = Config {
        sources: SourcesConfig {
            sessions_dir: Some(temp.path().join("nowhere")),
            git: false,
            ..SourcesConfig::default()
        },
        ..Config::default()
    };
    let coordinator = build_coordinator(&config, temp.path()).unwrap();
    assert_eq!(coordinator.registry().layers().count(), 0);
}
