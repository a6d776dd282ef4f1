use insta::assert_snapshot;

use recall::error::RecallError;

#[test]
fn test_error_empty_query() {
    assert_snapshot!(
        RecallError::EmptyQuery.to_string(),
        @"Invalid argument: query must not be empty"
    );
}

#[test]
fn test_error_unknown_layer() {
    let err = "wiki".parse::<recall::search::MemoryLayer>().unwrap_err();
    assert_snapshot!(err.to_string(), @"Unknown layer: wiki");
}

#[test]
fn test_error_unknown_strategy() {
    let err = "bm42".parse::<recall::search::StrategyKind>().unwrap_err();
    assert_snapshot!(err.to_string(), @"Unknown strategy: bm42");
}

#[test]
fn test_error_strategy_timeout() {
    let err = RecallError::StrategyTimeout {
        strategy: "semantic".to_string(),
        timeout_ms: 5000,
    };
    assert_snapshot!(err.to_string(), @"Strategy semantic timed out after 5000ms");
}

#[test]
fn test_error_expansion_level() {
    let err = "huge".parse::<recall::search::ExpansionLevel>().unwrap_err();
    assert_snapshot!(
        err.to_string(),
        @"Invalid argument: unknown expansion level 'huge' (expected none, minimal, full)"
    );
}

#[test]
fn test_structured_error_display() {
    assert_snapshot!(
        RecallError::EmptyQuery.to_structured().to_string(),
        @"[E101] Invalid argument: query must not be empty"
    );
}
