use proptest::prelude::*;

use recall::search::{ExpansionLevel, expand};

fn arb_level() -> impl Strategy<Value = ExpansionLevel> {
    prop_oneof![
        Just(ExpansionLevel::None),
        Just(ExpansionLevel::Minimal),
        Just(ExpansionLevel::Full),
    ]
}

fn arb_query() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("pr".to_string()),
            Just("CI".to_string()),
            Just("auth".to_string()),
            Just("db".to_string()),
            Just("refactor".to_string()),
            "[a-z]{1,8}",
        ],
        1..6,
    )
    .prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn expansion_only_appends(query in arb_query(), level in arb_level()) {
        let expanded = expand(&query, level);
        prop_assert!(expanded.starts_with(&query));
    }

    #[test]
    fn expansion_is_idempotent(query in arb_query(), level in arb_level()) {
        let once = expand(&query, level);
        prop_assert_eq!(expand(&once, level), once);
    }

    #[test]
    fn level_none_is_identity(query in arb_query()) {
        prop_assert_eq!(expand(&query, ExpansionLevel::None), query);
    }
}
