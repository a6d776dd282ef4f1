use insta::assert_snapshot;

use recall::search::MemoryLayer;
use recall::search::fallback::clarification_prompt;

#[test]
fn test_clarification_prompt_text() {
    assert_snapshot!(
        clarification_prompt("  flaky deploy ", MemoryLayer::Transcripts),
        @r#"No confident matches for "flaky deploy" in the transcripts layer. Try a narrower query that names a specific file, function, error message or date, or search a different layer."#
    );
}
