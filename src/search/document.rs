//! Retrieval hits produced by strategy back-ends

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::layer::MemoryLayer;

/// Well-known metadata keys set by the bundled back-ends.
pub mod meta {
    pub const SESSION_ID: &str = "session_id";
    pub const AUTHOR: &str = "author";
    pub const TIMESTAMP: &str = "timestamp";
    pub const FILE_PATH: &str = "file_path";
    pub const TITLE: &str = "title";
    pub const ROLE: &str = "role";
    pub const LINE: &str = "line";
}

/// An opaque retrieval hit.
///
/// `score` is strategy-local: it is not comparable across strategies and
/// plays no role in fusion. The bundled back-ends report it on a 0–1 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Identity, unique within its source
    pub id: String,
    /// Text excerpt
    pub content: String,
    /// Strategy-local relevance
    pub score: f32,
    /// Layer this hit belongs to
    pub layer: MemoryLayer,
    /// Open key/value metadata (session id, author, timestamp, path, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Optional deep link
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_url: Option<String>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        score: f32,
        layer: MemoryLayer,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score,
            layer,
            metadata: BTreeMap::new(),
            browse_url: None,
        }
    }

    /// Builder: attach a metadata entry
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Builder: attach a deep link
    #[must_use]
    pub fn with_browse_url(mut self, url: impl Into<String>) -> Self {
        self.browse_url = Some(url.into());
        self
    }

    /// Builder: replace the strategy-local score
    #[must_use]
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Shortened content for display, cut on a char boundary.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> String {
        let trimmed = self.content.trim();
        if trimmed.chars().count() <= max_chars {
            return trimmed.to_string();
        }
        let mut out: String = trimmed.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}
