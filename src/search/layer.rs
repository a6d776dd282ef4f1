//! Memory layers
//!
//! A layer is a logical knowledge partition. Each layer is bound to its own
//! set of retrieval back-ends in a [`LayerRegistry`](super::LayerRegistry).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RecallError;

/// Logical knowledge partition searched by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryLayer {
    /// Project conventions (CLAUDE.md, rules files)
    Rules,
    /// Past conversation transcripts
    Transcripts,
    /// Generated session summaries
    Summaries,
    /// Team / version-control history
    Team,
}

impl MemoryLayer {
    pub const ALL: [Self; 4] = [Self::Rules, Self::Transcripts, Self::Summaries, Self::Team];

    /// Convert to string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rules => "rules",
            Self::Transcripts => "transcripts",
            Self::Summaries => "summaries",
            Self::Team => "team",
        }
    }
}

impl FromStr for MemoryLayer {
    type Err = RecallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rules" | "conventions" => Ok(Self::Rules),
            "transcripts" | "sessions" => Ok(Self::Transcripts),
            "summaries" => Ok(Self::Summaries),
            "team" | "git" | "history" => Ok(Self::Team),
            other => Err(RecallError::UnknownLayer(other.to_string())),
        }
    }
}

impl std::fmt::Display for MemoryLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
