//! Local knowledge sources for the bundled back-ends
//!
//! Loads one document set per memory layer from the filesystem: rules
//! markdown, transcript JSONL, summary records inside those transcripts, and
//! git history.

pub mod rules;
pub mod scanner;
pub mod team;
pub mod transcripts;

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::SourcesConfig;
use crate::search::{Document, MemoryLayer};

pub use scanner::SessionScanner;

/// Documents per layer
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub rules: Vec<Document>,
    pub transcripts: Vec<Document>,
    pub summaries: Vec<Document>,
    pub team: Vec<Document>,
}

impl Corpus {
    #[must_use]
    pub fn layer(&self, layer: MemoryLayer) -> &[Document] {
        match layer {
            MemoryLayer::Rules => &self.rules,
            MemoryLayer::Transcripts => &self.transcripts,
            MemoryLayer::Summaries => &self.summaries,
            MemoryLayer::Team => &self.team,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        MemoryLayer::ALL.iter().map(|l| self.layer(*l).len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads every configured source under a project root
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    project_root: PathBuf,
    sources: SourcesConfig,
}

impl CorpusLoader {
    pub fn new(project_root: impl Into<PathBuf>, sources: SourcesConfig) -> Self {
        Self {
            project_root: project_root.into(),
            sources,
        }
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Load all layers. Unreadable sources are logged and skipped.
    #[must_use]
    pub fn load(&self) -> Corpus {
        let mut corpus = Corpus {
            rules: rules::load_rules(&self.project_root),
            ..Corpus::default()
        };

        if let Some(root) = self.sources.sessions_root() {
            let files = transcripts::session_files(&root, self.sources.max_sessions);
            debug!(root = %root.display(), files = files.len(), "loading sessions");

            let parsed: Vec<transcripts::SessionRecords> = files
                .par_iter()
                .filter_map(|path| match transcripts::parse_session(path) {
                    Ok(records) => Some(records),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "skipping session file");
                        None
                    }
                })
                .collect();

            for records in parsed {
                corpus.transcripts.extend(records.messages);
                corpus.summaries.extend(records.summaries);
            }
        }

        if self.sources.git {
            match team::load_commits(&self.project_root, self.sources.max_commits) {
                Ok(commits) => corpus.team = commits,
                Err(err) => debug!(error = %err, "team history unavailable"),
            }
        }

        info!(
            rules = corpus.rules.len(),
            transcripts = corpus.transcripts.len(),
            summaries = corpus.summaries.len(),
            team = corpus.team.len(),
            "corpus loaded"
        );
        corpus
    }
}
