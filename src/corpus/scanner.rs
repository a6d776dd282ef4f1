//! Unindexed scans over session files, used by the fallback chain

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use memchr::memmem;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::transcripts::{self, ParsedLine};
use crate::error::{RecallError, Result};
use crate::search::{BruteForceScanner, Document, RecencyScanner, ScanOutcome};

/// Cap on files walked by the brute-force scan
const MAX_SCAN_FILES: usize = 10_000;

/// Scans raw JSONL session files under one root
#[derive(Debug, Clone)]
pub struct SessionScanner {
    root: PathBuf,
    recency_files: usize,
}

impl SessionScanner {
    pub fn new(root: impl Into<PathBuf>, recency_files: usize) -> Self {
        Self {
            root: root.into(),
            recency_files: recency_files.max(1),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Messages of the newest files, scored by the share of query terms they
    /// contain.
    pub fn recent_blocking(
        &self,
        query_hint: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome> {
        let terms = query_terms(query_hint);
        if terms.is_empty() || limit == 0 {
            return Ok(ScanOutcome::empty());
        }

        let files = transcripts::session_files(&self.root, self.recency_files);
        let mut scored: Vec<(f32, usize, Document)> = Vec::new();
        let mut units_scanned = 0;
        let mut order = 0;

        for path in &files {
            if cancel.is_cancelled() {
                return Err(RecallError::Cancelled("recency scan".to_string()));
            }
            units_scanned += 1;
            let records = match transcripts::parse_session(path) {
                Ok(records) => records,
                Err(err) => {
                    debug!(path = %path.display(), error = %err, "skipping unreadable session");
                    continue;
                }
            };
            for doc in records.messages {
                let overlap = term_overlap(&terms, &doc.content);
                if overlap > 0.0 {
                    scored.push((overlap, order, doc.with_score(overlap)));
                }
                order += 1;
            }
        }

        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        let truncated = scored.len() > limit;
        scored.truncate(limit);

        Ok(ScanOutcome {
            documents: scored.into_iter().map(|(_, _, doc)| doc).collect(),
            units_scanned,
            truncated,
        })
    }

    /// Linear scan of every session file, newest first. A line matches when
    /// it contains every query term. Stops at the deadline, at `limit` hits,
    /// or on cancellation (checked between files and between lines).
    pub fn all_blocking(
        &self,
        query: &str,
        limit: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome> {
        let terms = query_terms(query);
        if terms.is_empty() || limit == 0 {
            return Ok(ScanOutcome::empty());
        }
        let finders: Vec<memmem::Finder<'_>> = terms
            .iter()
            .map(|term| memmem::Finder::new(term.as_bytes()))
            .collect();

        let deadline = Instant::now() + timeout;
        let files = transcripts::session_files(&self.root, MAX_SCAN_FILES);
        let mut outcome = ScanOutcome::empty();
        let mut seen = HashSet::new();

        'files: for path in &files {
            if cancel.is_cancelled() {
                return Err(RecallError::Cancelled("brute-force scan".to_string()));
            }
            if Instant::now() >= deadline {
                outcome.truncated = true;
                break;
            }
            outcome.units_scanned += 1;

            let Ok(raw) = std::fs::read_to_string(path) else {
                continue;
            };
            let session_id = transcripts::session_id_for(path);

            for (idx, line) in raw.lines().enumerate() {
                if cancel.is_cancelled() {
                    return Err(RecallError::Cancelled("brute-force scan".to_string()));
                }
                let lowered = line.to_lowercase();
                if !finders
                    .iter()
                    .all(|finder| finder.find(lowered.as_bytes()).is_some())
                {
                    continue;
                }

                let doc = match transcripts::parse_line(&session_id, path, idx + 1, line) {
                    Some(ParsedLine::Message(doc) | ParsedLine::Summary(doc)) => doc,
                    None => continue,
                };
                if !seen.insert(doc.id.clone()) {
                    continue;
                }
                outcome.documents.push(doc.with_score(1.0));

                if outcome.documents.len() >= limit {
                    outcome.truncated = true;
                    break 'files;
                }
                if Instant::now() >= deadline {
                    outcome.truncated = true;
                    break 'files;
                }
            }
        }

        Ok(outcome)
    }
}

#[async_trait]
impl RecencyScanner for SessionScanner {
    async fn scan_recent(
        &self,
        query_hint: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome> {
        let scanner = self.clone();
        let query = query_hint.to_string();
        let token = cancel.clone();
        tokio::task::spawn_blocking(move || scanner.recent_blocking(&query, limit, &token))
            .await
            .map_err(|err| RecallError::Internal(format!("recency scan task failed: {err}")))?
    }
}

#[async_trait]
impl BruteForceScanner for SessionScanner {
    async fn scan_all(
        &self,
        query: &str,
        limit: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome> {
        let scanner = self.clone();
        let query = query.to_string();
        let token = cancel.clone();
        tokio::task::spawn_blocking(move || scanner.all_blocking(&query, limit, timeout, &token))
            .await
            .map_err(|err| RecallError::Internal(format!("brute-force scan task failed: {err}")))?
    }
}

/// Distinct lowercased alphanumeric terms
fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|term| !term.is_empty())
        .map(str::to_lowercase)
        .filter(|term| seen.insert(term.clone()))
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn term_overlap(terms: &[String], content: &str) -> f32 {
    let lowered = content.to_lowercase();
    let hits = terms
        .iter()
        .filter(|term| memmem::find(lowered.as_bytes(), term.as_bytes()).is_some())
        .count();
    hits as f32 / terms.len() as f32
}
