//! Scripted back-ends for driving the coordinator end to end.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use recall::config::Config;
use recall::search::{
    Document, LayerBinding, LayerRegistry, MemoryLayer, RecencyScanner, ScanOutcome,
    SearchAdapter, SearchCoordinator,
};
use recall::{RecallError, Result};

pub fn doc(id: &str, score: f32) -> Document {
    Document::new(id, format!("content of {id}"), score, MemoryLayer::Transcripts)
}

/// Returns a fixed ranked list, optionally after a delay.
pub struct ListAdapter {
    name: String,
    documents: Vec<Document>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ListAdapter {
    pub fn new(name: &str, ids: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            documents: ids.iter().map(|id| doc(id, 0.9)).collect(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(name: &str, ids: &[&str], delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(name, ids)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchAdapter for ListAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        _query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::select! {
                () = cancel.cancelled() => {
                    return Err(RecallError::Cancelled(self.name.clone()));
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
        Ok(self.documents.iter().take(limit).cloned().collect())
    }
}

/// Recency scanner with a canned answer
pub struct FixedRecency(pub Vec<Document>);

#[async_trait]
impl RecencyScanner for FixedRecency {
    async fn scan_recent(
        &self,
        _query_hint: &str,
        limit: usize,
        _cancel: &CancellationToken,
    ) -> Result<ScanOutcome> {
        Ok(ScanOutcome {
            documents: self.0.iter().take(limit).cloned().collect(),
            units_scanned: 1,
            truncated: false,
        })
    }
}

/// Transcripts layer with keyword hits `[A, B]` and semantic hits `[B, C]`.
pub fn auth_flow_coordinator() -> SearchCoordinator {
    let binding = LayerBinding::new()
        .with_fts(Arc::new(ListAdapter::new("fts", &["A", "B"])))
        .with_vector(Arc::new(ListAdapter::new("vector", &["B", "C"])));
    let registry = LayerRegistry::new().bind(MemoryLayer::Transcripts, binding);
    SearchCoordinator::new(registry, &Config::default())
}

/// Transcripts layer where every bound strategy finds nothing.
pub fn empty_coordinator() -> SearchCoordinator {
    let binding = LayerBinding::new()
        .with_fts(Arc::new(ListAdapter::new("fts", &[])))
        .with_vector(Arc::new(ListAdapter::new("vector", &[])));
    let registry = LayerRegistry::new().bind(MemoryLayer::Transcripts, binding);
    SearchCoordinator::new(registry, &Config::default())
}
