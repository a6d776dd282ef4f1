//! Back-end contracts consumed by the engine
//!
//! Retrieval back-ends live behind [`SearchAdapter`]; the fallback scanners
//! behind [`RecencyScanner`] and [`BruteForceScanner`]. Every call receives a
//! cancellation token: the runner cancels it when the caller stops waiting, so
//! cooperative work (file scans, blocking index queries) can stop early.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::document::Document;
use super::layer::MemoryLayer;
use super::strategy::{Backend, StrategyKind};
use crate::error::Result;

/// Uniform contract over one retrieval back-end.
#[async_trait]
pub trait SearchAdapter: Send + Sync {
    /// Back-end name for diagnostics
    fn name(&self) -> &str;

    /// Return up to `limit` documents, best first.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>>;
}

/// Result of a fallback scan
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Hits, best first
    pub documents: Vec<Document>,
    /// Source units (files) examined
    pub units_scanned: usize,
    /// Scan stopped at its deadline or cap before covering every unit
    pub truncated: bool,
}

impl ScanOutcome {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            documents: Vec::new(),
            units_scanned: 0,
            truncated: false,
        }
    }
}

/// Bounded scan over the most recently modified source units.
#[async_trait]
pub trait RecencyScanner: Send + Sync {
    async fn scan_recent(
        &self,
        query_hint: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome>;
}

/// Unindexed linear scan over raw sources, most recent first.
#[async_trait]
pub trait BruteForceScanner: Send + Sync {
    async fn scan_all(
        &self,
        query: &str,
        limit: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome>;
}

/// Typed back-end handles serving one layer
#[derive(Clone, Default)]
pub struct LayerBinding {
    pub fts: Option<Arc<dyn SearchAdapter>>,
    pub vector: Option<Arc<dyn SearchAdapter>>,
    pub summaries: Option<Arc<dyn SearchAdapter>>,
}

impl LayerBinding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_fts(mut self, adapter: Arc<dyn SearchAdapter>) -> Self {
        self.fts = Some(adapter);
        self
    }

    #[must_use]
    pub fn with_vector(mut self, adapter: Arc<dyn SearchAdapter>) -> Self {
        self.vector = Some(adapter);
        self
    }

    #[must_use]
    pub fn with_summaries(mut self, adapter: Arc<dyn SearchAdapter>) -> Self {
        self.summaries = Some(adapter);
        self
    }

    /// Adapter serving `kind`, if bound
    #[must_use]
    pub fn adapter_for(&self, kind: StrategyKind) -> Option<Arc<dyn SearchAdapter>> {
        match kind.backend() {
            Backend::Fts => self.fts.clone(),
            Backend::Vector => self.vector.clone(),
            Backend::Summaries => self.summaries.clone(),
        }
    }

    /// Strategies this binding can serve, in canonical order
    #[must_use]
    pub fn applicable(&self) -> Vec<StrategyKind> {
        StrategyKind::ALL
            .into_iter()
            .filter(|kind| self.adapter_for(*kind).is_some())
            .collect()
    }
}

impl std::fmt::Debug for LayerBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerBinding")
            .field("fts", &self.fts.as_ref().map(|a| a.name().to_string()))
            .field("vector", &self.vector.as_ref().map(|a| a.name().to_string()))
            .field(
                "summaries",
                &self.summaries.as_ref().map(|a| a.name().to_string()),
            )
            .finish()
    }
}

/// Explicit layer → back-end mapping
#[derive(Clone, Debug, Default)]
pub struct LayerRegistry {
    bindings: BTreeMap<MemoryLayer, LayerBinding>,
}

impl LayerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: bind a layer, replacing any earlier binding
    #[must_use]
    pub fn bind(mut self, layer: MemoryLayer, binding: LayerBinding) -> Self {
        self.bindings.insert(layer, binding);
        self
    }

    pub fn insert(&mut self, layer: MemoryLayer, binding: LayerBinding) {
        self.bindings.insert(layer, binding);
    }

    #[must_use]
    pub fn binding(&self, layer: MemoryLayer) -> Option<&LayerBinding> {
        self.bindings.get(&layer)
    }

    /// Layers with at least one bound back-end
    pub fn layers(&self) -> impl Iterator<Item = MemoryLayer> + '_ {
        self.bindings
            .iter()
            .filter(|(_, binding)| !binding.applicable().is_empty())
            .map(|(layer, _)| *layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl SearchAdapter for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn search(
            &self,
            _query: &str,
            _limit: usize,
            _cancel: &CancellationToken,
        ) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn applicable_follows_bound_backends() {
        let binding = LayerBinding::new().with_fts(Arc::new(Named("bm25")));
        assert_eq!(
            binding.applicable(),
            vec![StrategyKind::DirectFts, StrategyKind::ExpandedFts]
        );

        let binding = binding
            .with_vector(Arc::new(Named("hash")))
            .with_summaries(Arc::new(Named("summary-bm25")));
        assert_eq!(binding.applicable(), StrategyKind::ALL.to_vec());
    }

    #[test]
    fn adapter_for_dispatches_by_backend() {
        let binding = LayerBinding::new()
            .with_fts(Arc::new(Named("bm25")))
            .with_vector(Arc::new(Named("hash")));

        assert_eq!(
            binding.adapter_for(StrategyKind::ExpandedFts).unwrap().name(),
            "bm25"
        );
        assert_eq!(
            binding.adapter_for(StrategyKind::Semantic).unwrap().name(),
            "hash"
        );
        assert!(binding.adapter_for(StrategyKind::Summaries).is_none());
    }

    #[test]
    fn registry_lists_only_populated_layers() {
        let registry = LayerRegistry::new()
            .bind(
                MemoryLayer::Rules,
                LayerBinding::new().with_fts(Arc::new(Named("bm25"))),
            )
            .bind(MemoryLayer::Team, LayerBinding::new());

        let layers: Vec<_> = registry.layers().collect();
        assert_eq!(layers, vec![MemoryLayer::Rules]);
        assert!(registry.binding(MemoryLayer::Transcripts).is_none());
    }
}
