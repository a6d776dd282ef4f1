//! Application context: configuration plus the wired search engine

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::cli::Cli;
use crate::config::{Config, SourcesConfig};
use crate::corpus::{Corpus, CorpusLoader, SessionScanner};
use crate::error::Result;
use crate::search::{
    Bm25Adapter, Bm25Index, Document, HashEmbedder, LayerBinding, LayerRegistry, MemoryLayer,
    SearchCoordinator, VectorAdapter, VectorIndex,
};

pub struct AppContext {
    pub config: Config,
    pub project_root: PathBuf,
    pub robot_mode: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let project_root = match &cli.project {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };
        let config = Config::load(cli.config.as_deref(), &project_root)?;
        Ok(Self {
            config,
            project_root,
            robot_mode: cli.json,
        })
    }

    /// Load the corpus and build a coordinator over it.
    pub fn coordinator(&self) -> Result<SearchCoordinator> {
        build_coordinator(&self.config, &self.project_root)
    }
}

pub fn build_coordinator(config: &Config, project_root: &Path) -> Result<SearchCoordinator> {
    let corpus = CorpusLoader::new(project_root, config.sources.clone()).load();
    let registry = build_registry(&corpus, &config.sources)?;
    let mut coordinator = SearchCoordinator::new(registry, config);

    if let Some(root) = config.sources.sessions_root() {
        let scanner = Arc::new(SessionScanner::new(root, config.fallback.recency_files));
        coordinator = coordinator
            .with_recency_scanner(scanner.clone())
            .with_brute_force_scanner(scanner);
    }
    Ok(coordinator)
}

/// Bind the bundled back-ends for every non-empty layer.
///
/// Each layer gets a BM25 index and, when semantic search is enabled, a
/// hash-embedding index. The transcripts layer also searches session
/// summaries, sharing the summaries layer's index.
pub fn build_registry(corpus: &Corpus, sources: &SourcesConfig) -> Result<LayerRegistry> {
    let mut registry = LayerRegistry::new();

    let summaries_index = if corpus.summaries.is_empty() {
        None
    } else {
        Some(Arc::new(bm25_over(&corpus.summaries)?))
    };

    for layer in MemoryLayer::ALL {
        let documents = corpus.layer(layer);
        if documents.is_empty() {
            debug!(layer = %layer, "no documents, layer left unbound");
            continue;
        }

        let fts_index = match (layer, &summaries_index) {
            (MemoryLayer::Summaries, Some(shared)) => shared.clone(),
            _ => Arc::new(bm25_over(documents)?),
        };
        let mut binding =
            LayerBinding::new().with_fts(Arc::new(Bm25Adapter::new(format!("{layer}-bm25"), fts_index)));

        if sources.semantic {
            let vectors = VectorIndex::build(Box::new(HashEmbedder::default()), documents.to_vec());
            binding = binding.with_vector(Arc::new(VectorAdapter::new(
                format!("{layer}-vector"),
                Arc::new(vectors),
            )));
        }

        if layer == MemoryLayer::Transcripts {
            if let Some(shared) = &summaries_index {
                binding = binding.with_summaries(Arc::new(Bm25Adapter::new(
                    "summaries-bm25",
                    shared.clone(),
                )));
            }
        }

        registry.insert(layer, binding);
    }

    Ok(registry)
}

fn bm25_over(documents: &[Document]) -> Result<Bm25Index> {
    let index = Bm25Index::open_in_memory()?;
    index.index_documents(documents)?;
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::StrategyKind;

    fn doc(id: &str, text: &str, layer: MemoryLayer) -> Document {
        Document::new(id, text, 0.0, layer)
    }

    #[test]
    fn registry_binds_only_populated_layers() {
        let corpus = Corpus {
            rules: vec![doc("rules:CLAUDE.md", "format with rustfmt", MemoryLayer::Rules)],
            transcripts: vec![doc("m1", "deploy the worker", MemoryLayer::Transcripts)],
            summaries: vec![doc("summary:m1", "worker deployment", MemoryLayer::Summaries)],
            team: Vec::new(),
        };

        let registry = build_registry(&corpus, &SourcesConfig::default()).unwrap();

        assert!(registry.binding(MemoryLayer::Team).is_none());
        let transcripts = registry.binding(MemoryLayer::Transcripts).unwrap();
        assert_eq!(
            transcripts.applicable(),
            vec![
                StrategyKind::DirectFts,
                StrategyKind::ExpandedFts,
                StrategyKind::Semantic,
                StrategyKind::Summaries,
            ]
        );
        let rules = registry.binding(MemoryLayer::Rules).unwrap();
        assert!(rules.adapter_for(StrategyKind::Summaries).is_none());
    }

    #[test]
    fn semantic_can_be_disabled() {
        let corpus = Corpus {
            rules: vec![doc("rules:CLAUDE.md", "format with rustfmt", MemoryLayer::Rules)],
            ..Corpus::default()
        };
        let sources = SourcesConfig {
            semantic: false,
            ..SourcesConfig::default()
        };

        let registry = build_registry(&corpus, &sources).unwrap();
        let rules = registry.binding(MemoryLayer::Rules).unwrap();
        assert!(rules.adapter_for(StrategyKind::Semantic).is_none());
        assert!(rules.adapter_for(StrategyKind::DirectFts).is_some());
    }
}
