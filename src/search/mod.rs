//! Multi-strategy memory search
//!
//! Runs several retrieval strategies concurrently against one memory layer,
//! merges their rankings with RRF, scores confidence from agreement and, on
//! request, escalates through fallbacks.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                 SearchRequest (query, layer, ...)               │
//! └────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//!                ┌───────────────────────────────┐
//!                │   Query expansion             │
//!                └───────────────────────────────┘
//!                                │
//!          ┌───────────────┬─────┴─────────┬───────────────┐
//!          ▼               ▼               ▼               ▼
//!     direct_fts      expanded_fts      semantic       summaries
//!     (Bm25Index)     (Bm25Index)     (VectorIndex)   (Bm25Index)
//!          │               │               │               │
//!          └───────────────┴───────┬───────┴───────────────┘
//!                                  ▼
//!                ┌───────────────────────────────┐
//!                │   RRF fusion + confidence     │
//!                └───────────────────────────────┘
//!                                  │
//!                                  ▼
//!                ┌───────────────────────────────┐
//!                │   Fallbacks (optional)        │
//!                │   recency → brute force →     │
//!                │   clarification               │
//!                └───────────────────────────────┘
//! ```

pub mod adapter;
pub mod confidence;
pub mod coordinator;
pub mod document;
pub mod embeddings;
pub mod expansion;
pub mod fallback;
pub mod fusion;
pub mod layer;
pub mod result;
pub mod runner;
pub mod strategy;
pub mod tantivy;

pub use adapter::{
    BruteForceScanner, LayerBinding, LayerRegistry, RecencyScanner, ScanOutcome, SearchAdapter,
};
pub use confidence::Confidence;
pub use coordinator::{SearchCoordinator, SearchRequest};
pub use document::Document;
pub use embeddings::{Embedder, HashEmbedder, VectorAdapter, VectorIndex};
pub use expansion::{ExpansionLevel, expand};
pub use fallback::{
    FallbackKind, FallbackOptions, FallbackOrchestrator, FallbackRecord, FallbackStage,
    FallbackStatus,
};
pub use fusion::{FusionConfig, fuse};
pub use layer::MemoryLayer;
pub use result::{FusedDocument, FusedResult, SearchType};
pub use runner::StrategyRunner;
pub use strategy::{StrategyKind, StrategyOutcome};
pub use self::tantivy::{Bm25Adapter, Bm25Index};
