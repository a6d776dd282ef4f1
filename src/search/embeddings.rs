//! Hash embeddings
//!
//! FNV-1a feature hashing of unigrams and bigrams into a fixed-width vector.
//! No model files, fully deterministic. Serves the `semantic` strategy.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::adapter::SearchAdapter;
use super::document::Document;
use crate::error::{RecallError, Result};

/// Pluggable embedding backend interface
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;
    fn dims(&self) -> usize;
}

/// Hash embedder using FNV-1a
#[derive(Debug, Clone, Copy)]
pub struct HashEmbedder {
    /// Embedding dimension (default: 384)
    dim: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

impl HashEmbedder {
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Embed text into an L2-normalized vector
    #[must_use]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        if self.dim == 0 {
            return Vec::new();
        }

        let tokens = tokenize(text);
        let mut embedding = vec![0.0; self.dim];

        if tokens.is_empty() {
            return embedding;
        }

        for token in &tokens {
            accumulate_embedding(&mut embedding, token, 1.0);
        }

        for window in tokens.windows(2) {
            let bigram = format!("{} {}", window[0], window[1]);
            accumulate_embedding(&mut embedding, &bigram, 0.5);
        }

        l2_normalize(&mut embedding);
        embedding
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        Self::embed(self, text)
    }

    fn dims(&self) -> usize {
        self.dim
    }
}

/// Immutable in-memory vector index. Built once from a document set.
pub struct VectorIndex {
    embedder: Box<dyn Embedder>,
    entries: Vec<(Document, Vec<f32>)>,
}

impl VectorIndex {
    pub fn build(embedder: Box<dyn Embedder>, documents: Vec<Document>) -> Self {
        let entries = documents
            .into_iter()
            .map(|doc| {
                let embedding = embedder.embed(&doc.content);
                (doc, embedding)
            })
            .collect();
        Self { embedder, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cosine similarity search. Scores are clamped into 0–1; documents with
    /// no similarity at all are left out.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Document> {
        let query_embedding = self.embedder.embed(query);
        if limit == 0 || query_embedding.iter().all(|v| *v == 0.0) {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(idx, (_, emb))| (idx, dot_product(&query_embedding, emb).clamp(0.0, 1.0)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.entries[a.0].0.id.cmp(&self.entries[b.0].0.id))
        });
        scored.truncate(limit);

        scored
            .into_iter()
            .map(|(idx, score)| self.entries[idx].0.clone().with_score(score))
            .collect()
    }
}

/// [`SearchAdapter`] over a shared [`VectorIndex`]
#[derive(Clone)]
pub struct VectorAdapter {
    name: String,
    index: Arc<VectorIndex>,
}

impl VectorAdapter {
    pub fn new(name: impl Into<String>, index: Arc<VectorIndex>) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

#[async_trait]
impl SearchAdapter for VectorAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Document>> {
        if cancel.is_cancelled() {
            return Err(RecallError::Cancelled(self.name.clone()));
        }
        let index = Arc::clone(&self.index);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || index.search(&query, limit))
            .await
            .map_err(|err| RecallError::Internal(format!("vector search task failed: {err}")))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|token| token.len() >= 2)
        .map(ToString::to_string)
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn accumulate_embedding(embedding: &mut [f32], token: &str, weight: f32) {
    let token_hash = fnv1a_hash(token.as_bytes());

    for i in 0..embedding.len() {
        let dim_hash = fnv1a_hash_with_salt(token_hash, i as u64);
        let sign = if dim_hash & 1 == 0 { weight } else { -weight };
        let dim = ((dim_hash >> 1) as usize) % embedding.len();
        embedding[dim] += sign;
    }
}

fn fnv1a_hash_with_salt(seed: u64, salt: u64) -> u64 {
    let mut bytes = [0u8; 16];
    bytes[..8].copy_from_slice(&seed.to_le_bytes());
    bytes[8..].copy_from_slice(&salt.to_le_bytes());
    fnv1a_hash(&bytes)
}

fn fnv1a_hash(data: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn l2_normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
