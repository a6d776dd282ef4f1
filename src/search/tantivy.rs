//! Tantivy BM25 full-text search
//!
//! In-memory BM25 index over memory documents. Serves the keyword strategies
//! (`direct_fts`, `expanded_fts`) and, when built from summary records, the
//! `summaries` strategy.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{
    Field, IndexRecordOption, STORED, STRING, Schema, TextFieldIndexing, TextOptions, Value,
};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tokio_util::sync::CancellationToken;

use super::adapter::SearchAdapter;
use super::document::{Document, meta};
use super::layer::MemoryLayer;
use crate::error::{RecallError, Result};

/// BM25 search index using Tantivy
pub struct Bm25Index {
    index: Index,
    reader: IndexReader,
    writer: Mutex<IndexWriter>,
    fields: Bm25Fields,
}

/// Field handles for the BM25 schema
#[derive(Clone, Copy)]
struct Bm25Fields {
    id: Field,
    title: Field,
    content: Field,
    layer: Field,
    metadata: Field,
    browse_url: Field,
}

impl Bm25Index {
    /// Open an in-memory index
    pub fn open_in_memory() -> Result<Self> {
        let schema = build_schema();
        let fields = extract_fields(&schema)?;

        let index = Index::create_in_ram(schema);
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer = index.writer_with_num_threads(1, 15_000_000)?;

        Ok(Self {
            index,
            reader,
            writer: Mutex::new(writer),
            fields,
        })
    }

    /// Index a document, replacing any earlier one with the same id
    pub fn index_document(&self, document: &Document) -> Result<()> {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.fields.id, &document.id);
        doc.add_text(
            self.fields.title,
            document.meta(meta::TITLE).unwrap_or_default(),
        );
        doc.add_text(self.fields.content, &document.content);
        doc.add_text(self.fields.layer, document.layer.as_str());
        doc.add_text(self.fields.metadata, serde_json::to_string(&document.metadata)?);
        if let Some(url) = &document.browse_url {
            doc.add_text(self.fields.browse_url, url);
        }

        let id_term = tantivy::Term::from_field_text(self.fields.id, &document.id);

        let writer = self.writer.lock();
        writer.delete_term(id_term);
        writer.add_document(doc)?;

        Ok(())
    }

    /// Index a batch and commit
    pub fn index_documents(&self, documents: &[Document]) -> Result<usize> {
        for document in documents {
            self.index_document(document)?;
        }
        self.commit()?;
        Ok(documents.len())
    }

    /// Commit pending changes and reload the reader
    pub fn commit(&self) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.commit()?;
        drop(writer);

        self.reader.reload()?;
        Ok(())
    }

    /// BM25 search. Query words are quoted individually so user text never
    /// reaches the query grammar. Scores are squashed into 0–1.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Document>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let Some(sanitized) = sanitize_query(query) else {
            return Ok(Vec::new());
        };

        let searcher = self.reader.searcher();
        let num_docs = usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX);
        if num_docs == 0 {
            return Ok(Vec::new());
        }
        // TopDocs preallocates `limit` slots
        let limit = limit.min(num_docs);

        let query_parser =
            QueryParser::for_index(&self.index, vec![self.fields.title, self.fields.content]);
        let parsed_query = query_parser
            .parse_query(&sanitized)
            .map_err(|e| RecallError::QueryParse(format!("Failed to parse query: {e}")))?;

        let top_docs = searcher.search(&parsed_query, &TopDocs::with_limit(limit))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher.doc(doc_address)?;
            results.push(self.to_document(&doc, squash(score))?);
        }

        Ok(results)
    }

    fn to_document(&self, doc: &TantivyDocument, score: f32) -> Result<Document> {
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        let layer: MemoryLayer = text(self.fields.layer).parse()?;
        let metadata_raw = text(self.fields.metadata);
        let metadata: BTreeMap<String, String> = if metadata_raw.is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(&metadata_raw)?
        };
        let browse_url = Some(text(self.fields.browse_url)).filter(|url| !url.is_empty());

        Ok(Document {
            id: text(self.fields.id),
            content: text(self.fields.content),
            score,
            layer,
            metadata,
            browse_url,
        })
    }

    /// Get total number of indexed documents
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    pub fn is_empty(&self) -> bool {
        self.num_docs() == 0
    }
}

/// Keep alphanumeric words and quote each one.
fn sanitize_query(query: &str) -> Option<String> {
    let words: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| format!("\"{}\"", word.to_lowercase()))
        .collect();
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn squash(score: f32) -> f32 {
    let score = score.max(0.0);
    score / (1.0 + score)
}

/// Build the Tantivy schema for memory documents
fn build_schema() -> Schema {
    let mut builder = Schema::builder();

    let text_options = TextOptions::default().set_indexing_options(
        TextFieldIndexing::default()
            .set_tokenizer("default")
            .set_index_option(IndexRecordOption::WithFreqsAndPositions),
    );

    builder.add_text_field("id", STRING | STORED);
    builder.add_text_field("title", text_options.clone() | STORED);
    builder.add_text_field("content", text_options | STORED);
    builder.add_text_field("layer", STRING | STORED);
    builder.add_text_field("metadata", STORED);
    builder.add_text_field("browse_url", STORED);

    builder.build()
}

fn extract_fields(schema: &Schema) -> Result<Bm25Fields> {
    let field = |name: &str| {
        schema.get_field(name).map_err(|_| {
            RecallError::SearchIndex(tantivy::TantivyError::SchemaError(format!(
                "missing {name} field"
            )))
        })
    };
    Ok(Bm25Fields {
        id: field("id")?,
        title: field("title")?,
        content: field("content")?,
        layer: field("layer")?,
        metadata: field("metadata")?,
        browse_url: field("browse_url")?,
    })
}

/// [`SearchAdapter`] over a shared [`Bm25Index`]. Queries run on the blocking
/// pool.
#[derive(Clone)]
pub struct Bm25Adapter {
    name: String,
    index: Arc<Bm25Index>,
}

impl Bm25Adapter {
    pub fn new(name: impl Into<String>, index: Arc<Bm25Index>) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

#[async_trait]
impl SearchAdapter for Bm25Adapter {
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
            .map_err(|err| RecallError::Internal(format!("bm25 search task failed: {err}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, title: &str, content: &str) -> Document {
        Document::new(id, content, 0.0, MemoryLayer::Rules)
            .with_meta(meta::TITLE, title)
            .with_meta(meta::FILE_PATH, format!(".claude/rules/{id}.md"))
    }

    fn index() -> Bm25Index {
        let index = Bm25Index::open_in_memory().unwrap();
        index
            .index_documents(&[
                rule("errors", "Error handling", "Use thiserror enums and propagate with ?"),
                rule("tests", "Testing", "Every module carries unit tests next to the code"),
                rule("logging", "Logging", "Use tracing spans, never println in libraries"),
            ])
            .unwrap();
        index
    }

    #[test]
    fn finds_matching_document_with_metadata() {
        let index = index();
        let hits = index.search("thiserror", 10).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "errors");
        assert_eq!(hits[0].layer, MemoryLayer::Rules);
        assert_eq!(hits[0].meta(meta::TITLE), Some("Error handling"));
        assert!(hits[0].score > 0.0 && hits[0].score < 1.0);
    }

    #[test]
    fn query_syntax_is_neutralized() {
        let index = index();
        assert!(index.search("tracing AND (OR \"", 10).is_ok());
        assert!(index.search("title:Logging", 10).is_ok());
        assert!(index.search("+-*", 10).unwrap().is_empty());
    }

    #[test]
    fn zero_limit_returns_nothing() {
        assert!(index().search("tests", 0).unwrap().is_empty());
    }

    #[test]
    fn huge_limit_is_clamped_to_index_size() {
        let hits = index().search("use", usize::MAX).unwrap();
        assert_eq!(hits.len(), 2);

        let empty = Bm25Index::open_in_memory().unwrap();
        assert!(empty.search("anything", 1 << 40).unwrap().is_empty());
    }

    #[test]
    fn reindexing_replaces_by_id() {
        let index = index();
        index
            .index_documents(&[rule("tests", "Testing", "Snapshot tests use insta")])
            .unwrap();
        assert_eq!(index.num_docs(), 3);
        assert!(index.search("module", 10).unwrap().is_empty());
        assert_eq!(index.search("insta", 10).unwrap()[0].id, "tests");
    }

    #[test]
    fn squash_is_bounded() {
        assert!(squash(0.0).abs() < f32::EPSILON);
        assert!((squash(1.0) - 0.5).abs() < f32::EPSILON);
        assert!(squash(1000.0) < 1.0);
        assert!(squash(-3.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn adapter_honours_cancellation() {
        let adapter = Bm25Adapter::new("rules-bm25", Arc::new(index()));
        let token = CancellationToken::new();
        assert_eq!(adapter.search("tracing", 5, &token).await.unwrap().len(), 1);

        token.cancel();
        assert!(matches!(
            adapter.search("tracing", 5, &token).await,
            Err(RecallError::Cancelled(_))
        ));
    }
}
