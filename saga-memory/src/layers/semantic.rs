//! Semantic layer: chunked, embedded long-term memory.
//!
//! Documents (volume and arc outlines, chapter summaries, chapter text) are
//! split by the embedding provider into overlapping chunks and stored one
//! vector row per chunk. Retrieval fuses those rows back into documents:
//! each source id keeps only its best-scoring chunk, newest documents first.
//!
//! Vector-store calls are retried with exponential backoff. A query that
//! still fails degrades to "no matches" for that chunk; a failed upsert is
//! an error.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use saga_core::config::SemanticConfig;
use saga_core::embedding::EmbeddingProvider;
use saga_core::retry::{retry_with_backoff, RetryPolicy};
use saga_core::types::LayerType;
use saga_core::vector::{Metadata, VectorMatch, VectorQuery, VectorRecord, VectorStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::layer::MemoryLayer;

/// Metadata key holding the logical source-document id.
pub const SOURCE_ID: &str = "id";
/// Metadata key holding the content-type discriminator.
pub const KIND: &str = "type";
/// Metadata key holding the chunk index.
pub const SEGMENT: &str = "segment";
/// Metadata key holding the write time, in milliseconds since the epoch.
pub const TIMESTAMP: &str = "timestamp";
/// Metadata key holding the provider's chunk size.
pub const CHUNK_SIZE: &str = "chunkSize";
/// Metadata key holding the full document text.
pub const CONTENT: &str = "content";

/// What a semantic document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticKind {
    /// A volume outline.
    Volume,
    /// An arc outline.
    Arc,
    /// A chapter summary.
    ChapterSummary,
    /// Full chapter text.
    ChapterContent,
}

impl SemanticKind {
    /// The stored discriminator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Arc => "arc",
            Self::ChapterSummary => "chapter_summary",
            Self::ChapterContent => "chapter_content",
        }
    }
}

/// A retrieval request.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticQuery {
    /// Free text to search for.
    pub text: String,
    /// Only documents of this kind are searched.
    pub kind: SemanticKind,
    /// Result cap; the configured default when `None`.
    pub max_results: Option<usize>,
}

impl SemanticQuery {
    /// Search `kind` documents for `text`.
    #[must_use]
    pub fn new(text: impl Into<String>, kind: SemanticKind) -> Self {
        Self {
            text: text.into(),
            kind,
            max_results: None,
        }
    }

    /// Cap the number of results.
    #[must_use]
    pub fn limit(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// One fused document match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticHit {
    /// Vector row id of the best-scoring chunk.
    pub id: String,
    /// Logical source-document id.
    pub source_id: String,
    /// Row metadata, including the full document text.
    pub metadata: Metadata,
    /// Cosine similarity of the best chunk.
    pub score: f32,
}

impl SemanticHit {
    /// Write time in milliseconds, 0 if absent.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        metadata_timestamp(&self.metadata)
    }

    /// The stored document text, if present.
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.metadata.get(CONTENT).and_then(Value::as_str)
    }
}

/// A document to index.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticDocument {
    /// Content type.
    pub kind: SemanticKind,
    /// The full text.
    pub content: String,
    /// Caller metadata; an `"id"` string names the source document.
    pub metadata: Metadata,
}

impl SemanticDocument {
    /// A document with no caller metadata.
    #[must_use]
    pub fn new(kind: SemanticKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Name the source document. Chunk rows are `<id>-<index>`.
    #[must_use]
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_metadata(SOURCE_ID, id.into())
    }

    /// Attach one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

fn metadata_timestamp(metadata: &Metadata) -> i64 {
    metadata.get(TIMESTAMP).and_then(Value::as_i64).unwrap_or(0)
}

/// Fuse chunk-level matches into document-level hits.
///
/// Matches without a source id are dropped. Per source id the highest score
/// wins (the first seen on ties); the survivors are ordered newest first,
/// stable on equal timestamps, and cut to `max_results`.
#[must_use]
pub fn fuse_matches(matches: Vec<VectorMatch>, max_results: usize) -> Vec<SemanticHit> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut hits: Vec<SemanticHit> = Vec::new();

    for m in matches {
        let Some(metadata) = m.metadata else { continue };
        let Some(source_id) = metadata.get(SOURCE_ID).and_then(Value::as_str).map(str::to_string) else {
            continue;
        };
        match position.get(&source_id) {
            Some(&at) => {
                if m.score > hits[at].score {
                    hits[at] = SemanticHit { id: m.id, source_id, metadata, score: m.score };
                }
            }
            None => {
                position.insert(source_id.clone(), hits.len());
                hits.push(SemanticHit { id: m.id, source_id, metadata, score: m.score });
            }
        }
    }

    hits.sort_by_key(|hit| Reverse(hit.timestamp()));
    hits.truncate(max_results);
    hits
}

/// Vector-backed semantic memory.
pub struct SemanticLayer {
    embedder: Arc<dyn EmbeddingProvider>,
    vectors: Arc<dyn VectorStore>,
    config: SemanticConfig,
}

impl SemanticLayer {
    /// Create the layer.
    #[must_use]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, vectors: Arc<dyn VectorStore>, config: SemanticConfig) -> Self {
        Self { embedder, vectors, config }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.config.max_retries, Duration::from_millis(self.config.initial_backoff_ms))
    }

    /// Top-k rows of `kind` for one query chunk; empty once retries run out.
    async fn search_chunk(&self, vector: Vec<f32>, kind: SemanticKind) -> Vec<VectorMatch> {
        let query = VectorQuery::new(vector, self.config.query_top_k).with_filter(KIND, kind.as_str());
        let query = &query;
        match retry_with_backoff(self.retry_policy(), "semantic_query", move || self.vectors.query(query)).await {
            Ok(matches) => matches,
            Err(err) => {
                warn!(kind = kind.as_str(), error = %err, "Semantic search failed, treating as no matches");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl MemoryLayer for SemanticLayer {
    type Query = SemanticQuery;
    type Output = Vec<SemanticHit>;
    type Update = SemanticDocument;

    fn layer_type(&self) -> LayerType {
        LayerType::Semantic
    }

    /// # Errors
    ///
    /// Only embedding failures; vector-store failures degrade to no matches.
    async fn fetch(&self, query: SemanticQuery) -> Result<Vec<SemanticHit>> {
        let start = Instant::now();
        let embeddings = self.embedder.embed(&query.text).await?;

        let searches = embeddings
            .into_iter()
            .filter(|e| !e.is_empty())
            .map(|e| self.search_chunk(e.0, query.kind));
        let matches: Vec<VectorMatch> = join_all(searches).await.into_iter().flatten().collect();

        let coarse = matches.len();
        let hits = fuse_matches(matches, query.max_results.unwrap_or(self.config.default_max_results));
        debug!(
            kind = query.kind.as_str(),
            coarse,
            fused = hits.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Semantic fetch"
        );
        Ok(hits)
    }

    /// # Errors
    ///
    /// Embedding failures, or an upsert that still fails after retries.
    async fn update(&self, document: SemanticDocument) -> Result<()> {
        let chunking = self.embedder.chunking_info();
        let embeddings = self.embedder.embed(&document.content).await?;
        let now = Utc::now().timestamp_millis();

        let base_id = document
            .metadata
            .get(SOURCE_ID)
            .and_then(Value::as_str)
            .map_or_else(|| format!("{}-{now}", document.kind.as_str()), str::to_string);

        let records: Vec<VectorRecord> = embeddings
            .into_iter()
            .filter(|e| !e.is_empty())
            .enumerate()
            .map(|(segment, embedding)| {
                let mut metadata = document.metadata.clone();
                metadata.insert(SOURCE_ID.into(), base_id.clone().into());
                metadata.insert(KIND.into(), document.kind.as_str().into());
                metadata.insert(SEGMENT.into(), segment.into());
                metadata.insert(TIMESTAMP.into(), now.into());
                metadata.insert(CHUNK_SIZE.into(), chunking.chunk_size.into());
                metadata.insert(CONTENT.into(), document.content.clone().into());
                VectorRecord {
                    id: format!("{base_id}-{segment}"),
                    values: embedding.0,
                    metadata,
                }
            })
            .collect();

        if records.is_empty() {
            debug!(source_id = %base_id, "No embeddable chunks, skipping upsert");
            return Ok(());
        }

        let records = &records;
        let written = retry_with_backoff(self.retry_policy(), "semantic_upsert", move || {
            self.vectors.upsert(records.clone())
        })
        .await?;
        info!(
            source_id = %base_id,
            kind = document.kind.as_str(),
            chunks = written,
            "Indexed semantic document"
        );
        Ok(())
    }
}
