//! Vector embedding abstraction layer.
//!
//! Provides an async trait for turning text into one embedding per chunk, the
//! cosine similarity used by entity resolution and the vector store, and two
//! offline providers. The HTTP provider lives in `saga-llm`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::chunking::{ChunkingInfo, TextChunker};
use crate::error::Result;

/// A dense embedding vector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Number of dimensions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the vector carries no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Generate vector embeddings from text.
///
/// Long input is chunked by the provider; the result holds one vector per
/// surviving chunk, in chunk order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed `text`, one vector per chunk.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::Embedding`](crate::SagaError::Embedding) if no
    /// chunk survives filtering or the provider fails.
    async fn embed(&self, text: &str) -> Result<Vec<Embedding>>;

    /// How this provider chunks its input.
    fn chunking_info(&self) -> ChunkingInfo;

    /// A human-readable name for the model (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Cosine similarity
// ---------------------------------------------------------------------------

/// Cosine similarity between two vectors.
///
/// Returns `None` when the similarity is undefined: mismatched or zero
/// dimensions, a zero-magnitude operand, or a non-finite result. Callers treat
/// `None` as "no match".
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0_f32;
    let mut mag_a = 0.0_f32;
    let mut mag_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f32::EPSILON {
        return None;
    }

    let sim = dot / denom;
    sim.is_finite().then_some(sim)
}

// ---------------------------------------------------------------------------
// Stub / Zero-cost provider (for tests)
// ---------------------------------------------------------------------------

/// A stub embedding provider that returns one zero-vector per chunk.
///
/// Zero vectors never match anything, which makes this provider useful for
/// exercising the degenerate paths of retrieval and resolution.
pub struct StubEmbeddingProvider {
    dims: usize,
    chunker: TextChunker,
}

impl StubEmbeddingProvider {
    /// Create a new stub provider with the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dims: dimensions,
            chunker: TextChunker::default(),
        }
    }
}

impl Default for StubEmbeddingProvider {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<Embedding>> {
        let chunks = self.chunker.chunk(text)?;
        Ok(chunks.iter().map(|_| Embedding(vec![0.0; self.dims])).collect())
    }

    fn chunking_info(&self) -> ChunkingInfo {
        ChunkingInfo {
            chunk_size: self.chunker.chunk_size(),
            overlap_size: self.chunker.overlap_size(),
            max_tokens: 0,
        }
    }

    fn model_name(&self) -> &str {
        "stub-zero-vector"
    }
}

// ---------------------------------------------------------------------------
// Character-hashing provider (offline)
// ---------------------------------------------------------------------------

/// Deterministic bag-of-characters embeddings.
///
/// Each non-whitespace character is hashed into one of `dims` buckets and the
/// result is L2-normalised. Texts sharing characters score high, which is
/// enough for alias matching on CJK names without a network model.
pub struct HashingEmbeddingProvider {
    dims: usize,
    chunker: TextChunker,
}

impl HashingEmbeddingProvider {
    /// Create a provider with `dimensions` buckets.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dims: dimensions.max(1),
            chunker: TextChunker::default(),
        }
    }

    /// Use a custom chunker.
    #[must_use]
    pub fn with_chunker(mut self, chunker: TextChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Embed a single chunk without chunking.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn embed_chunk(&self, text: &str) -> Embedding {
        let mut values = vec![0.0_f32; self.dims];
        for ch in text.chars().filter(|c| !c.is_whitespace()) {
            let bucket = (fnv1a(ch) % self.dims as u64) as usize;
            values[bucket] += 1.0;
        }
        let mag: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag >= f32::EPSILON {
            values.iter_mut().for_each(|x| *x /= mag);
        }
        Embedding(values)
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<Embedding>> {
        let chunks = self.chunker.chunk(text)?;
        Ok(chunks.iter().map(|c| self.embed_chunk(c)).collect())
    }

    fn chunking_info(&self) -> ChunkingInfo {
        ChunkingInfo {
            chunk_size: self.chunker.chunk_size(),
            overlap_size: self.chunker.overlap_size(),
            max_tokens: 0,
        }
    }

    fn model_name(&self) -> &str {
        "char-hash"
    }
}

fn fnv1a(ch: char) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut buf = [0u8; 4];
    for byte in ch.encode_utf8(&mut buf).bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
