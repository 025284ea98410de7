//! Boundary-aware text chunking for embedding.
//!
//! Long prose is cut into fixed-size windows with overlap. A window prefers
//! to end on a paragraph break, then on sentence-ending punctuation, and only
//! falls back to a hard cut when neither lies far enough into the window.
//! All positions are in `char`s, not bytes.

use serde::{Deserialize, Serialize};

use crate::config::EmbeddingConfig;
use crate::error::{Result, SagaError};

const PARAGRAPH_BREAK: [char; 2] = ['\n', '\n'];
const SENTENCE_ENDS: [char; 3] = ['。', '？', '！'];

/// Chunking parameters as reported by an embedding provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkingInfo {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks.
    pub overlap_size: usize,
    /// Provider input limit in tokens.
    pub max_tokens: usize,
}

/// Splits text into overlapping, boundary-aligned chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunker {
    chunk_size: usize,
    overlap_ratio: f32,
    min_chunk_ratio: f32,
    paragraph_split_ratio: f32,
    sentence_split_ratio: f32,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&EmbeddingConfig::default())
    }
}

impl TextChunker {
    /// Build a chunker from the embedding section of the configuration.
    #[must_use]
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            overlap_ratio: config.overlap_ratio.clamp(0.0, 0.5),
            min_chunk_ratio: config.min_chunk_ratio.max(0.0),
            paragraph_split_ratio: config.paragraph_split_ratio,
            sentence_split_ratio: config.sentence_split_ratio,
        }
    }

    /// Target chunk size in characters.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn overlap_size(&self) -> usize {
        (self.chunk_size as f32 * self.overlap_ratio).floor() as usize
    }

    /// Chunks shorter than this are dropped when more than one chunk exists.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    pub fn min_chunk_len(&self) -> usize {
        (self.chunk_size as f32 * self.min_chunk_ratio).floor() as usize
    }

    /// Cut `text` into trimmed, non-empty chunks. No size filtering.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let len = chars.len();
        let overlap = self.overlap_size();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < len {
            let mut end = start + self.chunk_size;
            if end < len {
                end = self.best_split(&chars, start, end);
            }
            let end = end.min(len);

            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }

            if end >= len {
                break;
            }
            // Always advance, even with a degenerate overlap ratio.
            start = end.saturating_sub(overlap).max(start + 1);
        }
        chunks
    }

    /// Chunk `text` for embedding.
    ///
    /// A single chunk is kept whatever its length; otherwise chunks shorter
    /// than [`min_chunk_len`](Self::min_chunk_len) are dropped.
    ///
    /// # Errors
    /// Returns `SagaError::Embedding` if no chunk survives.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>> {
        let chunks = self.split(text);
        let valid = if chunks.len() == 1 {
            chunks
        } else {
            let floor = self.min_chunk_len();
            chunks.into_iter().filter(|c| c.chars().count() >= floor).collect()
        };
        if valid.is_empty() {
            return Err(SagaError::Embedding("No valid text chunks found".to_string()));
        }
        Ok(valid)
    }

    #[allow(clippy::cast_precision_loss)]
    fn best_split(&self, chars: &[char], start: usize, end: usize) -> usize {
        let size = self.chunk_size as f32;
        // Only boundaries that end inside the window count.
        let paragraph = last_index_of(chars, &PARAGRAPH_BREAK, end.saturating_sub(PARAGRAPH_BREAK.len()));
        let sentence = SENTENCE_ENDS
            .iter()
            .filter_map(|p| last_index_of(chars, std::slice::from_ref(p), end.saturating_sub(1)))
            .max();

        match (paragraph, sentence) {
            (Some(p), _) if p as f32 > start as f32 + size * self.paragraph_split_ratio => {
                p + PARAGRAPH_BREAK.len()
            }
            (_, Some(s)) if s as f32 > start as f32 + size * self.sentence_split_ratio => s + 1,
            _ => end,
        }
    }
}

/// Last position `<= from` at which `needle` starts.
fn last_index_of(haystack: &[char], needle: &[char], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    let last_start = from.min(haystack.len() - needle.len());
    (0..=last_start).rev().find(|&i| haystack[i..i + needle.len()] == *needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_chunker(chunk_size: usize) -> TextChunker {
        TextChunker::from_config(&EmbeddingConfig {
            chunk_size,
            ..EmbeddingConfig::default()
        })
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunker = TextChunker::default();
        assert_eq!(chunker.chunk("  短文本。  ").expect("chunk"), vec!["短文本。"]);
    }

    #[test]
    fn empty_text_is_an_error() {
        let chunker = TextChunker::default();
        assert!(matches!(chunker.chunk("   \n  "), Err(SagaError::Embedding(_))));
    }

    #[test]
    fn default_sizes() {
        let chunker = TextChunker::default();
        assert_eq!(chunker.overlap_size(), 307);
        assert_eq!(chunker.min_chunk_len(), 204);
    }

    #[test]
    fn prefers_paragraph_break_past_threshold() {
        let chunker = small_chunker(20);
        // Break at char 14 (> 0 + 20 * 0.6); the chunk ends right after it.
        let text = format!("{}\n\n{}", "a".repeat(14), "b".repeat(30));
        let chunks = chunker.split(&text);
        assert_eq!(chunks[0], "a".repeat(14));
    }

    #[test]
    fn falls_back_to_sentence_end() {
        let chunker = small_chunker(20);
        // Sentence end at char 15 (> 14); no paragraph break.
        let text = format!("{}。{}", "甲".repeat(15), "乙".repeat(30));
        let chunks = chunker.split(&text);
        assert_eq!(chunks[0], format!("{}。", "甲".repeat(15)));
    }

    #[test]
    fn boundary_just_past_the_window_is_not_taken() {
        let chunker = small_chunker(20);
        // The sentence end sits at index 20, one past the first window.
        let text = format!("{}。{}", "甲".repeat(20), "乙".repeat(30));
        let chunks = chunker.split(&text);
        assert_eq!(chunks[0], "甲".repeat(20));

        // A paragraph break that straddles the window edge is skipped too.
        let text = format!("{}。{}\n\n{}", "甲".repeat(15), "乙".repeat(4), "丙".repeat(30));
        let chunks = chunker.split(&text);
        assert_eq!(chunks[0], format!("{}。", "甲".repeat(15)));
    }

    #[test]
    fn early_boundaries_are_ignored() {
        let chunker = small_chunker(20);
        let text = format!("{}。{}", "甲".repeat(3), "乙".repeat(40));
        let chunks = chunker.split(&text);
        assert_eq!(chunks[0].chars().count(), 20);
    }

    #[test]
    fn consecutive_chunks_overlap() {
        let chunker = small_chunker(20);
        let text: String = ('a'..='z').cycle().take(60).collect();
        let chunks = chunker.split(&text);
        assert!(chunks.len() >= 3);
        // overlap = floor(20 * 0.15) = 3
        let tail: String = chunks[0].chars().skip(17).collect();
        assert!(chunks[1].starts_with(&tail));
    }

    #[test]
    fn tiny_trailing_chunk_is_filtered() {
        let chunker = small_chunker(100);
        // Second window covers only the overlap plus 5 chars.
        let text = "x".repeat(105);
        let split = chunker.split(&text);
        assert_eq!(split.len(), 2);
        let chunks = chunker.chunk(&text).expect("chunk");
        assert_eq!(chunks.len(), 2, "20-char tail is above the 10-char floor");

        let text = format!("{}{}", "x".repeat(100), "y");
        let chunker = TextChunker::from_config(&EmbeddingConfig {
            chunk_size: 100,
            overlap_ratio: 0.0,
            ..EmbeddingConfig::default()
        });
        assert_eq!(chunker.chunk(&text).expect("chunk").len(), 1);
    }
}
