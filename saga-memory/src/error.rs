//! Memory layer error type.

use saga_core::types::{ChapterNumber, LayerType};
use saga_core::SagaError;
use saga_llm::LlmError;
use thiserror::Error;

/// Errors surfaced by memory layer operations.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Storage, snapshot lookup or embedding failure.
    #[error(transparent)]
    Storage(#[from] SagaError),

    /// Every candidate model failed, or the agent was misconfigured.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The caller asked for an update that can never be valid.
    #[error("invalid {layer} update for chapter {chapter}: {reason}")]
    InvalidUpdate {
        /// Layer being updated.
        layer: LayerType,
        /// Requested chapter.
        chapter: ChapterNumber,
        /// What was wrong.
        reason: String,
    },
}

impl MemoryError {
    /// Whether this is a missing-snapshot failure (a skipped chapter).
    #[must_use]
    pub fn is_snapshot_not_found(&self) -> bool {
        matches!(self, Self::Storage(SagaError::SnapshotNotFound { .. }))
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, MemoryError>;
