//! Error types for the SAGA core library.

use thiserror::Error;

use crate::types::{ChapterNumber, LayerType};

/// Top-level error type for all SAGA core operations.
#[derive(Error, Debug)]
pub enum SagaError {
    /// A layer was asked for a chapter that has never been committed.
    ///
    /// Chapters must be generated in order; this always indicates a broken
    /// caller precondition.
    #[error("No {layer} snapshot found for chapter {chapter}")]
    SnapshotNotFound {
        /// Which layer was queried.
        layer: LayerType,
        /// The requested chapter.
        chapter: ChapterNumber,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The embedding provider failed or produced nothing usable.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The vector store rejected a query or write.
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SagaError {
    fn from(err: serde_json::Error) -> Self {
        SagaError::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, SagaError>;
