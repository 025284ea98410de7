//! Vector storage with cosine top-k search.
//!
//! Rows are `id -> (vector, metadata)`. Queries take an equality filter over
//! metadata keys and return the best `top_k` rows by cosine similarity.
//! [`SqliteVectorStore`] keeps vectors as little-endian `f32` blobs next to
//! the relational tables and scores them in Rust.

use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::embedding::cosine_similarity;
use crate::error::{Result, SagaError};
use crate::persistence::{run_blocking, SqliteStore};

/// Metadata bag attached to every vector row.
pub type Metadata = Map<String, Value>;

/// One row to upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Row id, unique within the store.
    pub id: String,
    /// The vector.
    pub values: Vec<f32>,
    /// Arbitrary metadata, filterable by equality.
    pub metadata: Metadata,
}

/// A similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    /// Query vector.
    pub vector: Vec<f32>,
    /// Maximum number of matches.
    pub top_k: usize,
    /// Every `(key, value)` must equal the row's metadata entry.
    pub filter: Metadata,
    /// Whether to include metadata in the matches.
    pub return_metadata: bool,
}

impl VectorQuery {
    /// A query for the `top_k` nearest rows with no filter.
    #[must_use]
    pub fn new(vector: Vec<f32>, top_k: usize) -> Self {
        Self {
            vector,
            top_k,
            filter: Metadata::new(),
            return_metadata: true,
        }
    }

    /// Restrict matches to rows whose `key` metadata equals `value`.
    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(key.into(), value.into());
        self
    }
}

/// A scored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    /// Row id.
    pub id: String,
    /// Cosine similarity.
    pub score: f32,
    /// Row metadata, if requested.
    pub metadata: Option<Metadata>,
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// An id-addressed vector index.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Best matches for `query`, highest score first.
    ///
    /// # Errors
    /// Returns [`SagaError::VectorStore`] or a storage error.
    async fn query(&self, query: &VectorQuery) -> Result<Vec<VectorMatch>>;

    /// Insert or replace rows by id. Returns the number written.
    ///
    /// # Errors
    /// Returns an error if any row cannot be written; nothing is written then.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize>;

    /// Delete one row. Returns `true` if it existed.
    ///
    /// # Errors
    /// Returns a storage error.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Delete every row.
    ///
    /// # Errors
    /// Returns a storage error.
    async fn clear(&self) -> Result<()>;

    /// Number of stored rows.
    ///
    /// # Errors
    /// Returns a storage error.
    async fn count(&self) -> Result<usize>;
}

// ---------------------------------------------------------------------------
// SqliteVectorStore
// ---------------------------------------------------------------------------

const VECTOR_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS vectors (
        id         TEXT PRIMARY KEY,
        embedding  BLOB NOT NULL,
        metadata   TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

/// SQLite-backed [`VectorStore`] using brute-force cosine scoring.
#[derive(Clone)]
pub struct SqliteVectorStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteVectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteVectorStore").finish_non_exhaustive()
    }
}

impl SqliteVectorStore {
    /// Create the vector table inside an existing store's database.
    ///
    /// # Errors
    /// Returns [`SagaError::Database`] on SQLite failures.
    pub fn attach(store: &SqliteStore) -> Result<Self> {
        let conn = store.connection();
        conn.lock().execute_batch(VECTOR_SCHEMA)?;
        Ok(Self { conn })
    }

    /// A standalone in-memory vector store (useful for tests).
    ///
    /// # Errors
    /// Returns [`SagaError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(VECTOR_SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn query(&self, query: &VectorQuery) -> Result<Vec<VectorMatch>> {
        let start = Instant::now();
        let rows: Vec<(String, Vec<u8>, String)> = run_blocking(&self.conn, |conn| {
            let mut stmt = conn.prepare_cached("SELECT id, embedding, metadata FROM vectors")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
        .await?;
        let scanned = rows.len();

        let mut scored = Vec::new();
        for (id, blob, metadata) in rows {
            let metadata: Metadata = serde_json::from_str(&metadata)?;
            if !matches_filter(&metadata, &query.filter) {
                continue;
            }
            let values = decode_vector(&blob)?;
            let Some(score) = cosine_similarity(&query.vector, &values) else {
                continue;
            };
            scored.push(VectorMatch {
                id,
                score,
                metadata: query.return_metadata.then_some(metadata),
            });
        }

        scored.sort_by_key(|m| Reverse(OrderedFloat(m.score)));
        scored.truncate(query.top_k);

        debug!(
            scanned,
            matched = scored.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Vector query"
        );
        Ok(scored)
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        let rows = records
            .into_iter()
            .map(|r| -> Result<(String, Vec<u8>, String)> {
                let metadata = serde_json::to_string(&r.metadata)?;
                Ok((r.id, encode_vector(&r.values), metadata))
            })
            .collect::<Result<Vec<_>>>()?;
        let stamp = chrono::Utc::now().to_rfc3339();

        let written = run_blocking(&self.conn, move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO vectors (id, embedding, metadata, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                        embedding = excluded.embedding,
                        metadata = excluded.metadata,
                        updated_at = excluded.updated_at",
                )?;
                for (id, blob, metadata) in &rows {
                    stmt.execute(params![id, blob, metadata, stamp])?;
                }
            }
            tx.commit()?;
            Ok(rows.len())
        })
        .await?;

        debug!(rows = written, "Upserted vectors");
        Ok(written)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        run_blocking(&self.conn, move |conn| {
            let deleted = conn.execute("DELETE FROM vectors WHERE id = ?1", params![id])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        run_blocking(&self.conn, |conn| {
            conn.execute("DELETE FROM vectors", [])?;
            Ok(())
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        run_blocking(&self.conn, |conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM vectors", [], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or(0))
        })
        .await
    }
}

fn matches_filter(metadata: &Metadata, filter: &Metadata) -> bool {
    filter.iter().all(|(k, v)| metadata.get(k) == Some(v))
}

fn encode_vector(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(blob: &[u8]) -> Result<Vec<f32>> {
    if blob.len() % 4 != 0 {
        return Err(SagaError::VectorStore(format!(
            "corrupt vector blob of {} bytes",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, values: Vec<f32>, kind: &str) -> VectorRecord {
        let mut metadata = Metadata::new();
        metadata.insert("type".into(), json!(kind));
        VectorRecord {
            id: id.into(),
            values,
            metadata,
        }
    }

    #[tokio::test]
    async fn query_ranks_and_filters() {
        let store = SqliteVectorStore::open_in_memory().expect("open");
        store
            .upsert(vec![
                record("a", vec![1.0, 0.0], "chapter"),
                record("b", vec![0.7, 0.7], "chapter"),
                record("c", vec![1.0, 0.0], "summary"),
                record("z", vec![0.0, 0.0], "chapter"),
            ])
            .await
            .expect("upsert");

        let matches = store
            .query(&VectorQuery::new(vec![1.0, 0.0], 10).with_filter("type", "chapter"))
            .await
            .expect("query");
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"], "zero vector and other types are excluded");
        assert!(matches[0].metadata.is_some());

        let top1 = store.query(&VectorQuery::new(vec![1.0, 0.0], 1)).await.expect("query");
        assert_eq!(top1.len(), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_and_maintenance_ops_work() {
        let store = SqliteVectorStore::open_in_memory().expect("open");
        store.upsert(vec![record("a", vec![1.0, 0.0], "x")]).await.expect("upsert");
        store.upsert(vec![record("a", vec![0.0, 1.0], "x")]).await.expect("upsert");
        assert_eq!(store.count().await.expect("count"), 1);

        let hit = store.query(&VectorQuery::new(vec![0.0, 1.0], 1)).await.expect("query");
        assert!((hit[0].score - 1.0).abs() < 1e-6);

        assert!(store.delete("a").await.expect("delete"));
        assert!(!store.delete("a").await.expect("delete"));
        store.upsert(vec![record("b", vec![1.0], "x")]).await.expect("upsert");
        store.clear().await.expect("clear");
        assert_eq!(store.count().await.expect("count"), 0);
        assert_eq!(store.upsert(Vec::new()).await.expect("noop"), 0);
    }

    #[tokio::test]
    async fn shares_a_database_with_the_relational_store() {
        let relational = SqliteStore::open_in_memory().expect("open");
        let vectors = SqliteVectorStore::attach(&relational).expect("attach");
        vectors.upsert(vec![record("a", vec![1.0], "x")]).await.expect("upsert");
        assert_eq!(vectors.count().await.expect("count"), 1);
    }

    #[test]
    fn blob_encoding_round_trips() {
        let values = vec![0.25_f32, -1.5, 3.0];
        assert_eq!(decode_vector(&encode_vector(&values)).expect("decode"), values);
        assert!(decode_vector(&[0, 1, 2]).is_err());
    }
}
