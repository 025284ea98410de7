//! SQLite persistence layer for the SAGA memory subsystem.
//!
//! Three tables live in one database file:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS layer_snapshots (
//!     id           INTEGER PRIMARY KEY AUTOINCREMENT,
//!     layer        TEXT    NOT NULL,
//!     chapter      INTEGER NOT NULL,
//!     data         TEXT    NOT NULL,
//!     last_updated TEXT    NOT NULL
//! );
//! CREATE TABLE IF NOT EXISTS chapters ( chapter_number INTEGER PRIMARY KEY, ... );
//! CREATE TABLE IF NOT EXISTS agent_logs ( id INTEGER PRIMARY KEY AUTOINCREMENT, ... );
//! ```
//!
//! Snapshots are append-only. The authoritative row for `(layer, chapter)` is
//! the newest by `last_updated`, with the row id as tie-breaker, so a rewrite
//! of the same chapter simply shadows the older row.
//!
//! All SQLite work runs on the blocking thread pool behind a shared mutex;
//! callers only ever see `async` methods.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, Row};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::PersistenceConfig;
use crate::error::{Result, SagaError};
use crate::types::{AgentLogEntry, Chapter, ChapterNumber, LayerType, SnapshotRecord};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS layer_snapshots (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        layer        TEXT    NOT NULL,
        chapter      INTEGER NOT NULL,
        data         TEXT    NOT NULL,
        last_updated TEXT    NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_layer_snapshots_key
        ON layer_snapshots (layer, chapter, last_updated);

    CREATE TABLE IF NOT EXISTS chapters (
        chapter_number INTEGER PRIMARY KEY,
        title          TEXT    NOT NULL,
        text           TEXT    NOT NULL,
        summary        TEXT    NOT NULL DEFAULT '',
        word_count     INTEGER NOT NULL DEFAULT 0,
        arc_number     INTEGER NOT NULL DEFAULT 0,
        volume_number  INTEGER NOT NULL DEFAULT 0,
        created_at     TEXT    NOT NULL
    );

    CREATE TABLE IF NOT EXISTS agent_logs (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        agent        TEXT    NOT NULL,
        category     TEXT    NOT NULL,
        model        TEXT    NOT NULL,
        status       TEXT    NOT NULL,
        input        TEXT    NOT NULL,
        output       TEXT    NOT NULL,
        request_time TEXT    NOT NULL,
        respond_time TEXT    NOT NULL,
        elapsed_ms   INTEGER NOT NULL
    );
";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Durable storage for layer snapshots, committed chapters and agent telemetry.
///
/// The store is treated as externally synchronised: it performs no
/// read-modify-write across calls, and concurrent writers to the same
/// `(layer, chapter)` simply race for "latest".
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// Append a snapshot row for `(layer, chapter)` stamped with the current time.
    ///
    /// # Errors
    /// Returns an error on serialization or SQLite failure.
    async fn insert_snapshot(&self, layer: LayerType, chapter: ChapterNumber, data: Value) -> Result<SnapshotRecord>;

    /// The authoritative (newest) snapshot row for `(layer, chapter)`, if any.
    ///
    /// # Errors
    /// Returns an error on SQLite failure or a corrupt row.
    async fn latest_snapshot(&self, layer: LayerType, chapter: ChapterNumber) -> Result<Option<SnapshotRecord>>;

    /// Distinct chapter numbers with at least one snapshot for `layer`, ascending.
    ///
    /// # Errors
    /// Returns an error on SQLite failure.
    async fn snapshot_chapters(&self, layer: LayerType) -> Result<Vec<ChapterNumber>>;

    /// Insert or replace a committed chapter.
    ///
    /// # Errors
    /// Returns an error on SQLite failure.
    async fn save_chapter(&self, chapter: &Chapter) -> Result<()>;

    /// A committed chapter by number.
    ///
    /// # Errors
    /// Returns an error on SQLite failure.
    async fn chapter(&self, chapter_number: ChapterNumber) -> Result<Option<Chapter>>;

    /// Committed chapters with numbers in `[from, to]`, ascending.
    ///
    /// # Errors
    /// Returns an error on SQLite failure.
    async fn chapters_in_range(&self, from: ChapterNumber, to: ChapterNumber) -> Result<Vec<Chapter>>;

    /// Highest committed chapter number, `None` if nothing is committed.
    ///
    /// # Errors
    /// Returns an error on SQLite failure.
    async fn max_chapter_number(&self) -> Result<Option<ChapterNumber>>;

    /// Insert agent attempt rows in one transaction.
    ///
    /// # Errors
    /// Returns an error on serialization or SQLite failure; nothing is written then.
    async fn insert_logs(&self, entries: &[AgentLogEntry]) -> Result<()>;

    /// Every attempt row recorded for `agent`, oldest first. Diagnostics only.
    ///
    /// # Errors
    /// Returns an error on SQLite failure or a corrupt row.
    async fn logs_for_agent(&self, agent: &str) -> Result<Vec<AgentLogEntry>>;
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

/// SQLite-backed [`RelationalStore`].
///
/// # Usage
///
/// ```no_run
/// # use saga_core::persistence::{RelationalStore, SqliteStore};
/// # use saga_core::config::PersistenceConfig;
/// # use saga_core::types::LayerType;
/// # async fn demo() -> saga_core::Result<()> {
/// let store = SqliteStore::open("novel.db", &PersistenceConfig::default())?;
/// store.insert_snapshot(LayerType::Plot, 0, serde_json::json!({})).await?;
/// let latest = store.latest_snapshot(LayerType::Plot, 0).await?;
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) an SQLite database at `path`.
    ///
    /// The schema is created if it does not exist. WAL mode is enabled when
    /// `config.wal_mode` is `true`.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            "SAGA store opened"
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::Database`] on SQLite failures.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Shared connection handle, for stores co-located in the same file.
    #[must_use]
    pub(crate) fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        run_blocking(&self.conn, op).await
    }
}

/// Run `op` against `conn` on the blocking pool.
pub(crate) async fn run_blocking<T, F>(conn: &Arc<Mutex<Connection>>, op: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
{
    let conn = Arc::clone(conn);
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.lock();
        op(&mut guard)
    })
    .await
    .map_err(|e| SagaError::Io(std::io::Error::other(e)))?
}

#[async_trait]
impl RelationalStore for SqliteStore {
    async fn insert_snapshot(&self, layer: LayerType, chapter: ChapterNumber, data: Value) -> Result<SnapshotRecord> {
        let start = Instant::now();
        let json = serde_json::to_string(&data)?;
        let bytes = json.len();
        let last_updated = Utc::now();
        let stamp = timestamp(&last_updated);

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO layer_snapshots (layer, chapter, data, last_updated)
                 VALUES (?1, ?2, ?3, ?4)",
                params![layer.as_str(), chapter, json, stamp],
            )?;
            Ok(())
        })
        .await?;

        debug!(
            layer = %layer,
            chapter,
            bytes,
            elapsed_us = start.elapsed().as_micros(),
            "Saved layer snapshot"
        );

        Ok(SnapshotRecord {
            layer,
            chapter,
            last_updated,
            data,
        })
    }

    async fn latest_snapshot(&self, layer: LayerType, chapter: ChapterNumber) -> Result<Option<SnapshotRecord>> {
        let row: Option<(String, String)> = self
            .run(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT data, last_updated FROM layer_snapshots
                     WHERE layer = ?1 AND chapter = ?2
                     ORDER BY last_updated DESC, id DESC
                     LIMIT 1",
                )?;
                Ok(stmt
                    .query_row(params![layer.as_str(), chapter], |row| Ok((row.get(0)?, row.get(1)?)))
                    .optional()?)
            })
            .await?;

        let Some((data, last_updated)) = row else {
            debug!(layer = %layer, chapter, "No snapshot row");
            return Ok(None);
        };

        Ok(Some(SnapshotRecord {
            layer,
            chapter,
            last_updated: parse_timestamp(&last_updated)?,
            data: serde_json::from_str(&data)?,
        }))
    }

    async fn snapshot_chapters(&self, layer: LayerType) -> Result<Vec<ChapterNumber>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT DISTINCT chapter FROM layer_snapshots WHERE layer = ?1 ORDER BY chapter",
            )?;
            let rows = stmt.query_map(params![layer.as_str()], |row| row.get::<_, ChapterNumber>(0))?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn save_chapter(&self, chapter: &Chapter) -> Result<()> {
        let chapter = chapter.clone();
        let number = chapter.chapter_number;
        let stamp = timestamp(&Utc::now());
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO chapters
                    (chapter_number, title, text, summary, word_count, arc_number, volume_number, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(chapter_number) DO UPDATE SET
                    title = excluded.title,
                    text = excluded.text,
                    summary = excluded.summary,
                    word_count = excluded.word_count,
                    arc_number = excluded.arc_number,
                    volume_number = excluded.volume_number",
                params![
                    chapter.chapter_number,
                    chapter.title,
                    chapter.text,
                    chapter.summary,
                    chapter.word_count,
                    chapter.arc_number,
                    chapter.volume_number,
                    stamp,
                ],
            )?;
            Ok(())
        })
        .await?;
        debug!(chapter = number, "Saved chapter");
        Ok(())
    }

    async fn chapter(&self, chapter_number: ChapterNumber) -> Result<Option<Chapter>> {
        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT chapter_number, title, text, summary, word_count, arc_number, volume_number
                 FROM chapters WHERE chapter_number = ?1",
            )?;
            Ok(stmt.query_row(params![chapter_number], chapter_from_row).optional()?)
        })
        .await
    }

    async fn chapters_in_range(&self, from: ChapterNumber, to: ChapterNumber) -> Result<Vec<Chapter>> {
        if from > to {
            return Ok(Vec::new());
        }
        self.run(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT chapter_number, title, text, summary, word_count, arc_number, volume_number
                 FROM chapters WHERE chapter_number BETWEEN ?1 AND ?2
                 ORDER BY chapter_number",
            )?;
            let rows = stmt.query_map(params![from, to], chapter_from_row)?;
            Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn max_chapter_number(&self) -> Result<Option<ChapterNumber>> {
        self.run(|conn| {
            let max: Option<ChapterNumber> =
                conn.query_row("SELECT MAX(chapter_number) FROM chapters", [], |row| row.get(0))?;
            Ok(max)
        })
        .await
    }

    async fn insert_logs(&self, entries: &[AgentLogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let rows = entries.iter().map(log_params).collect::<Result<Vec<_>>>()?;
        let count = rows.len();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO agent_logs
                        (agent, category, model, status, input, output, request_time, respond_time, elapsed_ms)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;
                for row in &rows {
                    stmt.execute(params![row.0, row.1, row.2, row.3, row.4, row.5, row.6, row.7, row.8])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await?;

        debug!(rows = count, "Inserted agent log rows");
        Ok(())
    }

    async fn logs_for_agent(&self, agent: &str) -> Result<Vec<AgentLogEntry>> {
        let agent = agent.to_string();
        let rows: Vec<LogRow> = self
            .run(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT agent, category, model, status, input, output, request_time, respond_time, elapsed_ms
                     FROM agent_logs WHERE agent = ?1 ORDER BY id",
                )?;
                let rows = stmt.query_map(params![agent], |row| {
                    Ok(LogRow {
                        agent: row.get(0)?,
                        category: row.get(1)?,
                        model: row.get(2)?,
                        status: row.get(3)?,
                        input: row.get(4)?,
                        output: row.get(5)?,
                        request_time: row.get(6)?,
                        respond_time: row.get(7)?,
                        elapsed_ms: row.get(8)?,
                    })
                })?;
                Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
            })
            .await?;

        rows.into_iter().map(LogRow::into_entry).collect()
    }
}

// ---------------------------------------------------------------------------
// Row helpers
// ---------------------------------------------------------------------------

type LogParams = (String, &'static str, String, &'static str, String, String, String, String, i64);

fn log_params(e: &AgentLogEntry) -> Result<LogParams> {
    Ok((
        e.agent.clone(),
        e.category.as_str(),
        e.model.clone(),
        e.status.as_str(),
        serde_json::to_string(&e.input)?,
        serde_json::to_string(&e.output)?,
        timestamp(&e.request_time),
        timestamp(&e.respond_time),
        i64::try_from(e.elapsed_ms).unwrap_or(i64::MAX),
    ))
}

struct LogRow {
    agent: String,
    category: String,
    model: String,
    status: String,
    input: String,
    output: String,
    request_time: String,
    respond_time: String,
    elapsed_ms: i64,
}

impl LogRow {
    fn into_entry(self) -> Result<AgentLogEntry> {
        Ok(AgentLogEntry {
            agent: self.agent,
            category: self.category.parse().map_err(SagaError::Serialization)?,
            model: self.model,
            status: self.status.parse().map_err(SagaError::Serialization)?,
            input: serde_json::from_str(&self.input)?,
            output: serde_json::from_str(&self.output)?,
            request_time: parse_timestamp(&self.request_time)?,
            respond_time: parse_timestamp(&self.respond_time)?,
            elapsed_ms: u64::try_from(self.elapsed_ms).unwrap_or(0),
        })
    }
}

fn chapter_from_row(row: &Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        chapter_number: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        summary: row.get(3)?,
        word_count: row.get(4)?,
        arc_number: row.get(5)?,
        volume_number: row.get(6)?,
    })
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| SagaError::Serialization(format!("bad timestamp '{raw}': {e}")))
}

/// Extension trait to convert `QueryReturnedNoRows` into `None`.
trait OptionalExt<T> {
    /// Convert `QueryReturnedNoRows` into `Ok(None)`.
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> std::result::Result<Option<T>, rusqlite::Error> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
