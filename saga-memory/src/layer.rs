//! The [`MemoryLayer`] contract and the chapter-keyed snapshot stream the
//! stateful layers persist through.
//!
//! A layer answers two questions: "what did the story know after chapter N"
//! (`fetch`) and "fold chapter N into what the story knows" (`update`). The
//! snapshot-bearing layers (character, timeline, world, plot) share the same
//! storage discipline, implemented once by [`SnapshotStream`]:
//!
//! - rows are append-only, keyed by `(layer, chapter)`, newest write wins;
//! - a missing row for chapter 0 is synthesized lazily by the layer;
//! - a missing row for any other chapter is a broken caller precondition.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use saga_core::persistence::RelationalStore;
use saga_core::types::{ChapterNumber, LayerType, Snapshot, SnapshotRecord};
use saga_core::SagaError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{MemoryError, Result};

/// One memory layer of the narrative context.
///
/// Layers are long-lived services; share them behind `Arc` and call them from
/// one generation cycle at a time. The core does not serialize calls across
/// layers, so a caller that depends on chapter N−1 must await it first.
#[async_trait]
pub trait MemoryLayer: Send + Sync {
    /// What `fetch` is asked for.
    type Query: Send;
    /// What `fetch` returns.
    type Output: Send;
    /// The material `update` folds in.
    type Update: Send;

    /// Which layer this is.
    fn layer_type(&self) -> LayerType;

    /// Context weight used when assembling prompts.
    fn weight(&self) -> f32 {
        self.layer_type().default_weight()
    }

    /// Read the layer.
    ///
    /// # Errors
    ///
    /// Layer-specific; see each implementation.
    async fn fetch(&self, query: Self::Query) -> Result<Self::Output>;

    /// Fold new material into the layer.
    ///
    /// # Errors
    ///
    /// Layer-specific; see each implementation.
    async fn update(&self, update: Self::Update) -> Result<()>;
}

/// The chapter a layer must already hold before it can accept `chapter`.
///
/// # Errors
///
/// [`MemoryError::InvalidUpdate`] for chapter 0, which is genesis-only.
pub fn previous_chapter(layer: LayerType, chapter: ChapterNumber) -> Result<ChapterNumber> {
    chapter.checked_sub(1).ok_or_else(|| MemoryError::InvalidUpdate {
        layer,
        chapter,
        reason: "chapter 0 is synthesized on first fetch and cannot be updated".into(),
    })
}

// ---------------------------------------------------------------------------
// Snapshot stream
// ---------------------------------------------------------------------------

/// Typed view of one layer's rows in a [`RelationalStore`].
pub struct SnapshotStream<T> {
    store: Arc<dyn RelationalStore>,
    layer: LayerType,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for SnapshotStream<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            layer: self.layer,
            _value: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for SnapshotStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStream").field("layer", &self.layer).finish_non_exhaustive()
    }
}

impl<T> SnapshotStream<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    /// A stream over `layer`'s rows.
    #[must_use]
    pub fn new(store: Arc<dyn RelationalStore>, layer: LayerType) -> Self {
        Self {
            store,
            layer,
            _value: PhantomData,
        }
    }

    /// The layer this stream belongs to.
    #[must_use]
    pub fn layer(&self) -> LayerType {
        self.layer
    }

    /// The authoritative snapshot for `chapter`, if one was written.
    ///
    /// # Errors
    ///
    /// Storage failures, or a stored document that no longer decodes as `T`.
    pub async fn read(&self, chapter: ChapterNumber) -> Result<Option<Snapshot<T>>> {
        let Some(record) = self.store.latest_snapshot(self.layer, chapter).await? else {
            return Ok(None);
        };
        Ok(Some(decode(record)?))
    }

    /// Like [`read`](Self::read), but a missing row is
    /// [`SagaError::SnapshotNotFound`].
    ///
    /// # Errors
    ///
    /// As [`read`](Self::read), plus the missing-snapshot error.
    pub async fn require(&self, chapter: ChapterNumber) -> Result<Snapshot<T>> {
        let layer = self.layer;
        self.read(chapter)
            .await?
            .ok_or_else(|| MemoryError::Storage(SagaError::SnapshotNotFound { layer, chapter }))
    }

    /// The snapshot for `chapter`, synthesizing and persisting chapter 0 with
    /// `genesis` when it does not exist yet.
    ///
    /// Once written, later calls read the stored genesis back instead of
    /// regenerating it.
    ///
    /// # Errors
    ///
    /// [`SagaError::SnapshotNotFound`] for a missing chapter other than 0, or
    /// whatever `genesis` and storage fail with.
    pub async fn fetch_or_genesis<F, Fut>(&self, chapter: ChapterNumber, genesis: F) -> Result<Snapshot<T>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
    {
        if let Some(snapshot) = self.read(chapter).await? {
            return Ok(snapshot);
        }
        if chapter != 0 {
            return Err(SagaError::SnapshotNotFound { layer: self.layer, chapter }.into());
        }

        let start = Instant::now();
        info!(layer = %self.layer, "No genesis snapshot, synthesizing");
        let value = genesis().await?;
        let snapshot = self.write(0, value).await?;
        info!(
            layer = %self.layer,
            elapsed_ms = start.elapsed().as_millis(),
            "Genesis snapshot committed"
        );
        Ok(snapshot)
    }

    /// Append `value` as the newest snapshot for `chapter`.
    ///
    /// # Errors
    ///
    /// Serialization or storage failures.
    pub async fn write(&self, chapter: ChapterNumber, value: T) -> Result<Snapshot<T>> {
        let data = serde_json::to_value(&value).map_err(SagaError::from)?;
        let record = self.store.insert_snapshot(self.layer, chapter, data).await?;
        debug!(layer = %self.layer, chapter, "Committed snapshot");
        Ok(Snapshot {
            chapter: record.chapter,
            last_updated: record.last_updated,
            value,
        })
    }

    /// Chapters this layer holds snapshots for, ascending.
    ///
    /// # Errors
    ///
    /// Storage failures.
    pub async fn chapters(&self) -> Result<Vec<ChapterNumber>> {
        Ok(self.store.snapshot_chapters(self.layer).await?)
    }
}

fn decode<T: DeserializeOwned>(record: SnapshotRecord) -> Result<Snapshot<T>> {
    let value = serde_json::from_value(record.data).map_err(SagaError::from)?;
    Ok(Snapshot {
        chapter: record.chapter,
        last_updated: record.last_updated,
        value,
    })
}
