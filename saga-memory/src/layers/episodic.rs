//! Episodic layer: the raw text of the chapters just before the one being
//! written. Chapters are committed by the chapter store, never through here.

use std::sync::Arc;

use async_trait::async_trait;
use saga_core::persistence::RelationalStore;
use saga_core::types::{Chapter, ChapterNumber, LayerType};
use tracing::debug;

use crate::error::Result;
use crate::layer::MemoryLayer;

/// Which window to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodicQuery {
    /// The chapter whose predecessors are wanted.
    pub chapter_number: ChapterNumber,
    /// How many predecessors; the layer default when `None`.
    pub window_size: Option<u32>,
}

impl EpisodicQuery {
    /// The default-sized window before `chapter_number`.
    #[must_use]
    pub fn before(chapter_number: ChapterNumber) -> Self {
        Self { chapter_number, window_size: None }
    }

    /// Override the window size.
    #[must_use]
    pub fn with_window(mut self, window_size: u32) -> Self {
        self.window_size = Some(window_size);
        self
    }
}

/// Recent-chapter window over the chapter store.
pub struct EpisodicLayer {
    store: Arc<dyn RelationalStore>,
    default_window: u32,
}

impl EpisodicLayer {
    /// Create the layer.
    #[must_use]
    pub fn new(store: Arc<dyn RelationalStore>, default_window: u32) -> Self {
        Self { store, default_window }
    }
}

#[async_trait]
impl MemoryLayer for EpisodicLayer {
    type Query = EpisodicQuery;
    type Output = Vec<Chapter>;
    type Update = ();

    fn layer_type(&self) -> LayerType {
        LayerType::Episodic
    }

    /// Chapters `max(1, n − window) ..= n − 1`, ascending.
    ///
    /// Empty when `n` is past the highest committed chapter, or when there is
    /// nothing before it.
    async fn fetch(&self, query: EpisodicQuery) -> Result<Vec<Chapter>> {
        let n = query.chapter_number;
        let window = query.window_size.unwrap_or(self.default_window);
        let max = self.store.max_chapter_number().await?.unwrap_or(0);

        if n > max || n <= 1 || window == 0 {
            debug!(chapter = n, max, window, "Empty episodic window");
            return Ok(Vec::new());
        }

        let start = n.saturating_sub(window).max(1);
        let chapters = self.store.chapters_in_range(start, n - 1).await?;
        debug!(chapter = n, from = start, count = chapters.len(), "Fetched episodic window");
        Ok(chapters)
    }

    async fn update(&self, _update: ()) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga_core::persistence::SqliteStore;

    async fn layer_with(chapters: ChapterNumber) -> EpisodicLayer {
        let store = SqliteStore::open_in_memory().expect("store");
        for n in 1..=chapters {
            store
                .save_chapter(&Chapter::new(n, format!("第{n}章"), format!("正文{n}")))
                .await
                .expect("save");
        }
        EpisodicLayer::new(Arc::new(store), 3)
    }

    fn numbers(chapters: &[Chapter]) -> Vec<ChapterNumber> {
        chapters.iter().map(|c| c.chapter_number).collect()
    }

    #[tokio::test]
    async fn default_window_clips_to_three() {
        let layer = layer_with(8).await;
        let window = layer.fetch(EpisodicQuery::before(6)).await.expect("fetch");
        assert_eq!(numbers(&window), vec![3, 4, 5]);
        assert_eq!(window[0].text, "正文3");
    }

    #[tokio::test]
    async fn window_is_clipped_at_chapter_one() {
        let layer = layer_with(8).await;
        let window = layer.fetch(EpisodicQuery::before(3).with_window(10)).await.expect("fetch");
        assert_eq!(numbers(&window), vec![1, 2]);
    }

    #[tokio::test]
    async fn past_the_last_committed_chapter_is_empty() {
        let layer = layer_with(4).await;
        assert!(layer.fetch(EpisodicQuery::before(5)).await.expect("fetch").is_empty());
        assert_eq!(numbers(&layer.fetch(EpisodicQuery::before(4)).await.expect("fetch")), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn nothing_committed_is_empty() {
        let layer = layer_with(0).await;
        assert!(layer.fetch(EpisodicQuery::before(1)).await.expect("fetch").is_empty());
        assert!((layer.weight() - 1.5).abs() < f32::EPSILON);
    }
}
