//! Timeline layer: events, periods and the story clock.

use std::sync::Arc;

use async_trait::async_trait;
use saga_core::memory::Timeline;
use saga_core::novel::NovelConfig;
use saga_core::persistence::RelationalStore;
use saga_core::types::{Chapter, ChapterNumber, LayerType, Snapshot};
use saga_llm::agents::{GenTimelineAgent, TimelineAgent, TimelineUpdateInput};
use saga_llm::{AgentCatalogue, RacingEngine};
use tracing::{info, warn};

use crate::error::{MemoryError, Result};
use crate::layer::{previous_chapter, MemoryLayer, SnapshotStream};

/// Chapter-keyed timeline snapshots.
pub struct TimelineLayer {
    snapshots: SnapshotStream<Timeline>,
    engine: RacingEngine,
    update_agent: TimelineAgent,
    genesis_agent: GenTimelineAgent,
    novel: Arc<NovelConfig>,
}

impl TimelineLayer {
    /// Create the layer.
    #[must_use]
    pub fn new(
        store: Arc<dyn RelationalStore>,
        engine: RacingEngine,
        agents: &AgentCatalogue,
        novel: Arc<NovelConfig>,
    ) -> Self {
        Self {
            snapshots: SnapshotStream::new(store, LayerType::Timeline),
            engine,
            update_agent: agents.timeline.clone(),
            genesis_agent: agents.gen_timeline.clone(),
            novel,
        }
    }

    /// The underlying snapshot stream.
    #[must_use]
    pub fn snapshots(&self) -> &SnapshotStream<Timeline> {
        &self.snapshots
    }
}

/// Keep the story clock from running backwards.
///
/// Returns `true` if `next` had to be corrected.
pub(crate) fn hold_story_time(prior: &Timeline, next: &mut Timeline, chapter: ChapterNumber) -> bool {
    if next.current_story_time >= prior.current_story_time {
        return false;
    }
    warn!(
        chapter,
        prior_year = prior.current_story_time.year,
        generated_year = next.current_story_time.year,
        "Generated story time moves backwards, keeping the prior time"
    );
    next.current_story_time = prior.current_story_time;
    true
}

#[async_trait]
impl MemoryLayer for TimelineLayer {
    type Query = ChapterNumber;
    type Output = Snapshot<Timeline>;
    type Update = Chapter;

    fn layer_type(&self) -> LayerType {
        LayerType::Timeline
    }

    async fn fetch(&self, chapter: ChapterNumber) -> Result<Snapshot<Timeline>> {
        self.snapshots
            .fetch_or_genesis(chapter, || async {
                self.engine
                    .run(&self.genesis_agent, self.novel.as_ref())
                    .await
                    .map_err(MemoryError::from)
            })
            .await
    }

    async fn update(&self, chapter: Chapter) -> Result<()> {
        let number = chapter.chapter_number;
        let prior = self.fetch(previous_chapter(LayerType::Timeline, number)?).await?.value;

        let input = TimelineUpdateInput { cur_timeline: prior, new_chapter: chapter };
        let mut next = self.engine.run(&self.update_agent, &input).await?;
        hold_story_time(&input.cur_timeline, &mut next, number);

        let events = next.events.len();
        self.snapshots.write(number, next).await?;
        info!(chapter = number, events, "Timeline updated");
        Ok(())
    }
}
