//! Plot layer: open foreshadowings, conflicts and character goals.
//!
//! Genesis is an empty plot memory; nothing is unresolved before the story
//! starts, so no model is consulted for chapter 0.

use std::sync::Arc;

use async_trait::async_trait;
use saga_core::memory::PlotMemory;
use saga_core::persistence::RelationalStore;
use saga_core::types::{Chapter, ChapterNumber, LayerType, Snapshot};
use saga_llm::agents::{PlotAgent, PlotUpdateInput};
use saga_llm::{AgentCatalogue, RacingEngine};
use tracing::info;

use crate::error::{MemoryError, Result};
use crate::layer::{previous_chapter, MemoryLayer, SnapshotStream};

/// Chapter-keyed plot snapshots.
pub struct PlotLayer {
    snapshots: SnapshotStream<PlotMemory>,
    engine: RacingEngine,
    agent: PlotAgent,
}

impl PlotLayer {
    /// Create the layer.
    #[must_use]
    pub fn new(store: Arc<dyn RelationalStore>, engine: RacingEngine, agents: &AgentCatalogue) -> Self {
        Self {
            snapshots: SnapshotStream::new(store, LayerType::Plot),
            engine,
            agent: agents.plot.clone(),
        }
    }

    /// The underlying snapshot stream.
    #[must_use]
    pub fn snapshots(&self) -> &SnapshotStream<PlotMemory> {
        &self.snapshots
    }
}

#[async_trait]
impl MemoryLayer for PlotLayer {
    type Query = ChapterNumber;
    type Output = Snapshot<PlotMemory>;
    type Update = Chapter;

    fn layer_type(&self) -> LayerType {
        LayerType::Plot
    }

    async fn fetch(&self, chapter: ChapterNumber) -> Result<Snapshot<PlotMemory>> {
        self.snapshots
            .fetch_or_genesis(chapter, || async { Ok::<_, MemoryError>(PlotMemory::empty()) })
            .await
    }

    async fn update(&self, chapter: Chapter) -> Result<()> {
        let number = chapter.chapter_number;
        let prior = self.fetch(previous_chapter(LayerType::Plot, number)?).await?.value;

        let input = PlotUpdateInput { cur_plot: prior, new_chapter: chapter };
        let next = self.engine.run(&self.agent, &input).await?;

        let completed = next.completed_count();
        self.snapshots.write(number, next).await?;
        info!(chapter = number, completed, "Plot updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{engine, single_model_agents, CannedClient};
    use saga_core::persistence::SqliteStore;

    fn layer(client: &Arc<CannedClient>) -> PlotLayer {
        let store = SqliteStore::open_in_memory().expect("store");
        PlotLayer::new(Arc::new(store.clone()), engine(client, &store), &single_model_agents())
    }

    #[tokio::test]
    async fn genesis_is_empty_and_needs_no_model() {
        let client = Arc::new(CannedClient::default());
        let layer = layer(&client);

        let genesis = layer.fetch(0).await.expect("genesis");
        assert_eq!(genesis.value, PlotMemory::empty());
        assert_eq!(client.calls("PlotMemory"), 0);
        assert!((layer.weight() - 1.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn update_builds_on_the_previous_chapter() {
        let next = r#"{
            "foreshadowings": [{ "description": "师父的遗信", "progress": 0.2 }],
            "conflicts": [],
            "character_goals": [{ "character": "萧瑾宸", "goal": "重铸断剑", "progress": 0.0 }]
        }"#;
        let client = Arc::new(CannedClient::default().reply("PlotMemory", next));
        let layer = layer(&client);

        layer.update(Chapter::new(1, "断剑", "剑断了。")).await.expect("update 1");
        let plot = layer.fetch(1).await.expect("chapter 1").value;
        assert_eq!(plot.foreshadowings.len(), 1);
        assert_eq!(plot.character_goals[0].goal, "重铸断剑");
        assert_eq!(layer.snapshots().chapters().await.expect("chapters"), vec![0, 1]);
    }
}
