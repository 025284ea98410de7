//! World-state layer: geography, magic, factions, artifacts, culture, physics.

use std::sync::Arc;

use async_trait::async_trait;
use saga_core::memory::World;
use saga_core::novel::NovelConfig;
use saga_core::persistence::RelationalStore;
use saga_core::types::{Chapter, ChapterNumber, LayerType, Snapshot};
use saga_llm::agents::{GenWorldStateAgent, WorldStateAgent, WorldStateUpdateInput};
use saga_llm::{AgentCatalogue, RacingEngine};
use tracing::info;

use crate::error::{MemoryError, Result};
use crate::layer::{previous_chapter, MemoryLayer, SnapshotStream};

/// Chapter-keyed world snapshots. Updates are stored exactly as generated.
pub struct WorldStateLayer {
    snapshots: SnapshotStream<World>,
    engine: RacingEngine,
    update_agent: WorldStateAgent,
    genesis_agent: GenWorldStateAgent,
    novel: Arc<NovelConfig>,
}

impl WorldStateLayer {
    /// Create the layer.
    #[must_use]
    pub fn new(
        store: Arc<dyn RelationalStore>,
        engine: RacingEngine,
        agents: &AgentCatalogue,
        novel: Arc<NovelConfig>,
    ) -> Self {
        Self {
            snapshots: SnapshotStream::new(store, LayerType::WorldState),
            engine,
            update_agent: agents.world_state.clone(),
            genesis_agent: agents.gen_world_state.clone(),
            novel,
        }
    }

    /// The underlying snapshot stream.
    #[must_use]
    pub fn snapshots(&self) -> &SnapshotStream<World> {
        &self.snapshots
    }
}

#[async_trait]
impl MemoryLayer for WorldStateLayer {
    type Query = ChapterNumber;
    type Output = Snapshot<World>;
    type Update = Chapter;

    fn layer_type(&self) -> LayerType {
        LayerType::WorldState
    }

    async fn fetch(&self, chapter: ChapterNumber) -> Result<Snapshot<World>> {
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
        let prior = self.fetch(previous_chapter(LayerType::WorldState, number)?).await?.value;

        let input = WorldStateUpdateInput { cur_world_state: prior, new_chapter: chapter };
        let next = self.engine.run(&self.update_agent, &input).await?;

        let factions = next.factions.len();
        self.snapshots.write(number, next).await?;
        info!(chapter = number, factions, "World state updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{engine, single_model_agents, CannedClient, WORLD_GENESIS};
    use saga_core::persistence::SqliteStore;

    #[tokio::test]
    async fn update_stores_the_generated_world_verbatim() {
        let grown = r#"{ "factions": {
            "tianjian": { "name": "天剑宗" },
            "xuemo": { "name": "血魔殿", "territories": ["北荒"] }
        } }"#;
        let client = Arc::new(CannedClient::default().reply("World", WORLD_GENESIS).reply("World", grown));
        let store = SqliteStore::open_in_memory().expect("store");
        let layer = WorldStateLayer::new(
            Arc::new(store.clone()),
            engine(&client, &store),
            &single_model_agents(),
            Arc::new(NovelConfig::default()),
        );

        let genesis = layer.fetch(0).await.expect("genesis");
        assert_eq!(genesis.value.factions["tianjian"].hierarchy, vec!["宗主", "长老"]);

        layer.update(Chapter::new(1, "北荒", "血魔殿现世。")).await.expect("update");
        let world = layer.fetch(1).await.expect("chapter 1").value;
        assert_eq!(world.factions.len(), 2);
        assert!(world.factions["tianjian"].hierarchy.is_empty());
        assert_eq!(world.factions["xuemo"].territories, vec!["北荒"]);
        assert_eq!(client.calls("World"), 2);
    }

    #[tokio::test]
    async fn failed_race_leaves_no_snapshot() {
        let client = Arc::new(CannedClient::default().fail("World", "upstream down"));
        let store = SqliteStore::open_in_memory().expect("store");
        let layer = WorldStateLayer::new(
            Arc::new(store.clone()),
            engine(&client, &store),
            &single_model_agents(),
            Arc::new(NovelConfig::default()),
        );

        let err = layer.fetch(0).await.expect_err("race fails");
        assert!(matches!(err, MemoryError::Llm(_)));
        assert!(err.to_string().contains("upstream down"));
        assert!(layer.snapshots().chapters().await.expect("chapters").is_empty());
    }
}
