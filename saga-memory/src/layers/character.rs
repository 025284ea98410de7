//! Character layer: characters and character groups.
//!
//! Genesis builds the roster from the novel configuration and the genesis
//! timeline. Each update asks the model for the state of the characters a
//! chapter touched and reconciles that against the previous chapter, so
//! characters the chapter never mentioned carry over unchanged.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use saga_core::memory::CharacterState;
use saga_core::novel::NovelConfig;
use saga_core::persistence::RelationalStore;
use saga_core::types::{Chapter, ChapterNumber, LayerType, Snapshot};
use saga_llm::agents::{CharacterAgent, CharacterAgentInput, CharacterNameExtractionAgent, GenCharacterAgent, GenCharacterInput};
use saga_llm::{AgentCatalogue, RacingEngine};
use tracing::{info, warn};

use super::timeline::TimelineLayer;
use crate::error::{MemoryError, Result};
use crate::layer::{previous_chapter, MemoryLayer, SnapshotStream};
use crate::reconcile::reconcile;
use crate::resolution::EntityResolver;

/// Material for a character update.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterUpdate {
    /// The chapter just written.
    pub chapter: Chapter,
    /// The slice of the previous state the chapter involves. The whole
    /// previous state is sent to the model when `None`.
    pub involved: Option<CharacterState>,
}

impl From<Chapter> for CharacterUpdate {
    fn from(chapter: Chapter) -> Self {
        Self { chapter, involved: None }
    }
}

/// Chapter-keyed, reconciled character snapshots.
pub struct CharacterLayer {
    snapshots: SnapshotStream<CharacterState>,
    timeline: Arc<TimelineLayer>,
    engine: RacingEngine,
    update_agent: CharacterAgent,
    genesis_agent: GenCharacterAgent,
    name_agent: CharacterNameExtractionAgent,
    novel: Arc<NovelConfig>,
}

impl CharacterLayer {
    /// Create the layer. Genesis and updates read `timeline` for context.
    #[must_use]
    pub fn new(
        store: Arc<dyn RelationalStore>,
        timeline: Arc<TimelineLayer>,
        engine: RacingEngine,
        agents: &AgentCatalogue,
        novel: Arc<NovelConfig>,
    ) -> Self {
        Self {
            snapshots: SnapshotStream::new(store, LayerType::Character),
            timeline,
            engine,
            update_agent: agents.character.clone(),
            genesis_agent: agents.gen_character.clone(),
            name_agent: agents.name_extraction.clone(),
            novel,
        }
    }

    /// The underlying snapshot stream.
    #[must_use]
    pub fn snapshots(&self) -> &SnapshotStream<CharacterState> {
        &self.snapshots
    }

    /// The characters and groups of the state before `chapter_number` that
    /// `chapter_text` mentions, by name or alias.
    ///
    /// # Errors
    ///
    /// A missing previous snapshot, a failed extraction race, or an
    /// embedding failure.
    pub async fn involved_in(
        &self,
        resolver: &EntityResolver,
        chapter_number: ChapterNumber,
        chapter_text: &str,
    ) -> Result<CharacterState> {
        let prior = self.fetch(previous_chapter(LayerType::Character, chapter_number)?).await?;
        resolver
            .resolve_chapter(&self.engine, &self.name_agent, chapter_text, &prior.value)
            .await
    }

    async fn genesis(&self) -> Result<CharacterState> {
        let timeline = self.timeline.fetch(0).await?;
        let input = GenCharacterInput {
            novel_config: self.novel.as_ref().clone(),
            timeline: Some(timeline.value),
        };
        Ok(self.engine.run(&self.genesis_agent, &input).await?)
    }
}

#[async_trait]
impl MemoryLayer for CharacterLayer {
    type Query = ChapterNumber;
    type Output = Snapshot<CharacterState>;
    type Update = CharacterUpdate;

    fn layer_type(&self) -> LayerType {
        LayerType::Character
    }

    async fn fetch(&self, chapter: ChapterNumber) -> Result<Snapshot<CharacterState>> {
        self.snapshots.fetch_or_genesis(chapter, || self.genesis()).await
    }

    async fn update(&self, update: CharacterUpdate) -> Result<()> {
        let start = Instant::now();
        let number = update.chapter.chapter_number;
        let previous = previous_chapter(LayerType::Character, number)?;
        let prior = self.fetch(previous).await?.value;

        let current_timeline = match self.timeline.fetch(previous).await {
            Ok(snapshot) => Some(snapshot.value),
            Err(err) => {
                warn!(chapter = previous, error = %err, "No timeline for character update, continuing without");
                None
            }
        };

        let input = CharacterAgentInput {
            cur_state: update.involved.unwrap_or_else(|| prior.clone()),
            new_chapter: update.chapter,
            current_timeline,
        };
        let generated = self.engine.run(&self.update_agent, &input).await.map_err(MemoryError::from)?;
        let touched = generated.characters.len();
        let merged = reconcile(&prior, generated);

        info!(
            chapter = number,
            touched,
            characters = merged.characters.len(),
            groups = merged.character_groups.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Character state reconciled"
        );
        self.snapshots.write(number, merged).await?;
        Ok(())
    }
}
