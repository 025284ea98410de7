//! The memory context: every layer wired over one store, one vector index,
//! one embedder and one racing engine.
//!
//! Handles are passed in explicitly; nothing here is global. [`open`] builds
//! the production wiring from configuration, [`MemoryContext::assemble`]
//! accepts any implementations (tests use in-memory stores and fakes).

use std::sync::Arc;
use std::time::Instant;

use saga_core::config::SagaConfig;
use saga_core::embedding::EmbeddingProvider;
use saga_core::memory::CharacterState;
use saga_core::novel::NovelConfig;
use saga_core::persistence::{RelationalStore, SqliteStore};
use saga_core::types::{Chapter, ChapterNumber, LayerType};
use saga_core::vector::{SqliteVectorStore, VectorStore};
use saga_llm::prompt::PromptEngine;
use saga_llm::{AgentCatalogue, HttpEmbeddingProvider, LlmClient, RacingEngine};
use tracing::info;

use crate::error::Result;
use crate::layer::MemoryLayer;
use crate::layers::{
    CharacterLayer, CharacterUpdate, EpisodicLayer, PlotLayer, SemanticDocument, SemanticKind, SemanticLayer,
    ThemeLayer, TimelineLayer, WorldStateLayer,
};
use crate::resolution::EntityResolver;

/// The shared collaborators a context is built from.
pub struct ContextParts {
    /// Snapshots, chapters and agent logs.
    pub store: SqliteStore,
    /// Semantic vector index.
    pub vectors: Arc<dyn VectorStore>,
    /// Embedder for semantic retrieval and entity resolution.
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// Racing engine for every LLM-backed layer.
    pub engine: RacingEngine,
    /// Agent definitions.
    pub agents: AgentCatalogue,
}

/// All seven layers plus entity resolution.
pub struct MemoryContext {
    /// Recent chapter text.
    pub episodic: Arc<EpisodicLayer>,
    /// Characters and groups.
    pub character: Arc<CharacterLayer>,
    /// Events and the story clock.
    pub timeline: Arc<TimelineLayer>,
    /// World-building state.
    pub world: Arc<WorldStateLayer>,
    /// Foreshadowing, conflicts and goals.
    pub plot: Arc<PlotLayer>,
    /// Theme projection.
    pub theme: Arc<ThemeLayer>,
    /// Vector retrieval.
    pub semantic: Arc<SemanticLayer>,
    /// Mention-to-character resolution.
    pub resolver: EntityResolver,
    store: SqliteStore,
}

/// Open the production context described by `config`.
///
/// # Errors
///
/// The database cannot be opened, or an HTTP client cannot be built.
pub fn open(config: &SagaConfig, novel: NovelConfig) -> Result<MemoryContext> {
    let store = SqliteStore::open(&config.persistence.path, &config.persistence)?;
    let vectors = SqliteVectorStore::attach(&store)?;
    let client = LlmClient::from_config(&config.llm)?;
    let embedder = HttpEmbeddingProvider::from_config(&config.embedding, config.llm.request_timeout_ms)?;

    let parts = ContextParts {
        engine: RacingEngine::with_store(client, store.clone()),
        store,
        vectors: Arc::new(vectors),
        embedder: Arc::new(embedder),
        agents: AgentCatalogue::from_config(&config.llm.agents, PromptEngine::builtin()),
    };
    Ok(MemoryContext::assemble(config, novel, parts))
}

impl MemoryContext {
    /// Wire every layer over `parts`.
    #[must_use]
    pub fn assemble(config: &SagaConfig, novel: NovelConfig, parts: ContextParts) -> Self {
        let ContextParts { store, vectors, embedder, engine, agents } = parts;
        let novel = Arc::new(novel);
        let relational: Arc<dyn RelationalStore> = Arc::new(store.clone());

        let timeline = Arc::new(TimelineLayer::new(
            Arc::clone(&relational),
            engine.clone(),
            &agents,
            Arc::clone(&novel),
        ));
        let character = Arc::new(CharacterLayer::new(
            Arc::clone(&relational),
            Arc::clone(&timeline),
            engine.clone(),
            &agents,
            Arc::clone(&novel),
        ));

        Self {
            episodic: Arc::new(EpisodicLayer::new(
                Arc::clone(&relational),
                config.episodic.default_window_size,
            )),
            character,
            timeline,
            world: Arc::new(WorldStateLayer::new(
                Arc::clone(&relational),
                engine.clone(),
                &agents,
                Arc::clone(&novel),
            )),
            plot: Arc::new(PlotLayer::new(relational, engine, &agents)),
            theme: Arc::new(ThemeLayer::new(novel)),
            semantic: Arc::new(SemanticLayer::new(Arc::clone(&embedder), vectors, config.semantic.clone())),
            resolver: EntityResolver::new(embedder, &config.entity),
            store,
        }
    }

    /// The relational store every layer writes to.
    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Context weight per layer, highest first.
    #[must_use]
    pub fn layer_weights(&self) -> Vec<(LayerType, f32)> {
        let mut weights = vec![
            (self.episodic.layer_type(), self.episodic.weight()),
            (self.character.layer_type(), self.character.weight()),
            (self.timeline.layer_type(), self.timeline.weight()),
            (self.world.layer_type(), self.world.weight()),
            (self.plot.layer_type(), self.plot.weight()),
            (self.theme.layer_type(), self.theme.weight()),
            (self.semantic.layer_type(), self.semantic.weight()),
        ];
        weights.sort_by(|a, b| b.1.total_cmp(&a.1));
        weights
    }

    /// The characters of the previous chapter that `chapter_text` mentions.
    ///
    /// # Errors
    ///
    /// See [`CharacterLayer::involved_in`].
    pub async fn involved_characters(
        &self,
        chapter_number: ChapterNumber,
        chapter_text: &str,
    ) -> Result<CharacterState> {
        self.character.involved_in(&self.resolver, chapter_number, chapter_text).await
    }

    /// Persist a finished chapter and bring every layer up to it.
    ///
    /// Layers update one after another: timeline, characters, world state,
    /// plot, then the semantic index under id `chapter-<n>`. The first
    /// failure stops the sequence; layers already updated keep their new
    /// snapshot.
    ///
    /// # Errors
    ///
    /// The first storage, racing or indexing failure.
    pub async fn commit_chapter(&self, chapter: Chapter, involved: Option<CharacterState>) -> Result<()> {
        let start = Instant::now();
        let number = chapter.chapter_number;
        self.store.save_chapter(&chapter).await?;

        self.timeline.update(chapter.clone()).await?;
        self.character
            .update(CharacterUpdate { chapter: chapter.clone(), involved })
            .await?;
        self.world.update(chapter.clone()).await?;
        self.plot.update(chapter.clone()).await?;
        self.semantic
            .update(
                SemanticDocument::new(SemanticKind::ChapterContent, chapter.text)
                    .with_id(format!("chapter-{number}"))
                    .with_metadata("chapter", number),
            )
            .await?;

        info!(chapter = number, elapsed_ms = start.elapsed().as_millis(), "Chapter committed to memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::{EpisodicQuery, SemanticQuery};
    use crate::testing::{
        engine, single_model_agents, CannedClient, CHARACTERS_GENESIS, TIMELINE_GENESIS, WORLD_GENESIS,
    };
    use saga_core::embedding::HashingEmbeddingProvider;

    const PLOT_AFTER_ONE: &str = r#"{
        "foreshadowings": [{ "description": "古剑低鸣", "progress": 0.1 }],
        "conflicts": [],
        "character_goals": []
    }"#;

    fn context(client: &Arc<CannedClient>) -> MemoryContext {
        let store = SqliteStore::open_in_memory().expect("store");
        let vectors = SqliteVectorStore::attach(&store).expect("vectors");
        let parts = ContextParts {
            engine: engine(client, &store),
            store,
            vectors: Arc::new(vectors),
            embedder: Arc::new(HashingEmbeddingProvider::new(1024)),
            agents: single_model_agents(),
        };
        MemoryContext::assemble(&SagaConfig::default(), NovelConfig::default(), parts)
    }

    fn full_client() -> Arc<CannedClient> {
        Arc::new(
            CannedClient::default()
                .reply("Timeline", TIMELINE_GENESIS)
                .reply("CharacterState", CHARACTERS_GENESIS)
                .reply("World", WORLD_GENESIS)
                .reply("PlotMemory", PLOT_AFTER_ONE),
        )
    }

    #[test]
    fn layer_weights_are_ranked() {
        let ctx = context(&Arc::new(CannedClient::default()));
        let weights = ctx.layer_weights();
        assert_eq!(weights.len(), 7);
        assert_eq!(weights[0], (LayerType::Episodic, 1.5));
        assert_eq!(weights[6], (LayerType::Theme, 0.8));
    }

    #[tokio::test]
    async fn commit_chapter_advances_every_layer() {
        let client = full_client();
        let ctx = context(&client);

        ctx.commit_chapter(Chapter::new(1, "山门", "萧瑾宸拜入天剑宗，古剑低鸣。"), None)
            .await
            .expect("commit");

        assert_eq!(ctx.timeline.fetch(1).await.expect("timeline").chapter, 1);
        assert_eq!(ctx.character.fetch(1).await.expect("characters").value.characters.len(), 2);
        assert!(ctx.world.fetch(1).await.expect("world").value.factions.contains_key("tianjian"));
        assert_eq!(ctx.plot.fetch(1).await.expect("plot").value.foreshadowings.len(), 1);

        let hits = ctx
            .semantic
            .fetch(SemanticQuery::new("萧瑾宸拜入天剑宗", SemanticKind::ChapterContent))
            .await
            .expect("semantic");
        assert_eq!(hits[0].source_id, "chapter-1");

        ctx.store()
            .save_chapter(&Chapter::new(2, "下山", "……"))
            .await
            .expect("save");
        let window = ctx.episodic.fetch(EpisodicQuery::before(2)).await.expect("episodic");
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].title, "山门");
    }

    #[tokio::test]
    async fn failed_layer_stops_the_commit() {
        let client = Arc::new(
            CannedClient::default()
                .reply("Timeline", TIMELINE_GENESIS)
                .reply("CharacterState", CHARACTERS_GENESIS)
                .fail("World", "upstream down"),
        );
        let ctx = context(&client);

        let err = ctx
            .commit_chapter(Chapter::new(1, "山门", "……"), None)
            .await
            .expect_err("world race fails");
        assert!(err.to_string().contains("upstream down"));
        assert!(ctx.character.snapshots().read(1).await.expect("read").is_some());
        assert!(ctx.plot.snapshots().read(1).await.expect("read").is_none());
        assert_eq!(client.calls("PlotMemory"), 0);
    }

    #[tokio::test]
    async fn involved_characters_use_the_previous_chapter() {
        let client = Arc::new(
            CannedClient::default()
                .reply("Timeline", TIMELINE_GENESIS)
                .reply("CharacterState", CHARACTERS_GENESIS)
                .reply("CharacterNames", r#"[{ "name": "林小月" }]"#),
        );
        let ctx = context(&client);
        let involved = ctx.involved_characters(1, "林小月提灯而来。").await.expect("involved");
        assert_eq!(involved.characters[0].character_id, "char_linxiaoyue");
    }
}
