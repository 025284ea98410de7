//! Entity resolution: map free-text name mentions back to canonical
//! characters and the groups they belong to.
//!
//! Every canonical name and alias is embedded on its own, every distinct
//! mention is embedded once, and each mention takes its single best-scoring
//! name. A match counts only when cosine similarity is strictly above the
//! configured threshold; a character is reported once, at its first match.
//! Groups follow from the matched characters' memberships.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use saga_core::config::EntityConfig;
use saga_core::embedding::{cosine_similarity, EmbeddingProvider};
use saga_core::memory::{Character, CharacterGroup, CharacterState};
use saga_llm::agents::{CharacterNameExtractionAgent, NameExtractionInput};
use saga_llm::RacingEngine;
use tracing::{debug, info};

use crate::error::Result;

/// One embedded name of a known character.
#[derive(Debug, Clone, PartialEq)]
pub struct NameVector {
    /// Index into `CharacterState::characters`.
    pub character: usize,
    /// The embedded name or alias.
    pub name: String,
    /// Its embedding; `None` if the provider returned no chunk.
    pub vector: Option<Vec<f32>>,
}

/// Resolves name mentions against a character snapshot.
#[derive(Clone)]
pub struct EntityResolver {
    embedder: Arc<dyn EmbeddingProvider>,
    threshold: f32,
}

impl EntityResolver {
    /// Create a resolver.
    #[must_use]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, config: &EntityConfig) -> Self {
        Self {
            embedder,
            threshold: config.match_threshold,
        }
    }

    /// The similarity a mention must exceed to match.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Resolve `mentions` to the characters and groups of `state`.
    ///
    /// Returns an empty state without embedding anything when there are no
    /// mentions, or when `state` has neither characters nor groups. A state
    /// holding only groups resolves to nothing, since groups are reached
    /// through their matched members.
    ///
    /// # Errors
    ///
    /// Any embedding failure.
    pub async fn resolve(&self, mentions: &[String], state: &CharacterState) -> Result<CharacterState> {
        if mentions.is_empty() || (state.characters.is_empty() && state.character_groups.is_empty()) {
            debug!(mentions = mentions.len(), "Nothing to resolve");
            return Ok(CharacterState::default());
        }
        let start = Instant::now();

        let mut seen = HashSet::new();
        let distinct: Vec<&str> = mentions
            .iter()
            .map(String::as_str)
            .filter(|m| seen.insert(*m))
            .collect();

        let names = self.embed_names(&state.characters).await?;
        let mention_vectors =
            try_join_all(distinct.iter().map(|mention| self.embed_first(mention))).await?;

        let matched = best_matches(&mention_vectors, &names, self.threshold);
        let characters: Vec<Character> = matched.iter().map(|&i| state.characters[i].clone()).collect();
        let character_groups = groups_of(&characters, &state.character_groups);

        info!(
            mentions = distinct.len(),
            names = names.len(),
            characters = characters.len(),
            groups = character_groups.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "Resolved entity mentions"
        );
        Ok(CharacterState {
            characters,
            character_groups,
        })
    }

    /// Extract the names mentioned in `chapter_text` with the racing engine,
    /// then [`resolve`](Self::resolve) them.
    ///
    /// # Errors
    ///
    /// A failed extraction race, or any embedding failure.
    pub async fn resolve_chapter(
        &self,
        engine: &RacingEngine,
        agent: &CharacterNameExtractionAgent,
        chapter_text: &str,
        state: &CharacterState,
    ) -> Result<CharacterState> {
        if state.characters.is_empty() {
            return Ok(CharacterState::default());
        }
        let input = NameExtractionInput {
            chapter_text: chapter_text.to_string(),
        };
        let names = engine.run(agent, &input).await?;
        let mentions: Vec<String> = names.into_iter().map(|n| n.name).collect();
        debug!(mentions = mentions.len(), "Extracted character names");
        self.resolve(&mentions, state).await
    }

    /// Embed every canonical name and alias, one provider call per name.
    async fn embed_names(&self, characters: &[Character]) -> Result<Vec<NameVector>> {
        let pending = characters.iter().enumerate().flat_map(move |(index, character)| {
            character.identity.all_names().map(move |name| async move {
                Ok::<_, crate::error::MemoryError>(NameVector {
                    character: index,
                    name: name.to_string(),
                    vector: self.embed_first(name).await?,
                })
            })
        });
        try_join_all(pending).await
    }

    /// The first chunk's embedding of `text`.
    async fn embed_first(&self, text: &str) -> Result<Option<Vec<f32>>> {
        let embeddings = self.embedder.embed(text).await?;
        Ok(embeddings.into_iter().next().map(|e| e.0))
    }
}

/// For each mention, the best-scoring character if it clears `threshold`.
///
/// Returns character indices in first-match order, without repeats.
/// Undefined similarities (zero vectors, dimension mismatch) never match.
#[must_use]
pub fn best_matches(mentions: &[Option<Vec<f32>>], names: &[NameVector], threshold: f32) -> Vec<usize> {
    let mut matched = Vec::new();
    for mention in mentions.iter().flatten() {
        let best = names
            .iter()
            .filter_map(|candidate| {
                let vector = candidate.vector.as_deref()?;
                cosine_similarity(mention, vector).map(|score| (candidate.character, score))
            })
            .fold(None, |best: Option<(usize, f32)>, (character, score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((character, score)),
            });

        match best {
            Some((character, score)) if score > threshold && !matched.contains(&character) => {
                matched.push(character);
            }
            _ => {}
        }
    }
    matched
}

/// Every group with at least one of `characters` as a member, in the order
/// the matched characters were found.
#[must_use]
pub fn groups_of(characters: &[Character], groups: &[CharacterGroup]) -> Vec<CharacterGroup> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for character in characters {
        for group in groups {
            if group.has_member(&character.character_id) && seen.insert(group.group_id.as_str()) {
                found.push(group.clone());
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{character, engine, group, single_model_agents, CannedClient};
    use async_trait::async_trait;
    use saga_core::chunking::ChunkingInfo;
    use saga_core::embedding::{Embedding, HashingEmbeddingProvider};
    use saga_core::persistence::SqliteStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls on top of the hashing provider.
    struct Counting {
        inner: HashingEmbeddingProvider,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for Counting {
        async fn embed(&self, text: &str) -> saga_core::Result<Vec<Embedding>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text).await
        }
        fn chunking_info(&self) -> ChunkingInfo {
            self.inner.chunking_info()
        }
        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn resolver() -> (EntityResolver, Arc<Counting>) {
        let provider = Arc::new(Counting {
            inner: HashingEmbeddingProvider::new(4096),
            calls: AtomicUsize::new(0),
        });
        let resolver = EntityResolver::new(Arc::clone(&provider) as Arc<dyn EmbeddingProvider>, &EntityConfig::default());
        (resolver, provider)
    }

    fn mentions(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_string()).collect()
    }

    fn scenario() -> CharacterState {
        CharacterState {
            characters: vec![character("c1", "Alpha", &["X"]), character("c2", "Beta", &[])],
            character_groups: vec![group("G", &["c1", "c2"]), group("H", &["c2"])],
        }
    }

    #[tokio::test]
    async fn alias_mention_resolves_character_and_group() {
        let (resolver, _) = resolver();
        let resolved = resolver.resolve(&mentions(&["X"]), &scenario()).await.expect("resolve");
        let ids: Vec<_> = resolved.characters.iter().map(|c| c.character_id.as_str()).collect();
        let groups: Vec<_> = resolved.character_groups.iter().map(|g| g.group_id.as_str()).collect();
        assert_eq!(ids, vec!["c1"]);
        assert_eq!(groups, vec!["G"]);
    }

    #[tokio::test]
    async fn chinese_alias_matches_canonical_character() {
        let (resolver, _) = resolver();
        let state = CharacterState {
            characters: vec![character("char_xiaojinchen", "萧瑾宸", &["瑾宸"]), character("char_lin", "林小月", &[])],
            character_groups: vec![],
        };
        let resolved = resolver.resolve(&mentions(&["瑾宸"]), &state).await.expect("resolve");
        assert_eq!(resolved.characters.len(), 1);
        assert_eq!(resolved.characters[0].character_id, "char_xiaojinchen");

        let unrelated = resolver.resolve(&mentions(&["顾长风"]), &state).await.expect("resolve");
        assert!(unrelated.characters.is_empty());
    }

    #[tokio::test]
    async fn repeated_mentions_report_a_character_once() {
        let (resolver, provider) = resolver();
        let resolved = resolver
            .resolve(&mentions(&["Beta", "Beta", "Beta"]), &scenario())
            .await
            .expect("resolve");
        assert_eq!(resolved.characters.len(), 1);
        assert_eq!(resolved.character_groups.len(), 2);
        // Alpha, X, Beta, then one distinct mention.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_inputs_short_circuit_without_embedding() {
        let (resolver, provider) = resolver();
        let none = resolver.resolve(&[], &scenario()).await.expect("resolve");
        assert!(none.is_empty());
        let empty_state = resolver.resolve(&mentions(&["X"]), &CharacterState::default()).await.expect("resolve");
        assert!(empty_state.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn groups_without_characters_resolve_to_nothing() {
        let (resolver, provider) = resolver();
        let state = CharacterState {
            characters: vec![],
            character_groups: vec![group("G", &["c1"])],
        };
        let resolved = resolver.resolve(&mentions(&["X"]), &state).await.expect("resolve");
        assert!(resolved.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_vectors_never_match() {
        let names = vec![NameVector {
            character: 0,
            name: "A".into(),
            vector: Some(vec![0.0, 0.0]),
        }];
        assert!(best_matches(&[Some(vec![1.0, 0.0])], &names, 0.5).is_empty());
        assert!(best_matches(&[Some(vec![0.0, 0.0])], &names, -1.0).is_empty());
    }

    #[test]
    fn threshold_gates_matches() {
        let names = vec![NameVector {
            character: 0,
            name: "A".into(),
            vector: Some(vec![1.0, 0.0]),
        }];
        let sixty_degrees = vec![0.5, 0.75_f32.sqrt()];
        assert!(best_matches(&[Some(sixty_degrees.clone())], &names, 0.6).is_empty());
        assert_eq!(best_matches(&[Some(sixty_degrees)], &names, 0.4), vec![0]);
    }

    #[tokio::test]
    async fn chapter_text_is_extracted_then_resolved() {
        let client = Arc::new(
            CannedClient::default().reply("CharacterNames", r#"[{ "name": "X" }, { "name": "路人甲" }]"#),
        );
        let store = SqliteStore::open_in_memory().expect("store");
        let agents = single_model_agents();
        let (resolver, _) = resolver();

        let resolved = resolver
            .resolve_chapter(&engine(&client, &store), &agents.name_extraction, "X走进了酒馆。", &scenario())
            .await
            .expect("resolve");
        assert_eq!(resolved.characters[0].character_id, "c1");
        assert_eq!(client.calls("CharacterNames"), 1);
    }
}
