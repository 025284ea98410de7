//! The memory agents and the catalogue that builds them from config.
//!
//! Each agent pairs a prompt template with a response schema and a set of
//! candidate models. Agents are cheap to clone; the catalogue shares one
//! [`PromptEngine`] across all of them.

pub mod character;
pub mod extraction;
pub mod plot;
pub mod schema;
pub mod timeline;
pub mod world;

use std::sync::Arc;

use saga_core::config::AgentsConfig;
use saga_core::types::Chapter;
use serde::Serialize;

use crate::error::LlmError;
use crate::prompt::PromptEngine;

pub use character::{CharacterAgent, CharacterAgentInput, GenCharacterAgent, GenCharacterInput};
pub use extraction::{CharacterName, CharacterNameExtractionAgent, NameExtractionInput};
pub use plot::{PlotAgent, PlotUpdateInput};
pub use timeline::{GenTimelineAgent, TimelineAgent, TimelineUpdateInput};
pub use world::{GenWorldStateAgent, WorldStateAgent, WorldStateUpdateInput};

/// Pretty JSON for embedding a value in a prompt.
pub(crate) fn pretty<T: Serialize>(value: &T) -> Result<String, LlmError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| LlmError::RequestFailed(format!("failed to serialize prompt input: {e}")))
}

/// The `chapter_number` / `chapter_title` / `chapter_text` variables.
pub(crate) fn chapter_vars(chapter: &Chapter) -> [(&'static str, String); 3] {
    [
        ("chapter_number", chapter.chapter_number.to_string()),
        ("chapter_title", chapter.title.clone()),
        ("chapter_text", chapter.text.clone()),
    ]
}

/// Borrow owned template variables as the `(&str, &str)` pairs the engine takes.
pub(crate) fn as_vars<'a>(owned: &'a [(&'static str, String)]) -> Vec<(&'a str, &'a str)> {
    owned.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

/// Every memory agent, configured.
#[derive(Clone)]
pub struct AgentCatalogue {
    /// Character update.
    pub character: CharacterAgent,
    /// Character genesis.
    pub gen_character: GenCharacterAgent,
    /// Timeline update.
    pub timeline: TimelineAgent,
    /// Timeline genesis.
    pub gen_timeline: GenTimelineAgent,
    /// World-state update.
    pub world_state: WorldStateAgent,
    /// World-state genesis.
    pub gen_world_state: GenWorldStateAgent,
    /// Plot update.
    pub plot: PlotAgent,
    /// Character-name extraction.
    pub name_extraction: CharacterNameExtractionAgent,
}

impl AgentCatalogue {
    /// Build every agent from the `[llm.agents]` section and a prompt engine.
    #[must_use]
    pub fn from_config(config: &AgentsConfig, prompts: PromptEngine) -> Self {
        let prompts = Arc::new(prompts);
        Self {
            character: CharacterAgent::new(config.character.clone(), Arc::clone(&prompts)),
            gen_character: GenCharacterAgent::new(config.gen_character.clone(), Arc::clone(&prompts)),
            timeline: TimelineAgent::new(config.timeline.clone(), Arc::clone(&prompts)),
            gen_timeline: GenTimelineAgent::new(config.gen_timeline.clone(), Arc::clone(&prompts)),
            world_state: WorldStateAgent::new(config.world_state.clone(), Arc::clone(&prompts)),
            gen_world_state: GenWorldStateAgent::new(config.gen_world_state.clone(), Arc::clone(&prompts)),
            plot: PlotAgent::new(config.plot.clone(), Arc::clone(&prompts)),
            name_extraction: CharacterNameExtractionAgent::new(
                config.character_name_extraction.clone(),
                prompts,
            ),
        }
    }
}

impl Default for AgentCatalogue {
    fn default() -> Self {
        Self::from_config(&AgentsConfig::default(), PromptEngine::builtin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::racing::LlmAgent;
    use saga_core::types::AgentCategory;

    #[test]
    fn catalogue_uses_configured_models() {
        let catalogue = AgentCatalogue::default();
        assert_eq!(catalogue.character.settings().models.len(), 2);
        assert_eq!(catalogue.gen_character.settings().temperature, Some(0.3));
        assert_eq!(catalogue.name_extraction.settings().max_tokens, Some(20_000));
        assert_eq!(catalogue.name_extraction.category(), AgentCategory::Evaluation);
        assert_eq!(catalogue.plot.category(), AgentCategory::Memory);
    }

    #[test]
    fn agent_names_are_distinct() {
        let c = AgentCatalogue::default();
        let mut names = vec![
            c.character.name(),
            c.gen_character.name(),
            c.timeline.name(),
            c.gen_timeline.name(),
            c.world_state.name(),
            c.gen_world_state.name(),
            c.plot.name(),
            c.name_extraction.name(),
        ];
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), 8);
    }
}
