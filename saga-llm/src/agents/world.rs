//! World-state agents.

use std::sync::Arc;

use saga_core::config::AgentSettings;
use saga_core::memory::World;
use saga_core::novel::NovelConfig;
use saga_core::types::{AgentCategory, Chapter};
use serde::Serialize;

use super::{as_vars, chapter_vars, pretty, schema};
use crate::error::LlmError;
use crate::prompt::{PromptEngine, PromptId};
use crate::racing::LlmAgent;
use crate::types::{Prompt, ResponseFormat};

/// Input of [`WorldStateAgent`].
#[derive(Debug, Clone, Serialize)]
pub struct WorldStateUpdateInput {
    /// The previous chapter's world state.
    pub cur_world_state: World,
    /// The chapter just written.
    pub new_chapter: Chapter,
}

/// Produces a complete new world state after a chapter.
#[derive(Debug, Clone)]
pub struct WorldStateAgent {
    settings: AgentSettings,
    prompts: Arc<PromptEngine>,
}

impl WorldStateAgent {
    /// Create the agent.
    #[must_use]
    pub fn new(settings: AgentSettings, prompts: Arc<PromptEngine>) -> Self {
        Self { settings, prompts }
    }
}

impl LlmAgent for WorldStateAgent {
    type Input = WorldStateUpdateInput;
    type Output = World;

    fn name(&self) -> &'static str {
        "WorldStateAgent"
    }

    fn category(&self) -> AgentCategory {
        AgentCategory::Memory
    }

    fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn prompt(&self, input: &WorldStateUpdateInput) -> Result<Prompt, LlmError> {
        let mut vars = vec![("current_world", pretty(&input.cur_world_state)?)];
        vars.extend(chapter_vars(&input.new_chapter));
        self.prompts.render(PromptId::WorldUpdate, &as_vars(&vars))
    }

    fn response_format(&self) -> Option<ResponseFormat> {
        Some(schema::world_format())
    }
}

/// Creates the chapter-0 world state.
#[derive(Debug, Clone)]
pub struct GenWorldStateAgent {
    settings: AgentSettings,
    prompts: Arc<PromptEngine>,
}

impl GenWorldStateAgent {
    /// Create the agent.
    #[must_use]
    pub fn new(settings: AgentSettings, prompts: Arc<PromptEngine>) -> Self {
        Self { settings, prompts }
    }
}

impl LlmAgent for GenWorldStateAgent {
    type Input = NovelConfig;
    type Output = World;

    fn name(&self) -> &'static str {
        "GenWorldStateAgent"
    }

    fn category(&self) -> AgentCategory {
        AgentCategory::Memory
    }

    fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn prompt(&self, input: &NovelConfig) -> Result<Prompt, LlmError> {
        let vars = [("novel_config", pretty(input)?)];
        self.prompts.render(PromptId::WorldGenesis, &as_vars(&vars))
    }

    fn response_format(&self) -> Option<ResponseFormat> {
        Some(schema::world_format())
    }
}
