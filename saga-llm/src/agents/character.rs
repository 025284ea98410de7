//! Character state agents: per-chapter update and genesis.

use std::sync::Arc;

use saga_core::config::AgentSettings;
use saga_core::memory::{CharacterState, Timeline};
use saga_core::novel::NovelConfig;
use saga_core::types::{AgentCategory, Chapter};
use serde::Serialize;

use super::{as_vars, chapter_vars, pretty, schema};
use crate::error::LlmError;
use crate::prompt::{PromptEngine, PromptId};
use crate::racing::LlmAgent;
use crate::types::{Prompt, ResponseFormat};

const NO_TIMELINE: &str = "无时间轴信息";

/// Input of [`CharacterAgent`].
#[derive(Debug, Clone, Serialize)]
pub struct CharacterAgentInput {
    /// The characters and groups the chapter is expected to touch.
    pub cur_state: CharacterState,
    /// The chapter just written.
    pub new_chapter: Chapter,
    /// Timeline context, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_timeline: Option<Timeline>,
}

/// Regenerates character state after a chapter.
///
/// The output may omit characters the chapter did not touch; callers
/// reconcile it against the prior snapshot.
#[derive(Debug, Clone)]
pub struct CharacterAgent {
    settings: AgentSettings,
    prompts: Arc<PromptEngine>,
}

impl CharacterAgent {
    /// Create the agent.
    #[must_use]
    pub fn new(settings: AgentSettings, prompts: Arc<PromptEngine>) -> Self {
        Self { settings, prompts }
    }
}

impl LlmAgent for CharacterAgent {
    type Input = CharacterAgentInput;
    type Output = CharacterState;

    fn name(&self) -> &'static str {
        "CharacterAgent"
    }

    fn category(&self) -> AgentCategory {
        AgentCategory::Memory
    }

    fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn prompt(&self, input: &CharacterAgentInput) -> Result<Prompt, LlmError> {
        let timeline = match &input.current_timeline {
            Some(t) => pretty(t)?,
            None => NO_TIMELINE.to_string(),
        };
        let mut vars = vec![
            ("current_state", pretty(&input.cur_state)?),
            ("timeline", timeline),
        ];
        vars.extend(chapter_vars(&input.new_chapter));
        self.prompts.render(PromptId::CharacterUpdate, &as_vars(&vars))
    }

    fn response_format(&self) -> Option<ResponseFormat> {
        Some(schema::character_state_format())
    }
}

/// Input of [`GenCharacterAgent`].
#[derive(Debug, Clone, Serialize)]
pub struct GenCharacterInput {
    /// Static novel configuration.
    pub novel_config: NovelConfig,
    /// The genesis timeline, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
}

/// Creates the chapter-0 character roster.
#[derive(Debug, Clone)]
pub struct GenCharacterAgent {
    settings: AgentSettings,
    prompts: Arc<PromptEngine>,
}

impl GenCharacterAgent {
    /// Create the agent.
    #[must_use]
    pub fn new(settings: AgentSettings, prompts: Arc<PromptEngine>) -> Self {
        Self { settings, prompts }
    }
}

impl LlmAgent for GenCharacterAgent {
    type Input = GenCharacterInput;
    type Output = CharacterState;

    fn name(&self) -> &'static str {
        "GenCharacterAgent"
    }

    fn category(&self) -> AgentCategory {
        AgentCategory::Memory
    }

    fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn prompt(&self, input: &GenCharacterInput) -> Result<Prompt, LlmError> {
        let timeline = match &input.timeline {
            Some(t) => pretty(t)?,
            None => NO_TIMELINE.to_string(),
        };
        let vars = [("novel_config", pretty(&input.novel_config)?), ("timeline", timeline)];
        self.prompts.render(PromptId::CharacterGenesis, &as_vars(&vars))
    }

    fn response_format(&self) -> Option<ResponseFormat> {
        Some(schema::character_state_format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent() -> CharacterAgent {
        CharacterAgent::new(AgentSettings::default(), Arc::new(PromptEngine::builtin()))
    }

    #[test]
    fn update_prompt_embeds_chapter_and_state() {
        let input = CharacterAgentInput {
            cur_state: CharacterState::default(),
            new_chapter: Chapter::new(4, "夜雨", "萧瑾宸推门而入。"),
            current_timeline: None,
        };
        let prompt = agent().prompt(&input).expect("prompt");
        assert!(prompt.user.contains("第4章：夜雨"));
        assert!(prompt.user.contains("萧瑾宸推门而入。"));
        assert!(prompt.user.contains(NO_TIMELINE));
        assert!(prompt.user.contains("\"characters\": []"));
        assert!(!prompt.user.contains("{chapter_text}"));
    }

    #[test]
    fn genesis_prompt_includes_timeline_when_present() {
        let agent = GenCharacterAgent::new(AgentSettings::default(), Arc::new(PromptEngine::builtin()));
        let mut timeline = Timeline::default();
        timeline.genesis_point.name = "开天纪元".into();
        let input = GenCharacterInput { novel_config: NovelConfig::default(), timeline: Some(timeline) };
        let prompt = agent.prompt(&input).expect("prompt");
        assert!(prompt.user.contains("开天纪元"));
        assert!(!prompt.user.contains(NO_TIMELINE));
    }
}
