//! Timeline agents.

use std::sync::Arc;

use saga_core::config::AgentSettings;
use saga_core::memory::Timeline;
use saga_core::novel::NovelConfig;
use saga_core::types::{AgentCategory, Chapter};
use serde::Serialize;

use super::{as_vars, chapter_vars, pretty, schema};
use crate::error::LlmError;
use crate::prompt::{PromptEngine, PromptId};
use crate::racing::LlmAgent;
use crate::types::{Prompt, ResponseFormat};

/// Input of [`TimelineAgent`].
#[derive(Debug, Clone, Serialize)]
pub struct TimelineUpdateInput {
    /// The previous chapter's timeline.
    pub cur_timeline: Timeline,
    /// The chapter just written.
    pub new_chapter: Chapter,
}

/// Appends a chapter's events to the timeline and advances the story clock.
#[derive(Debug, Clone)]
pub struct TimelineAgent {
    settings: AgentSettings,
    prompts: Arc<PromptEngine>,
}

impl TimelineAgent {
    /// Create the agent.
    #[must_use]
    pub fn new(settings: AgentSettings, prompts: Arc<PromptEngine>) -> Self {
        Self { settings, prompts }
    }
}

impl LlmAgent for TimelineAgent {
    type Input = TimelineUpdateInput;
    type Output = Timeline;

    fn name(&self) -> &'static str {
        "TimelineAgent"
    }

    fn category(&self) -> AgentCategory {
        AgentCategory::Memory
    }

    fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn prompt(&self, input: &TimelineUpdateInput) -> Result<Prompt, LlmError> {
        let mut vars = vec![("current_timeline", pretty(&input.cur_timeline)?)];
        vars.extend(chapter_vars(&input.new_chapter));
        self.prompts.render(PromptId::TimelineUpdate, &as_vars(&vars))
    }

    fn response_format(&self) -> Option<ResponseFormat> {
        Some(schema::timeline_format())
    }
}

/// Creates the chapter-0 timeline from the novel configuration.
#[derive(Debug, Clone)]
pub struct GenTimelineAgent {
    settings: AgentSettings,
    prompts: Arc<PromptEngine>,
}

impl GenTimelineAgent {
    /// Create the agent.
    #[must_use]
    pub fn new(settings: AgentSettings, prompts: Arc<PromptEngine>) -> Self {
        Self { settings, prompts }
    }
}

impl LlmAgent for GenTimelineAgent {
    type Input = NovelConfig;
    type Output = Timeline;

    fn name(&self) -> &'static str {
        "GenTimelineAgent"
    }

    fn category(&self) -> AgentCategory {
        AgentCategory::Memory
    }

    fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn prompt(&self, input: &NovelConfig) -> Result<Prompt, LlmError> {
        let vars = [("novel_config", pretty(input)?)];
        self.prompts.render(PromptId::TimelineGenesis, &as_vars(&vars))
    }

    fn response_format(&self) -> Option<ResponseFormat> {
        Some(schema::timeline_format())
    }
}
