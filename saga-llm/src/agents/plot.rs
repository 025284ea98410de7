//! Plot memory agent.

use std::sync::Arc;

use saga_core::config::AgentSettings;
use saga_core::memory::PlotMemory;
use saga_core::types::{AgentCategory, Chapter};
use serde::Serialize;

use super::{as_vars, chapter_vars, pretty, schema};
use crate::error::LlmError;
use crate::prompt::{PromptEngine, PromptId};
use crate::racing::LlmAgent;
use crate::types::{Prompt, ResponseFormat};

/// Input of [`PlotAgent`].
#[derive(Debug, Clone, Serialize)]
pub struct PlotUpdateInput {
    /// The previous chapter's plot memory.
    pub cur_plot: PlotMemory,
    /// The chapter just written.
    pub new_chapter: Chapter,
}

/// Tracks open foreshadowing, conflicts and goals. Completed entries are
/// expected to be dropped by the model.
#[derive(Debug, Clone)]
pub struct PlotAgent {
    settings: AgentSettings,
    prompts: Arc<PromptEngine>,
}

impl PlotAgent {
    /// Create the agent.
    #[must_use]
    pub fn new(settings: AgentSettings, prompts: Arc<PromptEngine>) -> Self {
        Self { settings, prompts }
    }
}

impl LlmAgent for PlotAgent {
    type Input = PlotUpdateInput;
    type Output = PlotMemory;

    fn name(&self) -> &'static str {
        "PlotAgent"
    }

    fn category(&self) -> AgentCategory {
        AgentCategory::Memory
    }

    fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn prompt(&self, input: &PlotUpdateInput) -> Result<Prompt, LlmError> {
        let mut vars = vec![("current_plot", pretty(&input.cur_plot)?)];
        vars.extend(chapter_vars(&input.new_chapter));
        self.prompts.render(PromptId::PlotUpdate, &as_vars(&vars))
    }

    fn response_format(&self) -> Option<ResponseFormat> {
        Some(schema::plot_format())
    }
}
