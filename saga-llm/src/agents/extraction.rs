//! Character-name extraction agent.

use std::sync::Arc;

use saga_core::config::AgentSettings;
use saga_core::types::AgentCategory;
use serde::{Deserialize, Serialize};

use super::{as_vars, schema};
use crate::error::LlmError;
use crate::prompt::{PromptEngine, PromptId};
use crate::racing::LlmAgent;
use crate::types::{Prompt, ResponseFormat};

/// A name as it appears in prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterName {
    /// The mention, verbatim.
    pub name: String,
}

/// Input of [`CharacterNameExtractionAgent`].
#[derive(Debug, Clone, Serialize)]
pub struct NameExtractionInput {
    /// The chapter body.
    pub chapter_text: String,
}

/// Lists every named character (including aliases) mentioned in a chapter.
#[derive(Debug, Clone)]
pub struct CharacterNameExtractionAgent {
    settings: AgentSettings,
    prompts: Arc<PromptEngine>,
}

impl CharacterNameExtractionAgent {
    /// Create the agent.
    #[must_use]
    pub fn new(settings: AgentSettings, prompts: Arc<PromptEngine>) -> Self {
        Self { settings, prompts }
    }
}

impl LlmAgent for CharacterNameExtractionAgent {
    type Input = NameExtractionInput;
    type Output = Vec<CharacterName>;

    fn name(&self) -> &'static str {
        "CharacterNameExtractionAgent"
    }

    fn category(&self) -> AgentCategory {
        AgentCategory::Evaluation
    }

    fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    fn prompt(&self, input: &NameExtractionInput) -> Result<Prompt, LlmError> {
        let vars = [("chapter_text", input.chapter_text.clone())];
        self.prompts.render(PromptId::NameExtraction, &as_vars(&vars))
    }

    fn response_format(&self) -> Option<ResponseFormat> {
        Some(schema::character_names_format())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::racing::tests::ScriptedClient;
    use crate::racing::{MemoryLogSink, RacingEngine};

    #[tokio::test(start_paused = true)]
    async fn extraction_parses_name_objects() {
        let client = ScriptedClient::default()
            .with("microsoft/mai-ds-r1:free", 5, Ok(r#"[{"name":"萧瑾宸"},{"name":"瑾宸"}]"#));
        let engine = RacingEngine::new(Arc::new(client), Arc::new(MemoryLogSink::new()));
        let agent = CharacterNameExtractionAgent::new(
            AgentSettings::new(&["microsoft/mai-ds-r1:free"], 0.0, 20_000),
            Arc::new(PromptEngine::builtin()),
        );
        let names = engine
            .run(&agent, &NameExtractionInput { chapter_text: "萧瑾宸拔剑。瑾宸笑了。".into() })
            .await
            .expect("names");
        assert_eq!(
            names,
            vec![CharacterName { name: "萧瑾宸".into() }, CharacterName { name: "瑾宸".into() }]
        );
    }
}
