//! Core types for chat completion requests.
//!
//! The request body mirrors the OpenAI chat completions shape with a
//! `json_schema` response format, which OpenRouter also accepts.

use saga_core::config::AgentSettings;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions.
    System,
    /// Task content.
    User,
    /// Model output.
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who is speaking.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

/// A named JSON schema the completion must follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchemaSpec {
    /// Schema name, e.g. `"PlotMemory"`.
    pub name: String,
    /// Ask the provider for strict adherence.
    pub strict: bool,
    /// The JSON schema document.
    pub schema: Value,
}

/// The `response_format` of a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// Always `"json_schema"`.
    #[serde(rename = "type")]
    pub format_type: String,
    /// The schema.
    pub json_schema: JsonSchemaSpec,
}

impl ResponseFormat {
    /// A strict `json_schema` response format.
    #[must_use]
    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        Self {
            format_type: "json_schema".into(),
            json_schema: JsonSchemaSpec { name: name.into(), strict: true, schema },
        }
    }
}

/// Reasoning controls (OpenRouter extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasoningOptions {
    /// Keep reasoning tokens out of the returned content.
    pub exclude: bool,
}

/// A rendered system + user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// System instruction.
    pub system: String,
    /// User instruction.
    pub user: String,
}

/// A chat completion request for a single model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Output token cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Streaming flag. The client only supports `false`.
    pub stream: bool,
    /// System then user message.
    pub messages: Vec<ChatMessage>,
    /// Expected output schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    /// Reasoning controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningOptions>,
}

impl ChatRequest {
    /// Build the request for one candidate `model` of an agent.
    #[must_use]
    pub fn for_model(
        model: impl Into<String>,
        settings: &AgentSettings,
        prompt: &Prompt,
        response_format: Option<ResponseFormat>,
    ) -> Self {
        Self {
            model: model.into(),
            temperature: settings.temperature,
            top_p: settings.top_p,
            max_tokens: settings.max_tokens,
            stream: settings.stream,
            messages: vec![ChatMessage::system(&prompt.system), ChatMessage::user(&prompt.user)],
            response_format,
            reasoning: Some(ReasoningOptions { exclude: true }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_matches_wire_shape() {
        let settings = AgentSettings::new(&["m"], 0.0, 20_000);
        let prompt = Prompt { system: "sys".into(), user: "usr".into() };
        let format = ResponseFormat::json_schema("CharacterNames", json!({ "type": "array" }));
        let request = ChatRequest::for_model("m", &settings, &prompt, Some(format));

        let body = serde_json::to_value(&request).expect("serialize");
        assert_eq!(body["model"], "m");
        assert_eq!(body["max_tokens"], 20_000);
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["reasoning"]["exclude"], true);
        assert!(body.get("top_p").is_none());
    }
}
