//! LLM Client: OpenAI-compatible chat completions (OpenRouter by default).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use saga_core::config::LlmConfig;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::ChatRequest;

/// Something that turns a chat request into raw completion text.
///
/// Failures are returned as-is and never retried here; the racing engine
/// decides what to do with them.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one request and return the message content, expected to be JSON.
    ///
    /// # Errors
    ///
    /// Transport failures, non-2xx statuses and envelopes without content.
    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// HTTP client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct LlmClient {
    http: Client,
    base_url: String,
    api_key: String,
    timeout_ms: u64,
}

impl LlmClient {
    /// Create a client for `base_url` (without the `/chat/completions` suffix).
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_ms: u64,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| LlmError::ConfigError(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout_ms,
        })
    }

    /// Create a client from the `[llm]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the HTTP client cannot be built.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new(&config.base_url, &config.api_key, config.request_timeout_ms)
    }

    /// The completions endpoint this client posts to.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Parse raw completion text as structured JSON.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ParseError`] if the text is not valid JSON for `T`.
    pub fn parse_structured<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, LlmError> {
        serde_json::from_str(text)
            .map_err(|e| LlmError::ParseError(format!("JSON parse error: {e}; raw text: '{text}'")))
    }
}

/// Pull `choices[0].message.content` out of a completion envelope.
fn extract_content(envelope: &Value) -> Result<String, LlmError> {
    envelope["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::MalformedResponse("no message content in response".into()))
}

#[async_trait]
impl CompletionClient for LlmClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let start = Instant::now();
        let mut builder = self.http.post(self.endpoint()).json(request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let resp = builder.send().await.map_err(|e| match LlmError::from(e) {
            LlmError::Timeout(_) => LlmError::Timeout(self.timeout_ms),
            other => other,
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(model = %request.model, status = status.as_u16(), "completion request rejected");
            return Err(LlmError::HttpStatus { status: status.as_u16(), body });
        }

        let envelope: Value = resp
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;
        let content = extract_content(&envelope)?;

        #[allow(clippy::cast_possible_truncation)]
        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(model = %request.model, latency_ms, chars = content.len(), "completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = LlmClient::new("https://openrouter.ai/api/v1/", "", 1000).expect("client");
        assert_eq!(client.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
    }

    #[test]
    fn content_is_extracted_from_first_choice() {
        let envelope = json!({ "choices": [{ "message": { "role": "assistant", "content": "{\"a\":1}" } }] });
        assert_eq!(extract_content(&envelope).expect("content"), "{\"a\":1}");
    }

    #[test]
    fn missing_content_is_malformed() {
        let envelope = json!({ "choices": [] });
        assert!(matches!(extract_content(&envelope), Err(LlmError::MalformedResponse(_))));
    }

    #[test]
    fn parse_structured_reports_raw_text() {
        let err = LlmClient::parse_structured::<Vec<u32>>("not json").expect_err("must fail");
        assert!(err.to_string().contains("not json"));
    }
}
