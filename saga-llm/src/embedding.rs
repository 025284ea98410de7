//! HTTP embedding provider for OpenAI-compatible `/embeddings` endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use saga_core::chunking::{ChunkingInfo, TextChunker};
use saga_core::config::EmbeddingConfig;
use saga_core::embedding::{Embedding, EmbeddingProvider};
use saga_core::error::{Result, SagaError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Chunks text locally, then embeds every chunk in one batched request.
pub struct HttpEmbeddingProvider {
    http: Client,
    url: String,
    api_key: String,
    model: String,
    dimensions: Option<usize>,
    max_tokens: usize,
    chunker: TextChunker,
}

impl HttpEmbeddingProvider {
    /// Build a provider from the `[embedding]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError::Config`] when no API key is configured or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &EmbeddingConfig, timeout_ms: u64) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(SagaError::Config("embedding api_key is required".into()));
        }
        let http = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| SagaError::Config(e.to_string()))?;
        Ok(Self {
            http,
            url: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_tokens: config.max_tokens,
            chunker: TextChunker::from_config(config),
        })
    }
}

/// Restore request order and reject a response that lost chunks.
fn order_embeddings(mut data: Vec<EmbeddingDatum>, expected: usize) -> Result<Vec<Embedding>> {
    if data.is_empty() {
        return Err(SagaError::Embedding("no embeddings returned".into()));
    }
    if data.len() != expected {
        return Err(SagaError::Embedding(format!(
            "expected {expected} embeddings, got {}",
            data.len()
        )));
    }
    data.sort_by_key(|d| d.index);
    Ok(data.into_iter().map(|d| Embedding(d.embedding)).collect())
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<Embedding>> {
        let chunks = self.chunker.chunk(text)?;
        let body = EmbeddingRequest {
            model: &self.model,
            input: &chunks,
            dimensions: self.dimensions,
        };

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "embedding request failed");
                SagaError::Embedding(e.to_string())
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(model = %self.model, status = status.as_u16(), "embedding request rejected");
            return Err(SagaError::Embedding(format!("{} - {text}", status.as_u16())));
        }

        let parsed: EmbeddingResponse = resp
            .json()
            .await
            .map_err(|e| SagaError::Embedding(e.to_string()))?;
        debug!(model = %self.model, chunks = chunks.len(), "embedded text");
        order_embeddings(parsed.data, chunks.len())
    }

    fn chunking_info(&self) -> ChunkingInfo {
        ChunkingInfo {
            chunk_size: self.chunker.chunk_size(),
            overlap_size: self.chunker.overlap_size(),
            max_tokens: self.max_tokens,
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_config_error() {
        let config = EmbeddingConfig::default();
        assert!(matches!(
            HttpEmbeddingProvider::from_config(&config, 1000),
            Err(SagaError::Config(_))
        ));
    }

    #[test]
    fn chunking_info_reflects_config() {
        let config = EmbeddingConfig { api_key: "k".into(), ..EmbeddingConfig::default() };
        let provider = HttpEmbeddingProvider::from_config(&config, 1000).expect("provider");
        let info = provider.chunking_info();
        assert_eq!(info.chunk_size, 2048);
        assert_eq!(info.overlap_size, 307);
        assert_eq!(info.max_tokens, 8192);
        assert_eq!(provider.model_name(), "text-embedding-3-small");
    }

    #[test]
    fn embeddings_are_reordered_by_index() {
        let data = vec![
            EmbeddingDatum { index: 1, embedding: vec![2.0] },
            EmbeddingDatum { index: 0, embedding: vec![1.0] },
        ];
        let ordered = order_embeddings(data, 2).expect("ordered");
        assert_eq!(ordered, vec![Embedding(vec![1.0]), Embedding(vec![2.0])]);
    }

    #[test]
    fn short_response_is_rejected() {
        assert!(order_embeddings(Vec::new(), 1).is_err());
        let one = vec![EmbeddingDatum { index: 0, embedding: vec![1.0] }];
        assert!(order_embeddings(one, 2).is_err());
    }
}
