//! # saga-llm: LLM Layer for SAGA
//!
//! Everything that talks to a model lives here:
//!   - **Completions** over any OpenAI-compatible endpoint (OpenRouter by default)
//!   - **Embeddings** over an OpenAI-compatible `/embeddings` endpoint
//!   - **Racing execution**: one task, several candidate models, first
//!     structurally valid answer wins
//!   - **Memory agents**: prompt + schema + model list for each memory layer
//!
//! # Architecture
//!
//! ```text
//! LlmAgent ──prompt/schema──▶ RacingEngine ──N × ChatRequest──▶ CompletionClient
//!                                  │
//!                                  └──attempt rows──▶ AttemptLogSink (SQLite)
//! ```

#![deny(clippy::unwrap_used)]

pub mod agents;
pub mod client;
pub mod embedding;
pub mod error;
pub mod prompt;
pub mod racing;
pub mod types;

pub use agents::AgentCatalogue;
pub use client::{CompletionClient, LlmClient};
pub use embedding::HttpEmbeddingProvider;
pub use error::LlmError;
pub use racing::{AttemptLogSink, LlmAgent, MemoryLogSink, RacingEngine};
pub use types::{ChatRequest, Prompt, ResponseFormat};
