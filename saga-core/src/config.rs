//! Configuration for the SAGA memory subsystem.
//!
//! Maps directly to `saga.toml`. Every section and field has a default, so an
//! empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};

/// Top-level SAGA configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SagaConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Completion provider and per-agent settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Embedding provider and chunking.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Semantic retrieval tuning.
    #[serde(default)]
    pub semantic: SemanticConfig,
    /// Entity resolution tuning.
    #[serde(default)]
    pub entity: EntityConfig,
    /// Episodic window.
    #[serde(default)]
    pub episodic: EpisodicConfig,
    /// Persistence settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl SagaConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `SagaError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| SagaError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error. `RUST_LOG` takes precedence.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

/// Generation parameters for one racing agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Candidate model identifiers, raced concurrently. Must not be empty.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling mass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Output token cap.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Request a streamed response.
    #[serde(default)]
    pub stream: bool,
}

impl AgentSettings {
    /// Settings racing `models` with the given temperature and token cap.
    #[must_use]
    pub fn new(models: &[&str], temperature: f32, max_tokens: u32) -> Self {
        Self {
            models: models.iter().map(|m| (*m).to_string()).collect(),
            temperature: Some(temperature),
            top_p: None,
            max_tokens: Some(max_tokens),
            stream: false,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::new(&[MAI_DS_R1], 0.0, 40_000)
    }
}

const MAI_DS_R1: &str = "microsoft/mai-ds-r1:free";
const DEEPSEEK_QWEN3_8B: &str = "deepseek/deepseek-r1-0528-qwen3-8b:free";

/// Per-agent settings for every memory agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Character update agent.
    #[serde(default = "default_character_agent")]
    pub character: AgentSettings,
    /// Character genesis agent.
    #[serde(default = "default_gen_character_agent")]
    pub gen_character: AgentSettings,
    /// Timeline update agent.
    #[serde(default = "default_timeline_agent")]
    pub timeline: AgentSettings,
    /// Timeline genesis agent.
    #[serde(default = "default_gen_timeline_agent")]
    pub gen_timeline: AgentSettings,
    /// World-state update agent.
    #[serde(default = "default_world_state_agent")]
    pub world_state: AgentSettings,
    /// World-state genesis agent.
    #[serde(default = "default_gen_world_state_agent")]
    pub gen_world_state: AgentSettings,
    /// Plot update agent.
    #[serde(default = "default_plot_agent")]
    pub plot: AgentSettings,
    /// Character-name extraction agent.
    #[serde(default = "default_name_extraction_agent")]
    pub character_name_extraction: AgentSettings,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            character: default_character_agent(),
            gen_character: default_gen_character_agent(),
            timeline: default_timeline_agent(),
            gen_timeline: default_gen_timeline_agent(),
            world_state: default_world_state_agent(),
            gen_world_state: default_gen_world_state_agent(),
            plot: default_plot_agent(),
            character_name_extraction: default_name_extraction_agent(),
        }
    }
}

/// Completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Root of an OpenAI-compatible API (`/chat/completions` is appended).
    #[serde(default = "default_llm_url")]
    pub base_url: String,
    /// Bearer token. Empty sends no `Authorization` header.
    #[serde(default)]
    pub api_key: String,
    /// Hard timeout for any completion call in milliseconds.
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_ms: u64,
    /// Per-agent generation settings.
    #[serde(default)]
    pub agents: AgentsConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            api_key: String::new(),
            request_timeout_ms: default_llm_timeout(),
            agents: AgentsConfig::default(),
        }
    }
}

/// Embedding provider and chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Root of an OpenAI-compatible API (`/embeddings` is appended).
    #[serde(default = "default_embedding_url")]
    pub base_url: String,
    /// Bearer token.
    #[serde(default)]
    pub api_key: String,
    /// Embedding model name.
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Requested output dimensions, if the model supports truncation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    /// Provider input limit in tokens.
    #[serde(default = "default_8192")]
    pub max_tokens: usize,
    /// Target chunk size in characters.
    #[serde(default = "default_2048")]
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, as a fraction of `chunk_size`.
    #[serde(default = "default_0_15")]
    pub overlap_ratio: f32,
    /// Chunks shorter than this fraction of `chunk_size` are dropped.
    #[serde(default = "default_0_1")]
    pub min_chunk_ratio: f32,
    /// A paragraph break is only used as a split point past this fraction.
    #[serde(default = "default_0_6")]
    pub paragraph_split_ratio: f32,
    /// A sentence end is only used as a split point past this fraction.
    #[serde(default = "default_0_7")]
    pub sentence_split_ratio: f32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_embedding_url(),
            api_key: String::new(),
            model: default_embedding_model(),
            dimensions: None,
            max_tokens: 8192,
            chunk_size: 2048,
            overlap_ratio: 0.15,
            min_chunk_ratio: 0.1,
            paragraph_split_ratio: 0.6,
            sentence_split_ratio: 0.7,
        }
    }
}

/// Semantic retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticConfig {
    /// Results returned when the caller does not ask for a number.
    #[serde(default = "default_50")]
    pub default_max_results: usize,
    /// Top-k requested from the vector store per query chunk.
    #[serde(default = "default_50")]
    pub query_top_k: usize,
    /// Retries after the first attempt of a vector-store call.
    #[serde(default = "default_3")]
    pub max_retries: u32,
    /// First backoff delay in milliseconds; doubles each retry.
    #[serde(default = "default_100_u64")]
    pub initial_backoff_ms: u64,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            default_max_results: 50,
            query_top_k: 50,
            max_retries: 3,
            initial_backoff_ms: 100,
        }
    }
}

/// Entity resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    /// A mention matches a name only if cosine similarity is strictly above this.
    #[serde(default = "default_0_5")]
    pub match_threshold: f32,
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self { match_threshold: 0.5 }
    }
}

/// Episodic layer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodicConfig {
    /// Chapters returned when the caller does not pass a window size.
    #[serde(default = "default_3")]
    pub default_window_size: u32,
}

impl Default for EpisodicConfig {
    fn default() -> Self {
        Self { default_window_size: 3 }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database file. Vectors live in the same file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Enable write-ahead logging.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            wal_mode: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value helpers (for serde)
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_llm_url() -> String { "https://openrouter.ai/api/v1".to_string() }
fn default_embedding_url() -> String { "https://api.openai.com/v1".to_string() }
fn default_embedding_model() -> String { "text-embedding-3-small".to_string() }
fn default_db_path() -> String { "saga.db".to_string() }
fn default_models() -> Vec<String> { vec![MAI_DS_R1.to_string()] }
fn default_character_agent() -> AgentSettings { AgentSettings::new(&[DEEPSEEK_QWEN3_8B, MAI_DS_R1], 0.0, 60_000) }
fn default_gen_character_agent() -> AgentSettings { AgentSettings::new(&[MAI_DS_R1], 0.3, 60_000) }
fn default_timeline_agent() -> AgentSettings { AgentSettings::new(&[MAI_DS_R1], 0.0, 40_000) }
fn default_gen_timeline_agent() -> AgentSettings { AgentSettings::new(&[MAI_DS_R1], 0.2, 60_000) }
fn default_world_state_agent() -> AgentSettings { AgentSettings::new(&[DEEPSEEK_QWEN3_8B, MAI_DS_R1], 0.0, 40_000) }
fn default_gen_world_state_agent() -> AgentSettings { AgentSettings::new(&[MAI_DS_R1], 0.2, 40_000) }
fn default_plot_agent() -> AgentSettings { AgentSettings::new(&[MAI_DS_R1], 0.0, 60_000) }
fn default_name_extraction_agent() -> AgentSettings { AgentSettings::new(&[MAI_DS_R1], 0.0, 20_000) }
fn default_0_1() -> f32 { 0.1 }
fn default_0_15() -> f32 { 0.15 }
fn default_0_5() -> f32 { 0.5 }
fn default_0_6() -> f32 { 0.6 }
fn default_0_7() -> f32 { 0.7 }
fn default_3() -> u32 { 3 }
fn default_50() -> usize { 50 }
fn default_100_u64() -> u64 { 100 }
fn default_2048() -> usize { 2048 }
fn default_8192() -> usize { 8192 }
fn default_llm_timeout() -> u64 { 120_000 }
