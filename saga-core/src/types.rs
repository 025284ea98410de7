//! Core type definitions shared across the SAGA workspace.
//!
//! Everything here is serializable; snapshot payloads are stored as JSON
//! documents and agent telemetry is stored verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Chapters
// ---------------------------------------------------------------------------

/// Chapter number. `0` is the pre-story / genesis state.
pub type ChapterNumber = u32;

/// The genesis chapter, lazily synthesised on first access.
pub const GENESIS_CHAPTER: ChapterNumber = 0;

/// A committed chapter, as written by the chapter-persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    /// Chapter number (1-based for real chapters).
    pub chapter_number: ChapterNumber,
    /// Chapter title.
    pub title: String,
    /// Full chapter prose.
    pub text: String,
    /// Short summary of the chapter.
    #[serde(default)]
    pub summary: String,
    /// Word count of `text`.
    #[serde(default)]
    pub word_count: u32,
    /// Arc this chapter belongs to, within its volume.
    #[serde(default)]
    pub arc_number: u32,
    /// Volume this chapter belongs to.
    #[serde(default)]
    pub volume_number: u32,
}

impl Chapter {
    /// Create a chapter with only the fields the memory layers read.
    #[must_use]
    pub fn new(chapter_number: ChapterNumber, title: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = u32::try_from(text.chars().count()).unwrap_or(u32::MAX);
        Self {
            chapter_number,
            title: title.into(),
            text,
            summary: String::new(),
            word_count,
            arc_number: 0,
            volume_number: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// Identity of a memory layer. Each layer owns its own snapshot stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    /// Recent chapter text window.
    Episodic,
    /// Vector-indexed semantic memory.
    Semantic,
    /// World-building state.
    WorldState,
    /// Foreshadowing, conflicts and goals.
    Plot,
    /// Characters and character groups.
    Character,
    /// Static theme projection.
    Theme,
    /// Event timeline.
    Timeline,
}

impl LayerType {
    /// Stable storage key for this layer.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::WorldState => "world_state",
            Self::Plot => "plot",
            Self::Character => "character",
            Self::Theme => "theme",
            Self::Timeline => "timeline",
        }
    }

    /// Default context weight of this layer when assembling prompts.
    #[must_use]
    pub fn default_weight(self) -> f32 {
        match self {
            Self::Episodic => 1.5,
            Self::Character => 1.4,
            Self::Plot | Self::Timeline => 1.3,
            Self::WorldState => 1.2,
            Self::Semantic => 1.0,
            Self::Theme => 0.8,
        }
    }
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayerType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "episodic" => Ok(Self::Episodic),
            "semantic" => Ok(Self::Semantic),
            "world_state" => Ok(Self::WorldState),
            "plot" => Ok(Self::Plot),
            "character" => Ok(Self::Character),
            "theme" => Ok(Self::Theme),
            "timeline" => Ok(Self::Timeline),
            _ => Err(format!("unknown layer type: '{s}'")),
        }
    }
}

/// A persisted layer snapshot row, payload still in document form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Owning layer.
    pub layer: LayerType,
    /// Chapter this snapshot describes the state *after*.
    pub chapter: ChapterNumber,
    /// Write time; the newest row per `(layer, chapter)` is authoritative.
    pub last_updated: DateTime<Utc>,
    /// The snapshot document.
    pub data: Value,
}

/// A typed layer snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// Chapter this snapshot describes the state *after*.
    pub chapter: ChapterNumber,
    /// Write time.
    pub last_updated: DateTime<Utc>,
    /// The layer value.
    pub value: T,
}

// ---------------------------------------------------------------------------
// Agent telemetry
// ---------------------------------------------------------------------------

/// Responsibility class of a generation agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCategory {
    /// Macro planning (volumes, arcs).
    Planning,
    /// Content generation (summaries, chapters).
    Creation,
    /// Rule or knowledge consistency checks.
    Validator,
    /// Writes or maintains a memory layer.
    Memory,
    /// Decisions, scoring, extraction.
    Evaluation,
}

impl AgentCategory {
    /// Stable storage key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Creation => "creation",
            Self::Validator => "validator",
            Self::Memory => "memory",
            Self::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(Self::Planning),
            "creation" => Ok(Self::Creation),
            "validator" => Ok(Self::Validator),
            "memory" => Ok(Self::Memory),
            "evaluation" => Ok(Self::Evaluation),
            _ => Err(format!("unknown agent category: '{s}'")),
        }
    }
}

/// How one model attempt of a race ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// The attempt whose output the race returned.
    Won,
    /// A usable reply that arrived after the race was decided.
    Abandoned,
    /// A transport or parse failure, before or after the race was decided.
    Failed,
}

impl AttemptStatus {
    /// Stable storage key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Won => "won",
            Self::Abandoned => "abandoned",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "won" => Ok(Self::Won),
            "abandoned" => Ok(Self::Abandoned),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown attempt status: '{s}'")),
        }
    }
}

/// One row per model attempt: the win, an abandoned late reply, or a failure.
///
/// Purely observational; the core never reads these back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLogEntry {
    /// Agent name.
    pub agent: String,
    /// Agent category.
    pub category: AgentCategory,
    /// Model identifier the attempt was sent to.
    pub model: String,
    /// How the attempt ended.
    pub status: AttemptStatus,
    /// The agent input, as submitted.
    pub input: Value,
    /// Parsed output for the win, `{ "raw" }` when abandoned, `{ "error", "raw" }`
    /// on failure.
    pub output: Value,
    /// When the race started.
    pub request_time: DateTime<Utc>,
    /// When this attempt settled.
    pub respond_time: DateTime<Utc>,
    /// Milliseconds between `request_time` and `respond_time`.
    pub elapsed_ms: u64,
}

impl AgentLogEntry {
    /// Whether this entry records a failed attempt.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == AttemptStatus::Failed
    }

    /// Whether this entry is the attempt the race returned.
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.status == AttemptStatus::Won
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_type_round_trips_through_str() {
        for layer in [
            LayerType::Episodic,
            LayerType::Semantic,
            LayerType::WorldState,
            LayerType::Plot,
            LayerType::Character,
            LayerType::Theme,
            LayerType::Timeline,
        ] {
            assert_eq!(layer.as_str().parse::<LayerType>(), Ok(layer));
        }
        assert!("bogus".parse::<LayerType>().is_err());
    }

    #[test]
    fn layer_weights_rank_episodic_highest() {
        assert!(LayerType::Episodic.default_weight() > LayerType::Character.default_weight());
        assert!(LayerType::Theme.default_weight() < LayerType::Semantic.default_weight());
    }

    #[test]
    fn chapter_new_counts_chars() {
        let chapter = Chapter::new(3, "雨夜", "他推开了门。");
        assert_eq!(chapter.word_count, 6);
        assert_eq!(chapter.chapter_number, 3);
    }

    #[test]
    fn log_entry_status_drives_failure_detection() {
        let now = Utc::now();
        let mut entry = AgentLogEntry {
            agent: "PlotAgent".into(),
            category: AgentCategory::Memory,
            model: "m".into(),
            status: AttemptStatus::Failed,
            input: Value::Null,
            output: serde_json::json!({ "error": "boom", "raw": "" }),
            request_time: now,
            respond_time: now,
            elapsed_ms: 0,
        };
        assert!(entry.is_failure());
        assert!(!entry.is_win());

        entry.status = AttemptStatus::Abandoned;
        entry.output = serde_json::json!({ "raw": "{}" });
        assert!(!entry.is_failure());
        assert!(!entry.is_win());

        entry.status = AttemptStatus::Won;
        assert!(entry.is_win());
    }

    #[test]
    fn attempt_status_round_trips_through_str() {
        for status in [AttemptStatus::Won, AttemptStatus::Abandoned, AttemptStatus::Failed] {
            assert_eq!(status.as_str().parse::<AttemptStatus>(), Ok(status));
        }
        assert!("lost".parse::<AttemptStatus>().is_err());
    }
}
