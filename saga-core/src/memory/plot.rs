//! Plot memory: "What is still unresolved" (plot layer).
//!
//! Entries that reach progress `1.0` are expected to be pruned by the next
//! update; the generator is told so, the core does not enforce it.

use serde::{Deserialize, Serialize};

/// A planted hint awaiting payoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Foreshadowing {
    /// What was foreshadowed.
    pub description: String,
    /// Completion in `[0, 1]`.
    pub progress: f32,
}

/// An ongoing conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    /// What the conflict is about.
    pub description: String,
    /// Intensity in `[0, 1]`.
    pub intensity: f32,
    /// Participant names.
    #[serde(default)]
    pub parties: Vec<String>,
}

/// A character's goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterGoal {
    /// Character name.
    pub character: String,
    /// The goal.
    pub goal: String,
    /// Completion in `[0, 1]`.
    pub progress: f32,
}

/// The plot layer snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlotMemory {
    /// Open foreshadowings.
    pub foreshadowings: Vec<Foreshadowing>,
    /// Open conflicts.
    pub conflicts: Vec<Conflict>,
    /// Open goals.
    pub character_goals: Vec<CharacterGoal>,
}

impl PlotMemory {
    /// An empty-but-valid plot memory, used for the genesis chapter.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of entries that have reached completion and are due for pruning.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.foreshadowings.iter().filter(|f| f.progress >= 1.0).count()
            + self.character_goals.iter().filter(|g| g.progress >= 1.0).count()
    }
}
