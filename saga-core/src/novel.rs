//! Static novel configuration.
//!
//! Authored once per novel and read by the theme layer and the genesis
//! agents. Loadable from JSON either bare or wrapped as `{"novel_config": {...}}`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SagaError};

/// Title, length targets and voice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicSettings {
    /// Novel title.
    pub title: String,
    /// Target total length in characters.
    pub total_word_count: u64,
    /// Target chapter length in characters.
    pub chapter_word_count: u32,
    /// Prose style.
    pub writing_style: String,
    /// First person, third person limited, ...
    pub narrative_perspective: String,
    /// The central theme, projected by the theme layer.
    pub central_theme: String,
}

/// Power / cultivation system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerSystem {
    /// Levels, lowest first.
    pub levels: Vec<String>,
    /// Where power comes from.
    pub energy_source: String,
    /// How characters advance.
    pub cultivation_methods: Vec<String>,
}

/// World-building seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldBuilding {
    /// Era.
    pub era_setting: String,
    /// Named places.
    pub world_map: Vec<String>,
    /// Power system.
    pub power_system: PowerSystem,
    /// Social structure.
    pub social_structure: String,
    /// World-specific rules.
    pub special_rules: Vec<String>,
}

/// Plot skeleton.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotStructure {
    /// Central conflict.
    pub central_conflict: String,
    /// Core hook.
    pub core_hook: String,
    /// Main quest.
    pub main_quest: String,
    /// Intended ending.
    pub ending_type: String,
}

/// Protagonist seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Protagonist {
    /// Name.
    pub name: String,
    /// Appearance.
    pub appearance: String,
    /// Traits.
    pub personality_traits: Vec<String>,
    /// Motivation.
    pub motivation: String,
    /// Growth arc.
    pub growth_arc: String,
    /// Special ability.
    pub special_ability: String,
}

/// Antagonist seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Antagonist {
    /// Name.
    pub name: String,
    /// Kind of antagonist.
    pub antagonist_type: String,
    /// What the conflict with the protagonist is.
    pub conflict_point: String,
}

/// Supporting character seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportingCharacter {
    /// Role.
    pub role: String,
    /// Relation to the protagonist.
    pub relation_to_protagonist: String,
}

/// Cast seed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSystem {
    /// Protagonist.
    pub protagonist: Protagonist,
    /// Antagonists.
    pub antagonists: Vec<Antagonist>,
    /// Supporting cast.
    pub supporting_characters: Vec<SupportingCharacter>,
}

/// Chapter-level pacing requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChapterStructure {
    /// Hook requirements.
    pub hook_requirements: String,
    /// How often chapters end on a cliffhanger.
    pub cliffhanger_frequency: String,
}

/// Audience and genre.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketPositioning {
    /// Target audience.
    pub target_audience: String,
    /// Genre tags.
    pub genre_tags: Vec<String>,
    /// Competitive analysis.
    pub competitive_analysis: String,
}

/// Publication settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationSettings {
    /// Chapter structure.
    pub chapter_structure: ChapterStructure,
    /// Market positioning.
    pub market_positioning: MarketPositioning,
}

/// Distinctive creative elements, projected by the theme layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreativeElements {
    /// Signature features.
    pub signature_features: Vec<String>,
    /// Cultural references.
    pub cultural_references: Vec<String>,
    /// Unique settings.
    pub unique_settings: Vec<String>,
}

/// The whole novel configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NovelConfig {
    /// Basic settings.
    pub basic_settings: BasicSettings,
    /// World-building seed.
    pub world_building: WorldBuilding,
    /// Plot skeleton.
    pub plot_structure: PlotStructure,
    /// Cast seed.
    pub character_system: CharacterSystem,
    /// Publication settings.
    pub publication_settings: PublicationSettings,
    /// Creative elements.
    pub creative_elements: CreativeElements,
}

#[derive(Deserialize)]
struct NovelConfigFile {
    novel_config: NovelConfig,
}

impl NovelConfig {
    /// Parse a novel configuration from JSON, with or without the
    /// `novel_config` wrapper object.
    ///
    /// # Errors
    /// Returns `SagaError::Config` if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SagaError::Config(e.to_string()))?;
        let parsed = if value.get("novel_config").is_some() {
            serde_json::from_value::<NovelConfigFile>(value).map(|f| f.novel_config)
        } else {
            serde_json::from_value::<NovelConfig>(value)
        };
        parsed.map_err(|e| SagaError::Config(e.to_string()))
    }

    /// Load a novel configuration from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_and_bare_forms_agree() {
        let bare = r#"{ "basic_settings": { "title": "剑来", "central_theme": "成长" } }"#;
        let wrapped = format!(r#"{{ "novel_config": {bare} }}"#);
        let a = NovelConfig::from_json(bare).expect("bare");
        let b = NovelConfig::from_json(&wrapped).expect("wrapped");
        assert_eq!(a, b);
        assert_eq!(a.basic_settings.central_theme, "成长");
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = NovelConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, SagaError::Config(_)));
    }
}
