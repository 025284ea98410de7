//! Character memory: "Who is in the story" (character layer).
//!
//! Identity is unique by `character_id`. Aliases are *not* unique across
//! characters; they feed fuzzy name resolution instead.

use serde::{Deserialize, Serialize};

/// Narrative role class of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleType {
    /// Main character.
    Protagonist,
    /// Principal opposition.
    Antagonist,
    /// Recurring supporting cast.
    Supporting,
    /// Walk-on or background character.
    Minor,
}

/// Gender as declared by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Anything else.
    Other,
}

/// Physical description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Appearance {
    /// Height description.
    #[serde(default)]
    pub height: String,
    /// Build description.
    #[serde(default)]
    pub build: String,
    /// Hair description.
    #[serde(default)]
    pub hair: String,
    /// Eye description.
    #[serde(default)]
    pub eyes: String,
    /// Notable features.
    #[serde(default)]
    pub distinctive_features: Vec<String>,
    /// Usual clothing.
    #[serde(default)]
    pub typical_attire: String,
}

/// Canonical name, aliases and role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// The name the character currently goes by.
    pub current_name: String,
    /// Other names, titles and nicknames.
    #[serde(default)]
    pub known_aliases: Vec<String>,
    /// Narrative role.
    pub role_type: RoleType,
    /// Age in story years.
    #[serde(default)]
    pub age: u32,
    /// Declared gender.
    pub gender: Gender,
    /// Physical description.
    #[serde(default)]
    pub appearance: Appearance,
}

impl Identity {
    /// Canonical name followed by every alias, in declaration order.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.current_name.as_str()).chain(self.known_aliases.iter().map(String::as_str))
    }
}

/// Stable personality description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    /// Core traits.
    #[serde(default)]
    pub core_traits: Vec<String>,
    /// Moral alignment.
    #[serde(default)]
    pub moral_alignment: String,
    /// Fears.
    #[serde(default)]
    pub fears: Vec<String>,
    /// Motivations.
    #[serde(default)]
    pub motivations: Vec<String>,
    /// Quirks.
    #[serde(default)]
    pub quirks: Vec<String>,
}

/// A typed, weighted edge to another character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Target `character_id`.
    pub target_id: String,
    /// Target display name.
    #[serde(default)]
    pub target_name: String,
    /// family, mentor, friend, rival, enemy, lover, ally.
    pub relation_type: String,
    /// Affinity in `[0, 1]`.
    pub affinity_level: f32,
}

/// A learnable skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    /// Skill identifier (`skill_<desc>`).
    pub skill_id: String,
    /// Display name.
    pub name: String,
    /// Current level.
    #[serde(default)]
    pub level: u32,
    /// Progress to next level in `[0, 1]`.
    #[serde(default)]
    pub progress: f32,
    /// Chapter in which the skill was last used.
    #[serde(default)]
    pub last_used: u32,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Known limitations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limitations: Option<Vec<String>>,
}

/// Skills plus innate traits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Abilities {
    /// Skills.
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// Innate traits.
    #[serde(default)]
    pub special_traits: Vec<String>,
}

/// An item the character carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item identifier (`item_<desc>`).
    pub item_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Effects when used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Vec<String>>,
}

/// One component of a mixed emotional state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalComponent {
    /// Emotion label.
    pub emotion: String,
    /// What the emotion is directed at, if anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Intensity in `[0, 1]`.
    pub intensity: f32,
}

/// Overall mood plus weighted components.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionalState {
    /// neutral, angry, joyful, sad, fearful, surprised, anxious.
    #[serde(default)]
    pub overall_mood: String,
    /// Intensity in `[0, 1]`.
    #[serde(default)]
    pub intensity: f32,
    /// Weighted components.
    #[serde(default)]
    pub components: Vec<EmotionalComponent>,
}

/// How the character talks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    /// Recurring speech patterns.
    #[serde(default)]
    pub speech_patterns: Vec<String>,
    /// Catchphrases.
    #[serde(default)]
    pub catchphrases: Vec<String>,
    /// Vocabulary register.
    #[serde(default)]
    pub vocabulary_style: String,
    /// A recent representative line.
    #[serde(default)]
    pub recent_dialogue_example: String,
}

/// A single character's full state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    /// Unique identifier (`char_<pinyin>`).
    pub character_id: String,
    /// Names and role.
    pub identity: Identity,
    /// Personality.
    #[serde(default)]
    pub personality: Personality,
    /// Edges to other characters.
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Skills and traits.
    #[serde(default)]
    pub abilities: Abilities,
    /// Carried items.
    #[serde(default)]
    pub inventory: Vec<InventoryItem>,
    /// Current emotional state.
    #[serde(default)]
    pub emotional_state: EmotionalState,
    /// Voice.
    #[serde(default)]
    pub voice_profile: VoiceProfile,
}

/// A relationship between two groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRelationship {
    /// Target `group_id`.
    pub target_group: String,
    /// Relation label.
    pub relation: String,
    /// Tension in `[0, 1]`.
    pub tension_level: f32,
}

/// A set of characters, referenced by id. Groups never own their members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterGroup {
    /// Unique group identifier.
    pub group_id: String,
    /// Display name.
    pub name: String,
    /// Member `character_id`s, in order.
    #[serde(default)]
    pub members: Vec<String>,
    /// Alignment label.
    #[serde(default)]
    pub faction_alignment: String,
    /// Edges to other groups.
    #[serde(default)]
    pub group_relationships: Vec<GroupRelationship>,
}

impl CharacterGroup {
    /// Whether `character_id` is listed as a member.
    #[must_use]
    pub fn has_member(&self, character_id: &str) -> bool {
        self.members.iter().any(|m| m == character_id)
    }
}

/// The character layer snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterState {
    /// All known characters.
    #[serde(default)]
    pub characters: Vec<Character>,
    /// All known groups.
    #[serde(default)]
    pub character_groups: Vec<CharacterGroup>,
}

impl CharacterState {
    /// Look up a character by id.
    #[must_use]
    pub fn character(&self, character_id: &str) -> Option<&Character> {
        self.characters.iter().find(|c| c.character_id == character_id)
    }

    /// Look up a group by id.
    #[must_use]
    pub fn group(&self, group_id: &str) -> Option<&CharacterGroup> {
        self.character_groups.iter().find(|g| g.group_id == group_id)
    }

    /// Whether there is nothing to match against.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty() && self.character_groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_character_parses_with_defaults() {
        let json = r#"{
            "character_id": "char_xiaojinchen",
            "identity": {
                "current_name": "萧瑾宸",
                "known_aliases": ["瑾宸"],
                "role_type": "protagonist",
                "gender": "male"
            }
        }"#;
        let c: Character = serde_json::from_str(json).expect("parse");
        assert_eq!(c.identity.role_type, RoleType::Protagonist);
        assert!(c.relationships.is_empty());
        let names: Vec<&str> = c.identity.all_names().collect();
        assert_eq!(names, vec!["萧瑾宸", "瑾宸"]);
    }

    #[test]
    fn unknown_role_is_a_structural_failure() {
        let json = r#"{
            "character_id": "c1",
            "identity": { "current_name": "A", "role_type": "villain", "gender": "male" }
        }"#;
        assert!(serde_json::from_str::<Character>(json).is_err());
    }

    #[test]
    fn group_membership() {
        let group = CharacterGroup {
            group_id: "g1".into(),
            name: "Sect".into(),
            members: vec!["c1".into(), "c2".into()],
            faction_alignment: String::new(),
            group_relationships: vec![],
        };
        assert!(group.has_member("c2"));
        assert!(!group.has_member("c3"));
    }
}
