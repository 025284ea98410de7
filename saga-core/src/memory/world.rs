//! World memory: "What the world is like" (world-state layer).
//!
//! Every map is keyed by a stable name; updates overwrite or add keys and the
//! core enforces nothing beyond key uniqueness.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A region within a continent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Display name.
    pub name: String,
    /// Elevation description.
    #[serde(default)]
    pub elevation: String,
    /// Local rules.
    #[serde(default)]
    pub special_rules: Vec<String>,
}

/// A continent and its regions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Continent {
    /// Display name.
    pub name: String,
    /// Climate.
    #[serde(default)]
    pub climate: String,
    /// Regions by key.
    #[serde(default)]
    pub regions: BTreeMap<String, Region>,
}

/// Geography.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geography {
    /// Continents by key.
    #[serde(default)]
    pub continents: BTreeMap<String, Continent>,
}

/// Requirements and limits of one magic rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleDetail {
    /// Requirements.
    #[serde(default)]
    pub requirements: Vec<String>,
    /// Limitations.
    #[serde(default)]
    pub limitations: Vec<String>,
}

/// A magic system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MagicSystem {
    /// Display name.
    pub name: String,
    /// Rules by key.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleDetail>,
}

/// A faction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    /// Display name.
    pub name: String,
    /// Ranks, top first.
    #[serde(default)]
    pub hierarchy: Vec<String>,
    /// Controlled territories.
    #[serde(default)]
    pub territories: Vec<String>,
    /// Special abilities.
    #[serde(default)]
    pub special_abilities: Vec<String>,
}

/// A notable artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Display name.
    pub name: String,
    /// Kind of artifact.
    #[serde(rename = "type", default)]
    pub artifact_type: String,
    /// Origin.
    #[serde(default)]
    pub origin: String,
    /// Abilities.
    #[serde(default)]
    pub abilities: Vec<String>,
    /// Limitations.
    #[serde(default)]
    pub limitations: Vec<String>,
}

/// Cultural rules of a region or group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CulturalRule {
    /// Taboos.
    #[serde(default)]
    pub taboos: Vec<String>,
    /// Customs.
    #[serde(default)]
    pub customs: Vec<String>,
    /// Social hierarchy.
    #[serde(default)]
    pub social_hierarchy: Vec<String>,
}

/// A zone with its own physics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Where the zone is.
    pub location: String,
    /// Rules that apply inside.
    #[serde(default)]
    pub rules: Vec<String>,
}

/// World-wide physical constants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralLaws {
    /// Gravity description.
    #[serde(default)]
    pub gravity: String,
    /// How freely magic flows.
    #[serde(default)]
    pub magic_permeability: String,
}

/// Physical laws.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalLaws {
    /// General laws.
    #[serde(default)]
    pub general: GeneralLaws,
    /// Special zones by key.
    #[serde(default)]
    pub special_zones: BTreeMap<String, Zone>,
}

/// The world-state layer snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    /// Continents and regions.
    #[serde(default)]
    pub geography: Geography,
    /// Magic systems by key.
    #[serde(default)]
    pub magic_systems: BTreeMap<String, MagicSystem>,
    /// Factions by key.
    #[serde(default)]
    pub factions: BTreeMap<String, Faction>,
    /// Artifacts by key.
    #[serde(default)]
    pub artifacts: BTreeMap<String, Artifact>,
    /// Cultural rules by region or group.
    #[serde(default)]
    pub cultural_rules: BTreeMap<String, CulturalRule>,
    /// Physics.
    #[serde(default)]
    pub physical_laws: PhysicalLaws,
}
