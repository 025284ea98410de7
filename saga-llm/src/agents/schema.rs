//! JSON schemas for memory-agent response formats.
//!
//! Field names and enums track the snapshot types in `saga_core::memory`.

use serde_json::{Value, json};

use crate::types::ResponseFormat;

fn string() -> Value {
    json!({ "type": "string" })
}

fn integer() -> Value {
    json!({ "type": "integer" })
}

fn strings() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

/// A number in `[0, 1]`.
fn unit() -> Value {
    json!({ "type": "number", "minimum": 0.0, "maximum": 1.0 })
}

fn one_of(values: &[&str]) -> Value {
    json!({ "type": "string", "enum": values })
}

fn array_of(item: Value) -> Value {
    json!({ "type": "array", "items": item })
}

/// An object keyed by free-form ids.
fn map_of(value: Value) -> Value {
    json!({ "type": "object", "additionalProperties": value })
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({ "type": "object", "properties": properties, "required": required })
}

const ROLE_TYPES: &[&str] = &["protagonist", "antagonist", "supporting", "minor"];
const EVENT_TYPES: &[&str] = &[
    "political", "war", "natural", "personal", "magical", "cultural", "economic", "other",
];

// ---------------------------------------------------------------------------
// Character state
// ---------------------------------------------------------------------------

fn character_schema() -> Value {
    let appearance = object(
        json!({
            "height": string(), "build": string(), "hair": string(), "eyes": string(),
            "distinctive_features": strings(), "typical_attire": string(),
        }),
        &["height", "build", "hair", "eyes", "distinctive_features", "typical_attire"],
    );
    let identity = object(
        json!({
            "current_name": string(),
            "known_aliases": strings(),
            "role_type": one_of(ROLE_TYPES),
            "age": integer(),
            "gender": one_of(&["male", "female", "other"]),
            "appearance": appearance,
        }),
        &["current_name", "known_aliases", "role_type", "age", "gender", "appearance"],
    );
    let personality = object(
        json!({
            "core_traits": strings(), "moral_alignment": string(),
            "fears": strings(), "motivations": strings(), "quirks": strings(),
        }),
        &["core_traits", "moral_alignment", "fears", "motivations", "quirks"],
    );
    let relationship = object(
        json!({
            "target_id": string(),
            "target_name": string(),
            "relation_type": one_of(&["family", "mentor", "friend", "rival", "enemy", "lover", "ally"]),
            "affinity_level": unit(),
        }),
        &["target_id", "target_name", "relation_type", "affinity_level"],
    );
    let skill = object(
        json!({
            "skill_id": string(), "name": string(), "level": integer(), "progress": unit(),
            "last_used": integer(), "description": string(), "limitations": strings(),
        }),
        &["skill_id", "name", "level", "progress", "last_used"],
    );
    let item = object(
        json!({ "item_id": string(), "name": string(), "description": string(), "effects": strings() }),
        &["item_id", "name"],
    );
    let emotion = object(
        json!({
            "emotion": one_of(&["neutral", "angry", "joyful", "sad", "fearful", "surprised", "anxious"]),
            "target": string(),
            "intensity": unit(),
        }),
        &["emotion", "intensity"],
    );

    object(
        json!({
            "character_id": string(),
            "identity": identity,
            "personality": personality,
            "relationships": array_of(relationship),
            "abilities": object(
                json!({ "skills": array_of(skill), "special_traits": strings() }),
                &["skills", "special_traits"],
            ),
            "inventory": array_of(item),
            "emotional_state": object(
                json!({ "overall_mood": string(), "intensity": unit(), "components": array_of(emotion) }),
                &["overall_mood", "intensity", "components"],
            ),
            "voice_profile": object(
                json!({
                    "speech_patterns": strings(), "catchphrases": strings(),
                    "vocabulary_style": string(), "recent_dialogue_example": string(),
                }),
                &["speech_patterns", "catchphrases", "vocabulary_style", "recent_dialogue_example"],
            ),
        }),
        &[
            "character_id", "identity", "personality", "relationships",
            "abilities", "inventory", "emotional_state", "voice_profile",
        ],
    )
}

fn group_schema() -> Value {
    let relation = object(
        json!({ "target_group": string(), "relation": string(), "tension_level": unit() }),
        &["target_group", "relation", "tension_level"],
    );
    object(
        json!({
            "group_id": string(),
            "name": string(),
            "members": strings(),
            "faction_alignment": string(),
            "group_relationships": array_of(relation),
        }),
        &["group_id", "name", "members", "faction_alignment", "group_relationships"],
    )
}

/// `CharacterState`: characters plus character groups.
#[must_use]
pub fn character_state_format() -> ResponseFormat {
    ResponseFormat::json_schema(
        "CharacterState",
        object(
            json!({
                "characters": array_of(character_schema()),
                "character_groups": array_of(group_schema()),
            }),
            &["characters", "character_groups"],
        ),
    )
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// `Timeline`: genesis, units, events, periods, rules and the story clock.
#[must_use]
pub fn timeline_format() -> ResponseFormat {
    let event = object(
        json!({
            "event_id": string(), "year": integer(), "month": integer(), "day": integer(),
            "name": string(), "description": string(),
            "type": one_of(EVENT_TYPES),
            "importance": one_of(&["critical", "major", "minor"]),
            "involved_characters": strings(), "locations": strings(),
            "consequences": strings(), "related_content": strings(),
            "is_described": { "type": "boolean" },
        }),
        &[
            "event_id", "year", "name", "type", "importance", "involved_characters",
            "locations", "consequences", "related_content", "is_described",
        ],
    );
    let period = object(
        json!({
            "period_id": string(), "name": string(), "start_year": integer(), "end_year": integer(),
            "characteristics": strings(), "major_events": strings(),
        }),
        &["period_id", "name", "start_year", "end_year", "characteristics", "major_events"],
    );
    let rule = object(
        json!({
            "rule_id": string(), "description": string(),
            "type": one_of(&["causality", "chronology", "character_age", "travel_time", "other"]),
            "check_conditions": strings(), "violation_handling": string(),
        }),
        &["rule_id", "type", "check_conditions", "violation_handling"],
    );

    ResponseFormat::json_schema(
        "Timeline",
        object(
            json!({
                "genesis_point": object(
                    json!({
                        "name": string(), "description": string(),
                        "founding_event": string(), "calendar_rules": strings(),
                    }),
                    &["name", "description", "founding_event", "calendar_rules"],
                ),
                "time_units": object(
                    json!({ "year": string(), "month": string(), "day": string(), "hour": string() }),
                    &["year", "month", "day"],
                ),
                "events": array_of(event),
                "periods": array_of(period),
                "consistency_rules": array_of(rule),
                "current_story_time": object(
                    json!({ "year": integer(), "month": integer(), "day": integer() }),
                    &["year"],
                ),
            }),
            &[
                "genesis_point", "time_units", "events", "periods",
                "consistency_rules", "current_story_time",
            ],
        ),
    )
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// `World`: geography, magic, factions, artifacts, culture and physics.
#[must_use]
pub fn world_format() -> ResponseFormat {
    let region = object(
        json!({ "name": string(), "elevation": string(), "special_rules": strings() }),
        &["name", "elevation", "special_rules"],
    );
    let continent = object(
        json!({ "name": string(), "climate": string(), "regions": map_of(region) }),
        &["name", "climate", "regions"],
    );
    let rule_detail = object(
        json!({ "requirements": strings(), "limitations": strings() }),
        &["requirements", "limitations"],
    );

    ResponseFormat::json_schema(
        "World",
        object(
            json!({
                "geography": object(json!({ "continents": map_of(continent) }), &["continents"]),
                "magic_systems": map_of(object(
                    json!({ "name": string(), "rules": map_of(rule_detail) }),
                    &["name", "rules"],
                )),
                "factions": map_of(object(
                    json!({
                        "name": string(), "hierarchy": strings(),
                        "territories": strings(), "special_abilities": strings(),
                    }),
                    &["name", "hierarchy", "territories", "special_abilities"],
                )),
                "artifacts": map_of(object(
                    json!({
                        "name": string(), "type": string(), "origin": string(),
                        "abilities": strings(), "limitations": strings(),
                    }),
                    &["name", "type", "origin", "abilities", "limitations"],
                )),
                "cultural_rules": map_of(object(
                    json!({ "taboos": strings(), "customs": strings(), "social_hierarchy": strings() }),
                    &["taboos", "customs", "social_hierarchy"],
                )),
                "physical_laws": object(
                    json!({
                        "general": object(
                            json!({ "gravity": string(), "magic_permeability": string() }),
                            &["gravity", "magic_permeability"],
                        ),
                        "special_zones": map_of(object(
                            json!({ "location": string(), "rules": strings() }),
                            &["location", "rules"],
                        )),
                    }),
                    &["general", "special_zones"],
                ),
            }),
            &[
                "geography", "magic_systems", "factions",
                "artifacts", "cultural_rules", "physical_laws",
            ],
        ),
    )
}

// ---------------------------------------------------------------------------
// Plot & extraction
// ---------------------------------------------------------------------------

/// `PlotMemory`: foreshadowings, conflicts and character goals.
#[must_use]
pub fn plot_format() -> ResponseFormat {
    ResponseFormat::json_schema(
        "PlotMemory",
        object(
            json!({
                "foreshadowings": array_of(object(
                    json!({ "description": string(), "progress": unit() }),
                    &["description", "progress"],
                )),
                "conflicts": array_of(object(
                    json!({ "description": string(), "intensity": unit(), "parties": strings() }),
                    &["description", "intensity", "parties"],
                )),
                "character_goals": array_of(object(
                    json!({ "character": string(), "goal": string(), "progress": unit() }),
                    &["character", "goal", "progress"],
                )),
            }),
            &["foreshadowings", "conflicts", "character_goals"],
        ),
    )
}

/// `CharacterNames`: an array of `{ "name": ... }`.
#[must_use]
pub fn character_names_format() -> ResponseFormat {
    ResponseFormat::json_schema(
        "CharacterNames",
        array_of(object(json!({ "name": string() }), &["name"])),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_schema_requires_all_lists() {
        let format = plot_format();
        assert_eq!(format.json_schema.name, "PlotMemory");
        assert!(format.json_schema.strict);
        assert_eq!(
            format.json_schema.schema["required"],
            json!(["foreshadowings", "conflicts", "character_goals"])
        );
    }

    #[test]
    fn character_schema_uses_type_enums() {
        let schema = character_state_format().json_schema.schema;
        let identity = &schema["properties"]["characters"]["items"]["properties"]["identity"];
        assert_eq!(identity["properties"]["role_type"]["enum"][0], "protagonist");
    }

    #[test]
    fn names_schema_is_an_array() {
        let schema = character_names_format().json_schema.schema;
        assert_eq!(schema["type"], "array");
        assert_eq!(schema["items"]["required"], json!(["name"]));
    }

    #[test]
    fn world_maps_use_additional_properties() {
        let schema = world_format().json_schema.schema;
        assert!(schema["properties"]["factions"]["additionalProperties"].is_object());
        assert_eq!(timeline_format().json_schema.name, "Timeline");
    }
}
