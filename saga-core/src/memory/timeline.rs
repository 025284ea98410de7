//! Timeline memory: "When things happened" (timeline layer).
//!
//! All years are offsets from the genesis point. Consistency rules are carried
//! as descriptive data for the generator; nothing here evaluates them.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Definitions of the calendar's units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeUnits {
    /// What a year is.
    #[serde(default)]
    pub year: String,
    /// What a month is.
    #[serde(default)]
    pub month: String,
    /// What a day is.
    #[serde(default)]
    pub day: String,
    /// What an hour is, if the calendar has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<String>,
}

/// The zero point of the calendar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenesisPoint {
    /// Name of the era start.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// The event that founded year zero.
    #[serde(default)]
    pub founding_event: String,
    /// Calendar arithmetic rules.
    #[serde(default)]
    pub calendar_rules: Vec<String>,
}

/// Event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Political.
    Political,
    /// War.
    War,
    /// Natural.
    Natural,
    /// Personal.
    Personal,
    /// Magical.
    Magical,
    /// Cultural.
    Cultural,
    /// Economic.
    Economic,
    /// Anything else.
    Other,
}

/// Event importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// Story-defining.
    Critical,
    /// Significant.
    Major,
    /// Background.
    Minor,
}

/// A dated event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Event id (`evt_<type>_<desc>`).
    pub event_id: String,
    /// Years since genesis.
    pub year: i64,
    /// Month, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    /// Day, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
    /// Event name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Classification.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Importance.
    pub importance: Importance,
    /// Involved `character_id`s.
    #[serde(default)]
    pub involved_characters: Vec<String>,
    /// Locations.
    #[serde(default)]
    pub locations: Vec<String>,
    /// Short and long-term consequences.
    #[serde(default)]
    pub consequences: Vec<String>,
    /// Descriptive cross-references to related content.
    #[serde(default)]
    pub related_content: Vec<String>,
    /// Whether the novel has already narrated this event.
    #[serde(default)]
    pub is_described: bool,
}

impl TimelineEvent {
    /// The event's date as a comparable story time.
    #[must_use]
    pub fn story_time(&self) -> StoryTime {
        StoryTime {
            year: self.year,
            month: self.month,
            day: self.day,
        }
    }
}

/// A named span of years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePeriod {
    /// Period id (`period_<name>`).
    pub period_id: String,
    /// Display name.
    pub name: String,
    /// First year (inclusive).
    pub start_year: i64,
    /// Last year (inclusive).
    pub end_year: i64,
    /// What characterises the period.
    #[serde(default)]
    pub characteristics: Vec<String>,
    /// Ids of the period's major events.
    #[serde(default)]
    pub major_events: Vec<String>,
}

impl TimePeriod {
    /// Whether `year` falls inside this period.
    #[must_use]
    pub fn contains(&self, year: i64) -> bool {
        (self.start_year..=self.end_year).contains(&year)
    }
}

/// Kind of consistency rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    /// Causes precede effects.
    Causality,
    /// Ordering of dated events.
    Chronology,
    /// Characters age consistently.
    CharacterAge,
    /// Journeys take plausible time.
    TravelTime,
    /// Anything else.
    Other,
}

/// A declared consistency rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyRule {
    /// Rule id (`rule_<type>_<desc>`).
    pub rule_id: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Kind.
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    /// Conditions to check.
    #[serde(default)]
    pub check_conditions: Vec<String>,
    /// What to do on violation.
    #[serde(default)]
    pub violation_handling: String,
}

/// A point in story time. Missing month/day sort before any given one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryTime {
    /// Years since genesis.
    pub year: i64,
    /// Month, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    /// Day, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl Ord for StoryTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.year
            .cmp(&other.year)
            .then_with(|| self.month.unwrap_or(0).cmp(&other.month.unwrap_or(0)))
            .then_with(|| self.day.unwrap_or(0).cmp(&other.day.unwrap_or(0)))
    }
}

impl PartialOrd for StoryTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The timeline layer snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Calendar zero point.
    pub genesis_point: GenesisPoint,
    /// Unit definitions.
    #[serde(default)]
    pub time_units: TimeUnits,
    /// Append-growing event list.
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
    /// Named periods.
    #[serde(default)]
    pub periods: Vec<TimePeriod>,
    /// Declared consistency rules.
    #[serde(default)]
    pub consistency_rules: Vec<ConsistencyRule>,
    /// Where the narrative currently is.
    #[serde(default)]
    pub current_story_time: StoryTime,
}

impl Timeline {
    /// Events the novel has not narrated yet.
    pub fn undescribed_events(&self) -> impl Iterator<Item = &TimelineEvent> {
        self.events.iter().filter(|e| !e.is_described)
    }

    /// The period containing the current story year, if any.
    #[must_use]
    pub fn current_period(&self) -> Option<&TimePeriod> {
        self.periods.iter().find(|p| p.contains(self.current_story_time.year))
    }
}
