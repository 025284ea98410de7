//! Offline fixtures shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use saga_core::config::AgentsConfig;
use saga_core::memory::character::{Gender, Identity, RoleType};
use saga_core::memory::{Character, CharacterGroup};
use saga_core::persistence::SqliteStore;
use saga_llm::prompt::PromptEngine;
use saga_llm::{AgentCatalogue, ChatRequest, CompletionClient, LlmError, RacingEngine};

pub(crate) const MODEL: &str = "fake/model";

/// Answers by response-schema name, one queued reply per call; the last
/// reply for a schema is repeated once the queue runs dry.
#[derive(Default)]
pub(crate) struct CannedClient {
    replies: Mutex<HashMap<String, VecDeque<Result<String, String>>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl CannedClient {
    pub(crate) fn reply(self, schema: &str, json: &str) -> Self {
        self.push(schema, Ok(json.to_string()));
        self
    }

    pub(crate) fn fail(self, schema: &str, body: &str) -> Self {
        self.push(schema, Err(body.to_string()));
        self
    }

    fn push(&self, schema: &str, reply: Result<String, String>) {
        self.replies
            .lock()
            .expect("replies lock")
            .entry(schema.to_string())
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn calls(&self, schema: &str) -> usize {
        self.calls.lock().expect("calls lock").get(schema).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CompletionClient for CannedClient {
    async fn chat(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let schema = request
            .response_format
            .as_ref()
            .map(|f| f.json_schema.name.clone())
            .unwrap_or_default();
        *self.calls.lock().expect("calls lock").entry(schema.clone()).or_default() += 1;

        let mut replies = self.replies.lock().expect("replies lock");
        let queue = replies
            .get_mut(&schema)
            .ok_or_else(|| LlmError::Unavailable(format!("no canned reply for {schema}")))?;
        let reply = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
        match reply {
            Some(Ok(body)) => Ok(body),
            Some(Err(body)) => Err(LlmError::HttpStatus { status: 500, body }),
            None => Err(LlmError::Unavailable(schema)),
        }
    }
}

/// Every agent racing the single fake model.
pub(crate) fn single_model_agents() -> AgentCatalogue {
    let mut config = AgentsConfig::default();
    for settings in [
        &mut config.character,
        &mut config.gen_character,
        &mut config.timeline,
        &mut config.gen_timeline,
        &mut config.world_state,
        &mut config.gen_world_state,
        &mut config.plot,
        &mut config.character_name_extraction,
    ] {
        settings.models = vec![MODEL.to_string()];
    }
    AgentCatalogue::from_config(&config, PromptEngine::builtin())
}

pub(crate) fn engine(client: &Arc<CannedClient>, store: &SqliteStore) -> RacingEngine {
    RacingEngine::new(Arc::clone(client) as Arc<dyn CompletionClient>, Arc::new(store.clone()))
}

pub(crate) fn character(id: &str, name: &str, aliases: &[&str]) -> Character {
    Character {
        character_id: id.into(),
        identity: Identity {
            current_name: name.into(),
            known_aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
            role_type: RoleType::Supporting,
            age: 20,
            gender: Gender::Other,
            appearance: Default::default(),
        },
        personality: Default::default(),
        relationships: vec![],
        abilities: Default::default(),
        inventory: vec![],
        emotional_state: Default::default(),
        voice_profile: Default::default(),
    }
}

pub(crate) fn group(id: &str, members: &[&str]) -> CharacterGroup {
    CharacterGroup {
        group_id: id.into(),
        name: id.to_uppercase(),
        members: members.iter().map(|m| (*m).to_string()).collect(),
        faction_alignment: String::new(),
        group_relationships: vec![],
    }
}

pub(crate) const TIMELINE_GENESIS: &str = r#"{
    "genesis_point": { "name": "开天纪元", "founding_event": "剑祖立宗" },
    "time_units": { "year": "纪年", "month": "月", "day": "日" },
    "current_story_time": { "year": 100 }
}"#;

pub(crate) const CHARACTERS_GENESIS: &str = r#"{
    "characters": [
        { "character_id": "char_xiaojinchen",
          "identity": { "current_name": "萧瑾宸", "known_aliases": ["瑾宸"], "role_type": "protagonist", "gender": "male" } },
        { "character_id": "char_linxiaoyue",
          "identity": { "current_name": "林小月", "role_type": "supporting", "gender": "female" } }
    ],
    "character_groups": [
        { "group_id": "grp_tianjian", "name": "天剑宗", "members": ["char_xiaojinchen", "char_linxiaoyue"] }
    ]
}"#;

pub(crate) const WORLD_GENESIS: &str = r#"{
    "factions": { "tianjian": { "name": "天剑宗", "hierarchy": ["宗主", "长老"] } }
}"#;
