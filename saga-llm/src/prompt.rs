//! Prompt templates for the memory agents.
//!
//! Every prompt is a versioned, testable artifact. The built-in templates are
//! compiled in; a directory of TOML files can override any of them.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::LlmError;
use crate::types::Prompt;

/// Character update (`CharacterAgent`).
pub const CHARACTER_UPDATE_SYSTEM: &str =
    "你是一个角色状态更新代理。严格按照JSON Schema更新角色数据，不要输出任何解释文字。";

pub const CHARACTER_UPDATE_USER: &str = r"## 当前角色状态
{current_state}

## 时间轴信息
{timeline}

## 新章节内容 第{chapter_number}章：{chapter_title}
{chapter_text}

## 更新规则
- 情感状态: 根据事件调整情绪和强度(0-1)
- 技能: 根据使用情况增加进度(0-1)
- 物品: 添加新物品，移除丢失物品
- 关系: 根据互动调整亲密度(0-1)
- 语音: 记录新口头禅和对话特征

## 字段约束
- 情绪类型: [neutral, angry, joyful, sad, fearful, surprised, anxious]
- 关系类型: [family, mentor, friend, rival, enemy, lover, ally]
- 角色类型: [protagonist, antagonist, supporting, minor]

**只输出JSON，不要任何解释文字。**";

/// Character genesis (`GenCharacterAgent`).
pub const CHARACTER_GENESIS_SYSTEM: &str =
    "你是一个角色状态初始化代理。严格按照JSON Schema生成角色数据，不要输出任何解释文字。";

pub const CHARACTER_GENESIS_USER: &str = r"## 小说配置
{novel_config}

## 时间线信息
{timeline}

## 生成要求
- 生成3-5个主要角色（主角、反派、配角）
- 生成1-2个角色组
- 所有描述要简洁
- 进度值和亲密度范围：0.0-1.0

## ID格式
- 角色ID: char_<拼音>
- 技能ID: skill_<描述>
- 物品ID: item_<描述>

## 字段约束
- 关系类型: [family, mentor, friend, rival, enemy, lover, ally]
- 角色类型: [protagonist, antagonist, supporting, minor]
- 情绪类型: [neutral, angry, joyful, sad, fearful, surprised, anxious]

**只输出JSON，不要任何解释文字。**";

/// Timeline update (`TimelineAgent`).
pub const TIMELINE_UPDATE_SYSTEM: &str = "你是一个时间线代理，负责根据当前时间轴状态和新章节内容生成更新后的时间轴 JSON 对象，请严格遵循给定的 JSON Schema，不要输出任何多余文字。";

pub const TIMELINE_UPDATE_USER: &str = r"# 时间线更新指令

## 当前时间轴状态
{current_timeline}

## 新章节内容 第{chapter_number}章：{chapter_title}
{chapter_text}

## 更新规则
1. 事件添加: 根据章节内容识别新发生的事件，添加到events数组
2. 时间推进: 更新current_story_time以反映故事当前时间点
3. 事件关联: 为新事件设置related_content（描述事件的相关内容、影响或关联元素，不包含章节信息），标记is_described为true
4. 一致性检查: 确保新事件符合已有的consistency_rules
5. 角色关联: 在involved_characters中正确关联角色ID
6. 地点关联: 在locations中记录事件发生地点
7. 影响评估: 在consequences中记录事件的短期和长期影响

## ID 使用规则
- 事件ID: evt_<类型>_<简短描述>
- 时期ID: period_<名称>
- 规则ID: rule_<类型>_<描述>

## 字段约束
- 事件类型: [political, war, natural, personal, magical, cultural, economic, other]
- 重要程度: [critical, major, minor]
- 规则类型: [causality, chronology, character_age, travel_time, other]

## 时间计算原则
- 所有年份都是相对于创世时间点的偏移量
- 当前故事时间点应该反映最新章节的时间进度
- 确保时间轴的单调性和逻辑一致性";

/// Timeline genesis (`GenTimelineAgent`).
pub const TIMELINE_GENESIS_SYSTEM: &str = "你是一个时间线初始化代理，负责根据小说的整体配置生成初始的时间轴 JSON 对象，请严格遵循给定的 JSON Schema，不要输出任何多余文字。";

pub const TIMELINE_GENESIS_USER: &str = r"# 时间线初始化指令

## 小说配置
{novel_config}

## 初始化规则
1. 根据小说背景设定确定创世时间点和历法规则
2. 建立基础的时间单位定义（年、月、日、时辰）
3. 创建历史时期划分，为后续事件提供时代背景
4. 设置基本的时间线一致性规则
5. 初始化当前故事时间点（通常从故事开始时间）
6. 建立必要的历史事件作为背景锚点

## ID 使用规则
- 事件ID: evt_<类型>_<简短描述>
- 时期ID: period_<名称>
- 规则ID: rule_<类型>_<描述>

## 字段约束
- 事件类型: [political, war, natural, personal, magical, cultural, economic, other]
- 重要程度: [critical, major, minor]
- 规则类型: [causality, chronology, character_age, travel_time, other]";

/// World-state update (`WorldStateAgent`).
pub const WORLD_UPDATE_SYSTEM: &str = "你是一个世界状态代理。根据当前的世界状态和新生成的章节内容，生成一个新的完整世界状态的 JSON 对象。请严格遵循给定的 JSON Schema，不要输出任何多余文字。";

pub const WORLD_UPDATE_USER: &str = r"当前世界状态：
{current_world}

新章节内容：
章节 {chapter_number} 标题：{chapter_title}
{chapter_text}

请返回新的世界状态 JSON 对象。";

/// World-state genesis (`GenWorldStateAgent`).
pub const WORLD_GENESIS_SYSTEM: &str = "你是一个世界状态初始化代理。根据小说的整体配置生成初始的世界状态 JSON 对象。请严格遵循给定的 JSON Schema，不要输出任何多余文字。";

pub const WORLD_GENESIS_USER: &str = r"小说配置：
{novel_config}

请返回完整的世界状态 JSON 对象。";

/// Plot update (`PlotAgent`).
pub const PLOT_UPDATE_SYSTEM: &str = "你是一个情节记忆代理。根据当前的情节记忆和新生成的章节内容，生成更新后的情节记忆 JSON 对象。注意，已完成的伏笔和冲突需要从情节记忆中删除。请严格遵循给定的 JSON Schema，不要输出任何多余文字。";

pub const PLOT_UPDATE_USER: &str = r"当前情节记忆：
{current_plot}

新章节内容：
章节 {chapter_number} 标题：{chapter_title}
{chapter_text}

请返回新的情节记忆 JSON 对象。";

/// Character-name extraction (`CharacterNameExtractionAgent`).
pub const NAME_EXTRACTION_SYSTEM: &str = r#"你是一个角色名提取代理，负责从章节文本中准确识别所有出现的角色名称。

重要规则：
1. 只提取有明确名字的角色
2. 不提取代词（他、她、它等）
3. 不提取模糊描述（那个剑客、那个女子等）
4. 提取所有出现的具体人名，包括别名
5. 如果文本中没有具体人名，返回空数组

输出格式：返回角色名对象数组，每个对象包含name字段，例如：[{"name": "萧瑾宸"}, {"name": "瑾宸"}, {"name": "林小月"}]"#;

pub const NAME_EXTRACTION_USER: &str = r"# 角色名提取指令

## 章节内容
{chapter_text}

## 提取要求
请提取文本中所有有具体名字的角色，包括别名与带具体名字的称号。
不要提取代词或模糊描述。

如果文本中没有具体人名，返回空数组：[]";

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

// ---------------------------------------------------------------------------
// PromptEngine: Versioned TOML Template Loader
// ---------------------------------------------------------------------------

/// Identifies a prompt template by the agent that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Character snapshot update.
    CharacterUpdate,
    /// Initial character roster.
    CharacterGenesis,
    /// Timeline snapshot update.
    TimelineUpdate,
    /// Initial timeline.
    TimelineGenesis,
    /// World-state snapshot update.
    WorldUpdate,
    /// Initial world state.
    WorldGenesis,
    /// Plot memory update.
    PlotUpdate,
    /// Character names mentioned in a chapter.
    NameExtraction,
}

impl PromptId {
    /// Returns the TOML filename (without path) for this prompt.
    #[must_use]
    pub fn filename(self) -> &'static str {
        match self {
            Self::CharacterUpdate => "character_update.toml",
            Self::CharacterGenesis => "character_genesis.toml",
            Self::TimelineUpdate => "timeline_update.toml",
            Self::TimelineGenesis => "timeline_genesis.toml",
            Self::WorldUpdate => "world_update.toml",
            Self::WorldGenesis => "world_genesis.toml",
            Self::PlotUpdate => "plot_update.toml",
            Self::NameExtraction => "name_extraction.toml",
        }
    }

    /// All prompt IDs.
    #[must_use]
    pub fn all() -> &'static [PromptId] {
        &[
            Self::CharacterUpdate,
            Self::CharacterGenesis,
            Self::TimelineUpdate,
            Self::TimelineGenesis,
            Self::WorldUpdate,
            Self::WorldGenesis,
            Self::PlotUpdate,
            Self::NameExtraction,
        ]
    }

    fn builtin_text(self) -> (&'static str, &'static str) {
        match self {
            Self::CharacterUpdate => (CHARACTER_UPDATE_SYSTEM, CHARACTER_UPDATE_USER),
            Self::CharacterGenesis => (CHARACTER_GENESIS_SYSTEM, CHARACTER_GENESIS_USER),
            Self::TimelineUpdate => (TIMELINE_UPDATE_SYSTEM, TIMELINE_UPDATE_USER),
            Self::TimelineGenesis => (TIMELINE_GENESIS_SYSTEM, TIMELINE_GENESIS_USER),
            Self::WorldUpdate => (WORLD_UPDATE_SYSTEM, WORLD_UPDATE_USER),
            Self::WorldGenesis => (WORLD_GENESIS_SYSTEM, WORLD_GENESIS_USER),
            Self::PlotUpdate => (PLOT_UPDATE_SYSTEM, PLOT_UPDATE_USER),
            Self::NameExtraction => (NAME_EXTRACTION_SYSTEM, NAME_EXTRACTION_USER),
        }
    }
}

impl fmt::Display for PromptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.filename().trim_end_matches(".toml");
        write!(f, "{name}")
    }
}

impl FromStr for PromptId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|id| id.to_string() == s)
            .ok_or_else(|| format!("unknown prompt id: '{s}'"))
    }
}

/// Metadata and templates parsed from a TOML prompt file.
#[derive(Debug, Clone, Deserialize)]
struct TomlPromptFile {
    prompt: TomlPromptData,
}

/// Inner `[prompt]` section of a TOML file.
#[derive(Debug, Clone, Deserialize)]
struct TomlPromptData {
    version: String,
    system: String,
    user: String,
}

/// A loaded, ready-to-render prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// Prompt version string (e.g., "1.0").
    pub version: String,
    /// System prompt template (contains `{key}` placeholders).
    pub system: String,
    /// User prompt template (contains `{key}` placeholders).
    pub user: String,
}

/// Holds one template per [`PromptId`] and renders them.
///
/// # Example
///
/// ```
/// use saga_llm::prompt::{PromptEngine, PromptId};
///
/// let engine = PromptEngine::builtin();
/// let prompt = engine
///     .render(PromptId::NameExtraction, &[("chapter_text", "萧瑾宸拔剑。")])
///     .unwrap();
/// assert!(prompt.user.contains("萧瑾宸拔剑。"));
/// ```
#[derive(Debug, Clone)]
pub struct PromptEngine {
    templates: HashMap<PromptId, PromptTemplate>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptEngine {
    /// Create a `PromptEngine` pre-loaded with the built-in constant templates.
    #[must_use]
    pub fn builtin() -> Self {
        let templates = PromptId::all()
            .iter()
            .map(|id| {
                let (system, user) = id.builtin_text();
                let template = PromptTemplate {
                    version: "builtin".into(),
                    system: system.into(),
                    user: user.into(),
                };
                (*id, template)
            })
            .collect();
        Self { templates }
    }

    /// Start from the built-ins and override them with TOML files in `dir`.
    ///
    /// Each TOML file must match a known [`PromptId`] filename.
    /// Unknown files are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the directory does not exist or a
    /// TOML file exists but cannot be parsed.
    pub fn from_directory(dir: impl AsRef<Path>) -> Result<Self, LlmError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(LlmError::ConfigError(format!(
                "prompt directory not found: {}",
                dir.display()
            )));
        }

        let mut engine = Self::builtin();
        for id in PromptId::all() {
            let path: PathBuf = dir.join(id.filename());
            if path.exists() {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    LlmError::ConfigError(format!("failed to read {}: {e}", path.display()))
                })?;
                let parsed: TomlPromptFile = toml::from_str(&content).map_err(|e| {
                    LlmError::ConfigError(format!("failed to parse {}: {e}", path.display()))
                })?;

                let d = parsed.prompt;
                tracing::debug!(prompt = %id, version = %d.version, "prompt override loaded");
                engine.templates.insert(*id, PromptTemplate {
                    version: d.version,
                    system: d.system,
                    user: d.user,
                });
            }
        }

        Ok(engine)
    }

    /// Get a loaded prompt template by ID.
    #[must_use]
    pub fn get(&self, id: PromptId) -> Option<&PromptTemplate> {
        self.templates.get(&id)
    }

    /// Render both system and user prompts for a given ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt ID is not loaded.
    pub fn render(&self, id: PromptId, vars: &[(&str, &str)]) -> Result<Prompt, LlmError> {
        let tpl = self
            .get(id)
            .ok_or_else(|| LlmError::ConfigError(format!("prompt template '{id}' not loaded")))?;

        Ok(Prompt {
            system: render_template(&tpl.system, vars),
            user: render_template(&tpl.user, vars),
        })
    }

    /// Number of loaded templates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether no templates are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
