//! Prompt Quality Evaluation: Golden Test Set.
//!
//! A curated set of template → expected-content pairs that check every memory
//! agent prompt renders into a well-formed instruction.
//!
//! ## Usage
//!
//! - **Offline eval:** `cargo test -p saga-llm --test eval_golden` verifies
//!   template rendering produces well-formed prompts.
//! - Online evaluation against a live model is out of scope for CI.

use saga_llm::prompt::{self, PromptEngine, PromptId};

/// A golden test case for prompt evaluation.
struct GoldenCase {
    /// Human-readable name for the test case.
    name: &'static str,
    /// Which prompt template constant to use (system or user).
    template: &'static str,
    /// Template variables to fill in.
    vars: Vec<(&'static str, &'static str)>,
    /// Strings that MUST appear in the rendered prompt.
    prompt_must_contain: Vec<&'static str>,
    /// Strings that MUST NOT appear in the rendered prompt.
    prompt_must_not_contain: Vec<&'static str>,
}

const CHAPTER: [(&str, &str); 3] = [
    ("chapter_number", "17"),
    ("chapter_title", "断剑"),
    ("chapter_text", "萧瑾宸在雪夜里折断了师父留下的长剑。林小月没有说话。"),
];

fn with_chapter(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
    let mut vars = extra.to_vec();
    vars.extend_from_slice(&CHAPTER);
    vars
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        // ---------------------------------------------------------------
        // 1. Character update, with and without a timeline
        // ---------------------------------------------------------------
        GoldenCase {
            name: "character_update_with_timeline",
            template: prompt::CHARACTER_UPDATE_USER,
            vars: with_chapter(&[
                ("current_state", r#"{"characters":[{"character_id":"char_xiaojinchen"}]}"#),
                ("timeline", r#"{"current_story_time":{"year":312}}"#),
            ]),
            prompt_must_contain: vec!["char_xiaojinchen", "312", "第17章：断剑", "折断了师父留下的长剑"],
            prompt_must_not_contain: vec!["{current_state}", "{timeline}", "{chapter_text}"],
        },
        GoldenCase {
            name: "character_update_constraints",
            template: prompt::CHARACTER_UPDATE_USER,
            vars: with_chapter(&[("current_state", "{}"), ("timeline", "无时间轴信息")]),
            prompt_must_contain: vec!["无时间轴信息", "protagonist", "anxious", "lover"],
            prompt_must_not_contain: vec!["{chapter_number}"],
        },
        // ---------------------------------------------------------------
        // 2. Character genesis
        // ---------------------------------------------------------------
        GoldenCase {
            name: "character_genesis",
            template: prompt::CHARACTER_GENESIS_USER,
            vars: vec![
                ("novel_config", r#"{"basic_settings":{"title":"雪刃录"}}"#),
                ("timeline", "无时间线信息"),
            ],
            prompt_must_contain: vec!["雪刃录", "char_<拼音>", "3-5个主要角色"],
            prompt_must_not_contain: vec!["{novel_config}", "{timeline}"],
        },
        // ---------------------------------------------------------------
        // 3. Timeline
        // ---------------------------------------------------------------
        GoldenCase {
            name: "timeline_update",
            template: prompt::TIMELINE_UPDATE_USER,
            vars: with_chapter(&[("current_timeline", r#"{"genesis_point":{"name":"开天纪元"}}"#)]),
            prompt_must_contain: vec!["开天纪元", "current_story_time", "is_described", "第17章：断剑"],
            prompt_must_not_contain: vec!["{current_timeline}"],
        },
        GoldenCase {
            name: "timeline_genesis",
            template: prompt::TIMELINE_GENESIS_USER,
            vars: vec![("novel_config", r#"{"world_building":{"era_setting":"上古"}}"#)],
            prompt_must_contain: vec!["上古", "创世时间点", "evt_<类型>_<简短描述>"],
            prompt_must_not_contain: vec!["{novel_config}"],
        },
        // ---------------------------------------------------------------
        // 4. World state
        // ---------------------------------------------------------------
        GoldenCase {
            name: "world_update",
            template: prompt::WORLD_UPDATE_USER,
            vars: with_chapter(&[("current_world", r#"{"factions":{"tianjian":{"name":"天剑宗"}}}"#)]),
            prompt_must_contain: vec!["天剑宗", "章节 17 标题：断剑"],
            prompt_must_not_contain: vec!["{current_world}", "{chapter_title}"],
        },
        GoldenCase {
            name: "world_genesis",
            template: prompt::WORLD_GENESIS_USER,
            vars: vec![("novel_config", r#"{"world_building":{"social_structure":"宗门林立"}}"#)],
            prompt_must_contain: vec!["宗门林立", "世界状态"],
            prompt_must_not_contain: vec!["{novel_config}"],
        },
        // ---------------------------------------------------------------
        // 5. Plot
        // ---------------------------------------------------------------
        GoldenCase {
            name: "plot_update",
            template: prompt::PLOT_UPDATE_USER,
            vars: with_chapter(&[(
                "current_plot",
                r#"{"foreshadowings":[{"description":"师父的遗信","progress":0.4}]}"#,
            )]),
            prompt_must_contain: vec!["师父的遗信", "章节 17 标题：断剑", "情节记忆"],
            prompt_must_not_contain: vec!["{current_plot}"],
        },
        GoldenCase {
            name: "plot_system_prunes_completed",
            template: prompt::PLOT_UPDATE_SYSTEM,
            vars: vec![],
            prompt_must_contain: vec!["删除", "JSON Schema"],
            prompt_must_not_contain: vec!["{"],
        },
        // ---------------------------------------------------------------
        // 6. Name extraction
        // ---------------------------------------------------------------
        GoldenCase {
            name: "name_extraction_user",
            template: prompt::NAME_EXTRACTION_USER,
            vars: vec![("chapter_text", "萧瑾宸看向林小月。\"瑾宸，\"她说。")],
            prompt_must_contain: vec!["萧瑾宸看向林小月", "[]"],
            prompt_must_not_contain: vec!["{chapter_text}"],
        },
        GoldenCase {
            name: "name_extraction_system_example",
            template: prompt::NAME_EXTRACTION_SYSTEM,
            vars: vec![],
            prompt_must_contain: vec![r#"{"name": "萧瑾宸"}"#, "代词"],
            prompt_must_not_contain: vec![],
        },
    ]
}

// ---------------------------------------------------------------------------
// Offline Tests: Template Rendering Validation
// ---------------------------------------------------------------------------

#[test]
fn golden_prompts_render_without_unresolved_vars() {
    let cases = golden_cases();

    for case in &cases {
        let rendered = prompt::render_template(case.template, &case.vars);

        for needle in &case.prompt_must_contain {
            assert!(
                rendered.contains(needle),
                "Golden case '{}': rendered prompt must contain '{}' but doesn't.\nRendered:\n{}",
                case.name,
                needle,
                rendered.chars().take(300).collect::<String>()
            );
        }

        for needle in &case.prompt_must_not_contain {
            assert!(
                !rendered.contains(needle),
                "Golden case '{}': rendered prompt must NOT contain '{}' but does.\nRendered:\n{}",
                case.name,
                needle,
                rendered.chars().take(300).collect::<String>()
            );
        }
    }
}

#[test]
fn golden_set_has_minimum_coverage() {
    let cases = golden_cases();
    assert!(
        cases.len() >= 10,
        "Golden set must have at least 10 test cases, got {}",
        cases.len()
    );
}

#[test]
fn every_prompt_id_is_covered_by_the_builtin_engine() {
    let engine = PromptEngine::builtin();
    for id in PromptId::all() {
        let template = engine.get(*id).expect("builtin template");
        assert!(!template.system.is_empty(), "{id} has an empty system prompt");
        assert!(!template.user.is_empty(), "{id} has an empty user prompt");
    }
}

#[test]
fn structured_state_prompts_demand_schema_output() {
    let system_prompts = [
        ("character_update", prompt::CHARACTER_UPDATE_SYSTEM),
        ("character_genesis", prompt::CHARACTER_GENESIS_SYSTEM),
        ("timeline_update", prompt::TIMELINE_UPDATE_SYSTEM),
        ("timeline_genesis", prompt::TIMELINE_GENESIS_SYSTEM),
        ("world_update", prompt::WORLD_UPDATE_SYSTEM),
        ("world_genesis", prompt::WORLD_GENESIS_SYSTEM),
        ("plot_update", prompt::PLOT_UPDATE_SYSTEM),
    ];

    for (name, template) in &system_prompts {
        assert!(
            template.contains("JSON"),
            "System prompt '{name}' must instruct the model to return JSON"
        );
    }
}

#[test]
fn system_prompts_establish_an_agent_role() {
    for id in PromptId::all() {
        let engine = PromptEngine::builtin();
        let system = &engine.get(*id).expect("template").system;
        assert!(
            system.starts_with("你是一个") && system.contains("代理"),
            "System prompt '{id}' must establish the agent role"
        );
    }
}
