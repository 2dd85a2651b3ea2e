use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::error::{LoadError, RuntimeError};
use crate::graph::DialogueGraph;
use crate::resource::{FsJsonResources, JsonResourceManager, JsonResponder};
use crate::runtime::LineKind;
use crate::state::{VarValue, VariableStore, VisitedBranches};
use crate::timer::WaitClock;

fn single(body: &str) -> DialogueSession {
    let graph = DialogueGraph::from_nodes([NodeInfo::new("Start", vec![], body)]).unwrap();
    let mut session = DialogueSession::new();
    session.load_dialogue_graph(&graph).unwrap();
    session
}

fn started(body: &str) -> DialogueSession {
    let mut session = single(body);
    session.start_from("Start");
    session
}

fn reveal_all(session: &mut DialogueSession) {
    session.complete_clipped_text_scrolling();
}

// ========== 基本推进 ==========

#[test]
fn test_start_and_step_through_lines() {
    let mut session = started("One\nTwo");
    assert!(session.is_running());
    assert!(session.is_dialogue_line_type(LineType::Text));
    assert_eq!(session.get_line_text(), "One");
    assert_eq!(session.get_branch_title(), "Start");

    session.go_to_next_dialogue_line();
    assert_eq!(session.get_line_text(), "Two");

    // 最后一行显示完毕后对话结束
    assert!(session.is_running());
    reveal_all(&mut session);
    assert!(session.has_clipped_scrolling_completed());
    assert!(!session.is_running());
    assert_eq!(session.get_line_text(), "");
}

#[test]
fn test_start_unknown_branch_is_noop() {
    let mut session = single("Hi");
    session.start_from("Nowhere");
    assert!(!session.is_running());
    assert!(!session.has_dialogue_branch("Nowhere"));
    assert!(session.has_dialogue_branch("Start"));
}

#[test]
fn test_advance_past_end_stops() {
    let mut session = started("Only");
    session.go_to_next_dialogue_line();
    assert!(!session.is_running());
}

#[test]
fn test_stop_running_dialogue_clears_state() {
    let mut session = started("<<shake>>\nHello");
    session.stop_running_dialogue();
    assert!(!session.is_running());
    assert_eq!(session.get_text(), "");
    assert!(session.peek_triggered_commands().is_empty());
    assert!(!session.is_dialogue_line_type(LineType::Text));
}

// ========== 显示游标 ==========

#[test]
fn test_reveal_cursor_is_monotonic_and_bounded() {
    let mut session = started("Hello there");
    let len = session.get_text().chars().count();
    let mut last = session.get_clipped_line_text().chars().count();
    for _ in 0..(len + 5) {
        session.scroll_clipped_text();
        let now = session.get_clipped_line_text().chars().count();
        assert!(now >= last);
        assert!(now <= len);
        last = now;
    }
    assert!(session.has_clipped_scrolling_completed());
    assert_eq!(session.get_clipped_line_text(), "Hello there");
}

#[test]
fn test_reveal_counts_characters_not_bytes() {
    let mut session = started("你好世界");
    assert_eq!(session.get_clipped_line_text(), "你");
    session.scroll_clipped_text();
    assert_eq!(session.get_clipped_line_text(), "你好");
}

#[test]
fn test_actor_scenario() {
    let mut session = single("tom: Hi James");
    session.create_new_actor("tom", "Tom", "#ff0000");
    session.start_from("Start");

    assert_eq!(session.get_active_line_actor_id(), "tom");
    assert!(session.line_has_active_actor());
    assert_eq!(session.get_text(), " Hi James");
    assert_eq!(session.get_clipped_line_text(), " ");
    session.scroll_clipped_text();
    assert_eq!(session.get_clipped_line_text(), " H");
    session.scroll_clipped_text();
    assert_eq!(session.get_clipped_line_text(), " Hi");
    assert_eq!(
        session.get_active_actor_info("name"),
        Some(&VarValue::from("Tom"))
    );
}

#[test]
fn test_unregistered_speaker_is_plain_text() {
    let mut session = started("bob: hello");
    assert!(!session.line_has_active_actor());
    assert_eq!(session.get_active_line_actor_id(), "");
    assert_eq!(session.get_text(), "bob: hello");
}

#[test]
fn test_speaker_line_parameters() {
    let mut session = single("tom happy loud: Hey");
    session.create_new_actor("tom", "Tom", "red");
    session.start_from("Start");

    assert_eq!(
        session.get_active_line_actor_parameters(),
        ["happy".to_string(), "loud".to_string()]
    );
    assert_eq!(session.get_active_line_parameters_count(), 2);
    assert_eq!(session.get_active_line_parameter_via_index(1), "loud");
    assert_eq!(session.get_active_line_parameter_via_index(5), "");
    assert!(session.get_active_line_parameter_exists("happy"));
    assert!(!session.get_active_line_parameter_exists("sad"));
    assert_eq!(session.get_text(), " Hey");
}

// ========== 同源续行与命令 ==========

#[test]
fn test_inline_command_continues_same_line() {
    let mut session = started("Hello <<shake>> world");
    assert_eq!(session.get_text(), "Hello");

    for _ in 0..5 {
        session.scroll_clipped_text();
    }
    assert!(session.has_clipped_scrolling_completed());

    // 显示完毕后自动推进到同源续行
    session.scroll_clipped_text();
    assert_eq!(session.get_text(), "Hello world");
    assert_eq!(session.get_clipped_line_text(), "Hello");
    assert!(session.peek_triggered_commands().is_empty());

    session.scroll_clipped_text();
    let triggered: Vec<_> = session
        .peek_triggered_commands()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(triggered, vec!["shake"]);
    assert!(session.is_command_called("shake"));
    assert!(!session.is_command_called("shake"));
}

#[test]
fn test_speaker_prefix_tolerates_extra_whitespace() {
    let mut session = single("tom   happy: hi");
    session.create_new_actor("tom", "Tom", "red");
    session.start_from("Start");

    assert_eq!(session.get_active_line_actor_id(), "tom");
    assert_eq!(session.get_active_line_actor_parameters(), ["happy".to_string()]);
    assert_eq!(session.get_text(), " hi");
}

#[test]
fn test_continuation_keeps_speaker() {
    let mut session = single("tom: Well <<nod>> then");
    session.create_new_actor("tom", "Tom", "red");
    session.start_from("Start");
    session.complete_clipped_text_scrolling();
    session.scroll_clipped_text();

    assert_eq!(session.get_text(), " Well then");
    assert_eq!(session.get_active_line_actor_id(), "tom");
}

#[test]
fn test_consecutive_commands_are_drained() {
    let session = started("<<foo 1>>\n<<bar x=2>>\nhello");
    assert!(session.is_dialogue_line_type(LineType::Text));
    assert_eq!(session.get_text(), "hello");

    let queued: Vec<_> = session
        .peek_triggered_commands()
        .iter()
        .map(|c| (c.name().to_string(), c.parameters().len()))
        .collect();
    assert_eq!(
        queued,
        vec![("foo".to_string(), 2), ("bar".to_string(), 2)]
    );
    assert!(session.is_dialogue_line_type(LineType::Command));
}

#[test]
fn test_command_parameters() {
    let mut session = started("<<camera zoom=2 fast>>\nhello");
    assert!(session.is_command_called("camera"));

    assert_eq!(session.command_parameters_count(), 2);
    assert_eq!(session.get_command_parameter(-1), "camera");
    assert_eq!(session.get_command_parameter(0), "zoom=2");
    assert_eq!(session.get_command_parameter(9), "");
    assert_eq!(session.get_command_parameter(-5), "");
    assert_eq!(session.get_command_parameter_via_key("zoom"), "2");
    assert_eq!(session.get_command_parameter_via_key("fast"), "");
    assert_eq!(session.get_command_parameter_via_key(""), "");
    assert!(session.command_has_parameter("zoom"));
    assert!(session.command_has_parameter("fast"));
    assert!(!session.command_has_parameter("zo"));

    assert!(!session.is_dialogue_line_type(LineType::Command));
}

#[test]
fn test_consume_command_by_id() {
    let mut session = started("<<a>>\n<<b>>\nText");
    let id = session.peek_triggered_commands()[1].id();
    assert!(session.consume_command(id));
    assert_eq!(session.get_command_parameter(-1), "b");
    assert!(!session.consume_command(id));
    assert_eq!(session.peek_triggered_commands().len(), 1);
}

#[test]
fn test_commands_from_previous_line_fire_at_line_start() {
    let mut session = started("Hello\n<<shake>>\nHi");
    session.complete_clipped_text_scrolling();
    session.go_to_next_dialogue_line();

    assert_eq!(session.get_text(), "Hi");
    session.scroll_clipped_text();
    assert!(session.is_command_called("shake"));
}

#[test]
fn test_endless_command_loop_ends_dialogue() {
    let mut session = started("<<ping>>\n<<jump Start>>");
    assert!(!session.is_running());
    assert!(session.peek_triggered_commands().is_empty());
}

// ========== wait ==========

#[test]
fn test_wait_pauses_until_delay_elapses() {
    let mut session = started("<<wait 500>>\nHello");
    let mut clock = WaitClock::new();

    assert!(!session.is_command_called("shake"));
    assert!(session.is_paused());

    session.scroll_clipped_text();
    assert_eq!(session.get_clipped_line_text(), "H");

    session.pump_waits(&mut clock, Duration::ZERO);
    session.pump_waits(&mut clock, Duration::from_millis(499));
    assert!(session.is_paused());
    session.scroll_clipped_text();
    assert_eq!(session.get_clipped_line_text(), "H");

    session.pump_waits(&mut clock, Duration::from_millis(1));
    assert!(!session.is_paused());
    assert!(clock.is_idle());
    assert!(session.peek_triggered_commands().is_empty());

    session.scroll_clipped_text();
    assert_eq!(session.get_clipped_line_text(), "He");
}

#[test]
fn test_scroll_arms_reached_wait() {
    let mut session = started("<<wait 250>>\nHello");
    session.scroll_clipped_text();
    assert!(session.is_paused());

    let requests = session.take_wait_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].delay, Duration::from_millis(250));
    assert!(session.take_wait_requests().is_empty());

    // 暂停期间推进无效
    session.go_to_next_dialogue_line();
    assert_eq!(session.get_text(), "Hello");

    assert!(session.resume_wait(requests[0].ticket));
    assert!(!session.resume_wait(requests[0].ticket));
}

#[test]
fn test_inline_wait_pauses_mid_line() {
    let mut session = started("Hello <<wait 100>> world");
    for _ in 0..6 {
        session.scroll_clipped_text();
    }
    assert_eq!(session.get_text(), "Hello world");
    assert!(!session.is_paused());

    session.scroll_clipped_text();
    session.scroll_clipped_text();
    assert!(session.is_paused());
    assert_eq!(session.get_clipped_line_text(), "Hello ");
}

#[test]
fn test_stale_wait_ticket_is_ignored() {
    let mut session = started("<<wait 100>>\nHello");
    session.scroll_clipped_text();
    let ticket = session.take_wait_requests()[0].ticket;

    session.start_from("Start");
    session.scroll_clipped_text();
    assert!(session.is_paused());
    assert!(!session.resume_wait(ticket));
    assert!(session.is_paused());
}

#[test]
fn test_unparsable_wait_delay_is_zero() {
    let mut session = started("<<wait soon>>\nHello");
    session.scroll_clipped_text();
    let requests = session.take_wait_requests();
    assert_eq!(requests[0].delay, Duration::ZERO);
}

// ========== 选项 ==========

const PICK: &str = "Pick\n-> Red\n    Fire\n-> Green\n    Leaf\n-> Blue\n    Ice";

fn at_options() -> DialogueSession {
    let mut session = started(PICK);
    session.complete_clipped_text_scrolling();
    session.go_to_next_dialogue_line();
    session
}

#[test]
fn test_options_are_shown() {
    let session = at_options();
    assert!(session.is_dialogue_line_type(LineType::Options));
    assert_eq!(session.get_line_options_count(), 3);
    assert_eq!(session.get_line_option(1), Some("Green"));
    assert_eq!(session.get_line_option(42), Some("Blue"));
    assert_eq!(session.get_selected_option(), None);
    assert_eq!(session.get_text(), "");
}

#[test]
fn test_option_cycling() {
    let mut session = at_options();
    assert!(session.has_selected_option_changed());
    assert_eq!(session.get_selected_option(), Some(0));
    assert!(!session.has_selected_option_changed());

    for _ in 0..3 {
        session.select_next_option();
    }
    assert_eq!(session.get_selected_option(), Some(0));

    session.select_previous_option();
    assert_eq!(session.get_selected_option(), Some(2));

    session.select_option(99);
    assert_eq!(session.get_selected_option(), Some(2));
}

#[test]
fn test_next_option_from_none() {
    let mut session = at_options();
    session.select_next_option();
    assert_eq!(session.get_selected_option(), Some(0));

    let mut session = at_options();
    session.select_previous_option();
    assert_eq!(session.get_selected_option(), Some(2));
}

#[test]
fn test_options_text() {
    let mut session = at_options();
    session.has_selected_option_changed();

    // 纵向每项后都带换行
    assert_eq!(
        session.get_line_options_text_vertical("> "),
        "> Red\n  Green\n  Blue\n"
    );
    insta::assert_snapshot!(
        session.get_line_options_text_horizontal("> "),
        @"> Red  Green  Blue"
    );
}

#[test]
fn test_confirm_requires_acknowledged_selection() {
    let mut session = at_options();

    // 尚未选择
    session.confirm_select_option();
    assert!(session.is_dialogue_line_type(LineType::Options));

    session.select_option(2);
    // 选中项的改变尚未被确认
    session.confirm_select_option();
    assert!(session.is_dialogue_line_type(LineType::Options));

    assert!(session.has_selected_option_changed());
    session.confirm_select_option();
    assert!(session.is_dialogue_line_type(LineType::Text));
    assert_eq!(session.get_text(), "Ice");
    assert_eq!(session.get_line_options_count(), 0);
}

// ========== 分支与标签 ==========

#[test]
fn test_branch_tags() {
    let mut session = DialogueSession::new();
    session
        .load_graph(
            r#"[{"title": "Start", "tags": "intro camera(2,3) mood:happy", "body": "Hi"}]"#,
        )
        .unwrap();
    session.start_from("Start");

    assert_eq!(session.get_branch_tags(), "intro,camera(2,3),mood:happy");
    assert_eq!(session.get_branch_tag(0), "intro");
    assert_eq!(session.get_branch_tag(99), "mood:happy");
    assert_eq!(session.get_branch_text(), "Hi");

    assert!(session.branch_contains_tag("camera"));
    assert_eq!(session.get_tag_parameter(0), "2");
    assert_eq!(session.get_tag_parameter(1), "3");

    // 参数只来自匹配的标签
    assert!(session.branch_contains_tag("intro"));
    assert_eq!(session.get_tag_parameter(0), "");

    assert!(session.branch_contains_tag("mood"));
    assert!(!session.branch_contains_tag("missing"));
    assert_eq!(session.get_tag_value_via_key("mood"), "happy");
    assert_eq!(session.get_tag_value_via_key("intro"), "");
}

#[test]
fn test_visited_branches_and_title_changes() {
    let mut session = DialogueSession::new();
    session
        .load_graph(
            r#"[
                {"title": "Start", "body": "A\n<<jump Next>>"},
                {"title": "Next", "body": "B"}
            ]"#,
        )
        .unwrap();
    session.start_from("Start");
    session.end_frame();

    assert!(session.branch_title_is("Start"));
    assert!(!session.branch_title_has_changed());
    assert!(session.branch_title_has_been_visited(""));
    assert!(!session.branch_title_has_been_visited("Elsewhere"));

    session.go_to_next_dialogue_line();
    assert!(session.branch_title_is("Next"));
    assert!(session.branch_title_has_changed());
    assert_eq!(session.get_visited_branch_titles(), "Next,Start");

    session.end_frame();
    assert!(!session.branch_title_has_changed());
}

#[test]
fn test_active_actor_change_edge() {
    let mut session = single("tom: Hi\ntom: Again\nann: Hello");
    session.create_new_actor("tom", "Tom", "red");
    session.create_new_actor("ann", "Ann", "blue");
    session.start_from("Start");

    assert!(session.has_active_actor_changed());
    session.end_frame();
    assert!(!session.has_active_actor_changed());

    session.go_to_next_dialogue_line();
    assert!(!session.has_active_actor_changed());

    session.go_to_next_dialogue_line();
    assert!(session.has_active_actor_changed());
    assert_eq!(session.get_active_line_actor_id(), "ann");
}

#[test]
fn test_options_prompt_has_no_speaker() {
    let mut session = single("tom: Hi\n-> Yes\n    Good\n-> No\n    Bad");
    session.create_new_actor("tom", "Tom", "red");
    session.start_from("Start");
    assert!(session.line_has_active_actor());

    session.complete_clipped_text_scrolling();
    session.go_to_next_dialogue_line();
    assert!(session.is_dialogue_line_type(LineType::Options));
    assert!(!session.line_has_active_actor());
    assert_eq!(session.get_active_line_actor_id(), "");
    assert_eq!(session.get_active_actor_info("name"), None);
}

// ========== 角色与变量 ==========

#[test]
fn test_actor_registry() {
    let mut session = DialogueSession::new();
    session.create_new_actor("tom", "Tom", "red");
    session.create_new_actor("tom", "Thomas", "green");
    assert!(session.get_actor_exists("tom"));
    assert_eq!(
        session.get_actor_info("tom", "name"),
        Some(&VarValue::from("Tom"))
    );

    session.set_actor_info("tom", "id", "evil");
    assert_eq!(session.get_actor_info("tom", "id"), Some(&VarValue::from("tom")));
    session.set_actor_info("tom", "mood", "sad");
    assert_eq!(
        session.get_actor_info("tom", "mood"),
        Some(&VarValue::from("sad"))
    );
    session.set_actor_info("nobody", "mood", "sad");
    assert!(!session.get_variable_exists("a.nobody.mood"));

    assert_eq!(session.get_child_keys_of_nested_variable("a"), vec!["tom"]);
    session.delete_actor("tom");
    assert!(!session.get_actor_exists("tom"));
    assert_eq!(session.get_keys_count("a.tom"), 0);
}

#[test]
fn test_variables() {
    let mut session = DialogueSession::new();
    session.set_variable("gold", 10);
    session.set_variable("$name", "Ann");
    session.set_variable("inv.sword", true);
    session.set_variable("inv.shield", false);
    session.set_variable("inventory", 1);

    assert_eq!(session.get_variable("$gold"), Some(&VarValue::Number(10.0)));
    assert!(session.compare_variable("name", &VarValue::from("Ann")));
    assert!(!session.compare_variable("missing", &VarValue::Bool(false)));
    assert_eq!(session.get_keys_count("inv"), 2);
    assert_eq!(
        session.get_child_key_via_index("inv", 0),
        Some("shield".to_string())
    );
    assert_eq!(session.get_child_key_via_index("inv", 5), None);

    // 只删除精确键及其子键，不影响同前缀的其他变量
    session.delete_dialogue_state_variable("inv");
    assert!(!session.get_variable_exists("inv.sword"));
    assert!(session.get_variable_exists("inventory"));
}

#[test]
fn test_script_sees_session_variables() {
    let mut session = single("<<if $met>>\nAgain\n<<else>>\nNice to meet you\n<<endif>>");
    session.set_variable("met", true);
    session.start_from("Start");
    assert_eq!(session.get_text(), "Again");
}

// ========== 存档 ==========

#[test]
fn test_save_clear_load_roundtrip() {
    let mut session = started("Hi");
    session.set_variable("gold", 10);
    session.set_variable("a.tom.id", "tom");

    let saved = session.save_state_value();
    session.clear_state();
    assert_eq!(session.get_variable("gold"), None);
    assert!(!session.branch_title_has_been_visited("Start"));

    session.load_state(&saved);
    assert_eq!(session.get_variable("gold"), Some(&VarValue::Number(10.0)));
    assert!(session.get_actor_exists("tom"));
    assert!(session.branch_title_has_been_visited("Start"));
    assert_eq!(saved["visited"], json!({"Start": true}));
}

#[test]
fn test_load_state_from_string_value() {
    let mut session = DialogueSession::new();
    session.load_state(&json!(r#"{"variables": {"x": "y"}, "visited": {}}"#));
    assert_eq!(session.get_variable("x"), Some(&VarValue::from("y")));
}

#[test]
fn test_bad_state_payload_keeps_state() {
    let mut session = DialogueSession::new();
    session.set_variable("keep", 1);
    session.load_state(&serde_json::Value::Null);
    session.load_state(&json!("not json"));
    session.load_state(&json!([1, 2, 3]));
    assert!(session.get_variable_exists("keep"));
}

// ========== 加载 ==========

#[test]
fn test_load_graph_errors() {
    let mut session = DialogueSession::new();
    assert!(matches!(session.load_graph("[{oops"), Err(LoadError::Json(_))));
    assert!(matches!(
        session.load_graph(r#"[{"title": "S", "body": "<<if $x>>\nA"}]"#),
        Err(LoadError::Body { .. })
    ));
}

#[test]
fn test_load_yarn_text() {
    let mut session = DialogueSession::new();
    session
        .load_graph("title: Start\ntags: a b\n---\nHello\n===\n")
        .unwrap();
    session.start_from("Start");
    assert_eq!(session.get_text(), "Hello");
    assert_eq!(session.get_branch_tags(), "a,b");
}

#[test]
fn test_load_from_scene_variable() {
    let mut session = DialogueSession::new();
    let value = json!(r#"[{"title": "Start", "body": "From a string"}]"#);
    session.load_from_scene_variable(&value, "Start");
    assert_eq!(session.get_text(), "From a string");

    session.load_from_scene_variable(&json!({"nodes": 5}), "Start");
    assert!(session.is_running());
}

#[test]
fn test_load_graph_keeps_variables() {
    let mut session = started("Hi");
    session.set_variable("gold", 3);
    session.load_graph(r#"[{"title": "Other", "body": "Yo"}]"#).unwrap();
    assert!(!session.is_running());
    assert!(session.get_variable_exists("gold"));
    assert!(session.has_dialogue_branch("Other"));
}

#[test]
fn test_load_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("intro.json"),
        r#"[{"title": "Start", "body": "Loaded"}]"#,
    )
    .unwrap();
    let mut resources = FsJsonResources::new(dir.path());
    let mut session = DialogueSession::new();

    session.load_from_json_file(&mut resources, "intro.json", "Start");
    assert!(session.is_running());
    assert_eq!(session.get_text(), "Loaded");
}

#[derive(Default)]
struct DeferredResources {
    pending: Vec<JsonResponder>,
}

impl JsonResourceManager for DeferredResources {
    fn load_json(&mut self, _name: &str, responder: JsonResponder) {
        self.pending.push(responder);
    }
}

#[test]
fn test_deferred_resource_applies_on_end_frame() {
    let mut resources = DeferredResources::default();
    let mut session = DialogueSession::new();
    session.load_from_json_file(&mut resources, "later.json", "Start");
    session.end_frame();
    assert!(!session.is_running());

    let responder = resources.pending.pop().unwrap();
    assert_eq!(responder.name(), "later.json");
    responder.respond(Ok(json!([{"title": "Start", "body": "Late"}])));

    session.end_frame();
    assert_eq!(session.get_text(), "Late");
}

#[test]
fn test_failed_resource_is_logged_only() {
    let mut resources = FsJsonResources::new("/nonexistent-dialogue-root");
    let mut session = DialogueSession::new();
    session.load_from_json_file(&mut resources, "missing.json", "Start");
    assert!(!session.is_running());
}

// ========== 自定义解释器 ==========

/// 按预设顺序交付行的解释器
struct ScriptedRunner {
    node: Arc<NodeInfo>,
    lines: VecDeque<Result<LineKind, RuntimeError>>,
    variables: VariableStore,
    visited: VisitedBranches,
}

impl ScriptedRunner {
    fn new(lines: Vec<Result<LineKind, RuntimeError>>) -> Self {
        Self {
            node: Arc::new(NodeInfo::new("Start", vec![], "")),
            lines: lines.into(),
            variables: VariableStore::new(),
            visited: VisitedBranches::new(),
        }
    }
}

impl DialogueRunner for ScriptedRunner {
    fn load(&mut self, _graph: &DialogueGraph) -> Result<(), LoadError> {
        Ok(())
    }

    fn has_node(&self, title: &str) -> bool {
        title == "Start"
    }

    fn node_titles(&self) -> Vec<String> {
        vec!["Start".to_string()]
    }

    fn run(&mut self, _start: &str) -> Result<(), RuntimeError> {
        self.visited.mark("Start");
        Ok(())
    }

    fn next_line(&mut self) -> Result<Option<DialogueLine>, RuntimeError> {
        match self.lines.front() {
            Some(Ok(LineKind::Unknown)) => {
                Ok(Some(DialogueLine::new(LineKind::Unknown, self.node.clone(), 1)))
            }
            _ => match self.lines.pop_front() {
                Some(Ok(kind)) => Ok(Some(DialogueLine::new(kind, self.node.clone(), 1))),
                Some(Err(e)) => Err(e),
                None => Ok(None),
            },
        }
    }

    fn select(&mut self, _index: usize) -> Result<(), RuntimeError> {
        Err(RuntimeError::NotAwaitingSelection)
    }

    fn variables(&self) -> &VariableStore {
        &self.variables
    }

    fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.variables
    }

    fn visited(&self) -> &VisitedBranches {
        &self.visited
    }

    fn visited_mut(&mut self) -> &mut VisitedBranches {
        &mut self.visited
    }
}

#[test]
fn test_unknown_line_is_steady_state() {
    let runner = ScriptedRunner::new(vec![Ok(LineKind::Unknown)]);
    let mut session = DialogueSession::with_runner(runner);
    session.start_from("Start");

    assert!(session.is_running());
    assert!(!session.is_dialogue_line_type(LineType::Text));
    assert!(!session.is_dialogue_line_type(LineType::Options));

    session.go_to_next_dialogue_line();
    session.scroll_clipped_text();
    assert!(session.is_running());
    assert_eq!(session.get_text(), "");
}

#[test]
fn test_runner_error_ends_dialogue() {
    let runner = ScriptedRunner::new(vec![
        Ok(LineKind::Text("First".to_string())),
        Err(RuntimeError::NodeNotFound {
            title: "Gone".to_string(),
        }),
    ]);
    let mut session = DialogueSession::with_runner(runner);
    session.start_from("Start");
    assert_eq!(session.get_text(), "First");

    session.complete_clipped_text_scrolling();
    assert!(!session.is_running());
}

#[test]
fn test_failed_select_is_logged_only() {
    let runner = ScriptedRunner::new(vec![Ok(LineKind::Options(vec![
        "A".to_string(),
        "B".to_string(),
    ]))]);
    let mut session = DialogueSession::with_runner(runner);
    session.start_from("Start");
    assert!(session.is_dialogue_line_type(LineType::Options));

    session.select_option(1);
    session.has_selected_option_changed();
    session.confirm_select_option();
    assert!(session.is_dialogue_line_type(LineType::Options));
    assert_eq!(session.get_selected_option(), Some(1));
}

#[test]
fn test_line_type_from_str() {
    assert_eq!("Text".parse::<LineType>(), Ok(LineType::Text));
    assert_eq!(" options ".parse::<LineType>(), Ok(LineType::Options));
    assert_eq!("command".parse::<LineType>(), Ok(LineType::Command));
    assert!("menu".parse::<LineType>().is_err());
}
