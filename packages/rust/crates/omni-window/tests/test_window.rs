//! Integration tests for ContextWindow.

use omni_window::{ContextWindow, Role, Turn, WindowLimits, WindowStop};

const MINUTE_MS: u64 = 60 * 1000;

fn answered(question: &str, answer: &str, at_ms: u64) -> Turn {
    Turn::pending("s1", question, at_ms).with_answer(answer, None)
}

/// Newest-first history from (question, answer, at) tuples given oldest first.
fn history(turns: &[(&str, &str, u64)]) -> Vec<Turn> {
    turns
        .iter()
        .rev()
        .map(|(q, a, at)| answered(q, a, *at))
        .collect()
}

#[test]
fn test_empty_history_yields_only_question() {
    let w = ContextWindow::build(&[], " hello ", 0, WindowLimits::default());
    assert_eq!(w.stop(), WindowStop::Exhausted);
    assert_eq!(w.kept_turns(), 0);
    assert_eq!(w.messages().len(), 1);
    assert_eq!(w.messages()[0].role, Role::User);
    assert_eq!(w.messages()[0].content, "hello");
    assert_eq!(w.question_tokens(), 5);
}

#[test]
fn test_messages_are_oldest_first_and_end_with_question() {
    let h = history(&[("a", "1", 1_000), ("b", "2", 2_000)]);
    let w = ContextWindow::build(&h, "c", 3_000, WindowLimits::default());
    let rendered: Vec<(Role, &str)> = w
        .messages()
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        rendered,
        vec![
            (Role::User, "a"),
            (Role::Assistant, "1"),
            (Role::User, "b"),
            (Role::Assistant, "2"),
            (Role::User, "c"),
        ]
    );
    assert_eq!(w.kept_turns(), 2);
    assert_eq!(w.kept_tokens(), 4);
}

#[test]
fn test_budget_is_never_exceeded() {
    let h = history(&[
        ("aaaa", "bbbb", 1_000),
        ("cccc", "dddd", 2_000),
        ("eeee", "ffff", 3_000),
    ]);
    for budget in 0..30 {
        let limits = WindowLimits {
            budget_tokens: budget,
            ..WindowLimits::default()
        };
        let w = ContextWindow::build(&h, "next", 4_000, limits);
        assert!(w.kept_tokens() <= budget, "budget {budget} exceeded");
        assert_eq!(w.kept_tokens(), w.kept_turns() * 8);
    }
}

#[test]
fn test_budget_stop_keeps_newest_turns() {
    let h = history(&[
        ("old", "old", 1_000),
        ("mid", "mid", 2_000),
        ("new", "new", 3_000),
    ]);
    let limits = WindowLimits {
        budget_tokens: 13,
        ..WindowLimits::default()
    };
    let w = ContextWindow::build(&h, "q", 4_000, limits);
    assert_eq!(w.stop(), WindowStop::Budget);
    assert_eq!(w.kept_turns(), 2);
    assert_eq!(w.messages()[0].content, "mid");
    assert!(!w.stop().purges_history());
}

#[test]
fn test_turn_limit_caps_window() {
    let h = history(&[("a", "1", 1_000), ("b", "2", 2_000), ("c", "3", 3_000)]);
    let limits = WindowLimits {
        max_turns: 2,
        ..WindowLimits::default()
    };
    let w = ContextWindow::build(&h, "d", 4_000, limits);
    assert_eq!(w.stop(), WindowStop::TurnLimit);
    assert_eq!(w.kept_turns(), 2);
    assert_eq!(w.messages()[0].content, "b");
}

#[test]
fn test_idle_gap_between_history_turns_discards_everything() {
    let h = history(&[("hello", "hi", 0), ("again", "yes", 15 * MINUTE_MS)]);
    let limits = WindowLimits {
        idle_gap_ms: 10 * MINUTE_MS,
        ..WindowLimits::default()
    };
    let w = ContextWindow::build(&h, "new", 15 * MINUTE_MS + 1_000, limits);
    assert_eq!(w.stop(), WindowStop::IdleGap);
    assert!(w.stop().purges_history());
    assert_eq!(w.kept_turns(), 0);
    assert_eq!(w.kept_tokens(), 0);
    assert_eq!(w.messages().len(), 1);
    assert_eq!(w.messages()[0].content, "new");
}

#[test]
fn test_idle_gap_before_new_question_discards_everything() {
    let h = history(&[("hello", "hi", 0)]);
    let w = ContextWindow::build(&h, "later", 11 * MINUTE_MS, WindowLimits::default());
    assert_eq!(w.stop(), WindowStop::IdleGap);
    assert_eq!(w.messages().len(), 1);
}

#[test]
fn test_gap_exactly_at_threshold_is_kept() {
    let h = history(&[("hello", "hi", 0)]);
    let w = ContextWindow::build(&h, "now", 10 * MINUTE_MS, WindowLimits::default());
    assert_eq!(w.stop(), WindowStop::Exhausted);
    assert_eq!(w.kept_turns(), 1);
}

#[test]
fn test_pending_turn_contributes_only_question() {
    let h = vec![Turn::pending("s1", "still waiting", 1_000)];
    let w = ContextWindow::build(&h, "next", 2_000, WindowLimits::default());
    assert_eq!(w.messages().len(), 2);
    assert_eq!(w.messages()[0].role, Role::User);
    assert_eq!(w.messages()[0].content, "still waiting");
}

#[test]
fn test_parent_id_comes_from_newest_answered_turn() {
    let older = Turn::pending("s1", "a", 1_000).with_answer("1", Some("p-old".to_string()));
    let newer = Turn::pending("s1", "b", 2_000).with_answer("2", Some("p-new".to_string()));
    let pending = Turn::pending("s1", "c", 3_000);
    let h = vec![pending, newer, older];
    let w = ContextWindow::build(&h, "d", 4_000, WindowLimits::default());
    assert_eq!(w.parent_id(), Some("p-new"));
}

#[test]
fn test_turn_serializes_without_absent_answer() {
    let turn = Turn::pending("s1", "hello", 5);
    let json = serde_json::to_value(&turn).unwrap_or_default();
    assert!(json.get("answer").is_none());
    assert_eq!(json.get("question").and_then(|v| v.as_str()), Some("hello"));
}
