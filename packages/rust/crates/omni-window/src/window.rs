//! Context window: budget- and recency-bounded slice of a session's turn history.

use crate::{PromptMessage, Turn, text_cost};

/// Default token budget per window.
pub const DEFAULT_BUDGET_TOKENS: usize = 1024;
/// Default idle gap (10 minutes) that invalidates a conversation.
pub const DEFAULT_IDLE_GAP_MS: u64 = 10 * 60 * 1000;
/// Default cap on turns considered per window.
pub const DEFAULT_MAX_TURNS: usize = 50;

/// Bounds applied while walking history.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowLimits {
    /// Max cumulative `token_cost` of kept turns.
    pub budget_tokens: usize,
    /// Silence between adjacent turns (ms) that discards the whole history.
    pub idle_gap_ms: u64,
    /// Max turns kept.
    pub max_turns: usize,
}

impl Default for WindowLimits {
    fn default() -> Self {
        Self {
            budget_tokens: DEFAULT_BUDGET_TOKENS,
            idle_gap_ms: DEFAULT_IDLE_GAP_MS,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

/// Why the history walk stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowStop {
    /// Every turn fit.
    Exhausted,
    /// The next turn would have exceeded the token budget.
    Budget,
    /// `max_turns` turns were collected.
    TurnLimit,
    /// A gap above the idle threshold; nothing is kept and the log must be purged.
    IdleGap,
}

impl WindowStop {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::Budget => "budget",
            Self::TurnLimit => "turn_limit",
            Self::IdleGap => "idle_gap",
        }
    }

    /// Whether the caller must purge the session's stored history.
    #[must_use]
    pub const fn purges_history(self) -> bool {
        matches!(self, Self::IdleGap)
    }
}

/// Prompt built for one question.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextWindow {
    messages: Vec<PromptMessage>,
    kept_turns: usize,
    kept_tokens: usize,
    stop: WindowStop,
    parent_id: Option<String>,
}

impl ContextWindow {
    /// Walk `history` (newest first) and build the prompt for `question`.
    ///
    /// The first gap measured is between `question_at_ms` and the newest turn.
    /// Output order is oldest to newest, ending with the new question.
    #[must_use]
    pub fn build(
        history: &[Turn],
        question: &str,
        question_at_ms: u64,
        limits: WindowLimits,
    ) -> Self {
        let mut kept: Vec<&Turn> = Vec::new();
        let mut kept_tokens = 0usize;
        let mut previous_at_ms = question_at_ms;
        let mut stop = WindowStop::Exhausted;

        for turn in history {
            if kept.len() >= limits.max_turns {
                stop = WindowStop::TurnLimit;
                break;
            }
            if previous_at_ms.saturating_sub(turn.created_at_ms) > limits.idle_gap_ms {
                stop = WindowStop::IdleGap;
                break;
            }
            let next_tokens = kept_tokens.saturating_add(turn.token_cost);
            if next_tokens > limits.budget_tokens {
                stop = WindowStop::Budget;
                break;
            }
            kept_tokens = next_tokens;
            previous_at_ms = turn.created_at_ms;
            kept.push(turn);
        }

        if stop.purges_history() {
            kept.clear();
            kept_tokens = 0;
        }

        let parent_id = kept
            .iter()
            .find(|turn| turn.is_answered())
            .and_then(|turn| turn.parent_id.clone());

        let mut messages = Vec::with_capacity(kept.len() * 2 + 1);
        for turn in kept.iter().rev() {
            messages.push(PromptMessage::user(turn.question.as_str()));
            if let Some(answer) = turn.answer.as_deref() {
                messages.push(PromptMessage::assistant(answer));
            }
        }
        messages.push(PromptMessage::user(question.trim()));

        Self {
            messages,
            kept_turns: kept.len(),
            kept_tokens,
            stop,
            parent_id,
        }
    }

    /// Prompt messages, oldest first, new question last.
    #[must_use]
    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    /// Consume into prompt messages.
    #[must_use]
    pub fn into_messages(self) -> Vec<PromptMessage> {
        self.messages
    }

    /// Number of history turns kept.
    #[must_use]
    pub fn kept_turns(&self) -> usize {
        self.kept_turns
    }

    /// Token cost of kept history (excludes the new question).
    #[must_use]
    pub fn kept_tokens(&self) -> usize {
        self.kept_tokens
    }

    /// Token cost of the new question.
    #[must_use]
    pub fn question_tokens(&self) -> usize {
        self.messages
            .last()
            .map_or(0, |message| text_cost(&message.content))
    }

    /// Why the walk stopped.
    #[must_use]
    pub fn stop(&self) -> WindowStop {
        self.stop
    }

    /// Continuation handle of the newest answered kept turn.
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}
