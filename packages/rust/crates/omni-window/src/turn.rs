//! One question/answer exchange plus the prompt message shape it renders into.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speaker of a prompt message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user question.
    User,
    /// Completion provider answer.
    Assistant,
}

impl Role {
    /// Wire name (`user` / `assistant`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Role-tagged text sent to the completion provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Speaker.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl PromptMessage {
    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One turn of a session. `answer` stays `None` until the completion resolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[must_use]
pub struct Turn {
    /// Time-ordered identifier (UUID v7).
    pub id: Uuid,
    /// Conversation key.
    pub session_id: String,
    /// Trimmed user text.
    pub question: String,
    /// Completion text, or the error placeholder that closed the turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// Arrival time in unix epoch milliseconds.
    pub created_at_ms: u64,
    /// Character length of question + answer.
    pub token_cost: usize,
    /// Provider-side continuation handle, when the provider returns one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Turn {
    /// Answer-less turn for a freshly arrived question.
    pub fn pending(session_id: &str, question: &str, created_at_ms: u64) -> Self {
        let question = question.trim().to_string();
        Self {
            id: Uuid::now_v7(),
            session_id: session_id.to_string(),
            token_cost: text_cost(&question),
            question,
            answer: None,
            created_at_ms,
            parent_id: None,
        }
    }

    /// Close the turn with an answer; cost is computed once here.
    pub fn with_answer(mut self, answer: &str, parent_id: Option<String>) -> Self {
        self.token_cost = turn_cost(&self.question, answer);
        self.answer = Some(answer.to_string());
        self.parent_id = parent_id;
        self
    }

    /// Whether an answer (or error placeholder) has been attached.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.answer.is_some()
    }
}

/// Cost proxy of one text: its length in characters.
#[must_use]
pub fn text_cost(text: &str) -> usize {
    text.chars().count()
}

/// Cost of a completed turn.
#[must_use]
pub fn turn_cost(question: &str, answer: &str) -> usize {
    text_cost(question).saturating_add(text_cost(answer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_turn_trims_and_costs_question_only() {
        let turn = Turn::pending("s1", "  hello  ", 10);
        assert_eq!(turn.question, "hello");
        assert_eq!(turn.token_cost, 5);
        assert!(!turn.is_answered());
    }

    #[test]
    fn cost_counts_characters_not_bytes() {
        assert_eq!(text_cost("你好"), 2);
        assert_eq!(turn_cost("你好", "hi"), 4);
    }
}
