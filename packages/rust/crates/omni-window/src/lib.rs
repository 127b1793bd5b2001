//! omni-window: turn model and context window for relayed conversations.
//!
//! Walks a session's newest-first turn history under a token budget, an idle-gap
//! threshold and a turn cap, and renders the survivors as role-tagged prompt messages.
//! No I/O: callers own the turn log and act on [`WindowStop::IdleGap`] themselves.

mod turn;
mod window;

pub use turn::{PromptMessage, Role, Turn, text_cost, turn_cost};
pub use window::{ContextWindow, WindowLimits, WindowStop};
