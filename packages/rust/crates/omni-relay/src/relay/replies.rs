//! Fixed user-facing reply texts. Errors reach users only through these.

/// Confirmation after `clear`.
pub const CLEAR_MESSAGE: &str = "✅ Conversation memory cleared";
/// Provider throttled the request.
pub const RATE_LIMITED_MESSAGE: &str =
    "Too many questions at once and I'm a little dizzy. Please try again later.";
/// Any other provider failure; the cause is never shown.
pub const UPSTREAM_ERROR_MESSAGE: &str = "That one was too hard and something went wrong. (uДu〃)";
/// Turn log unreachable while running a command.
pub const STORE_UNAVAILABLE_MESSAGE: &str =
    "Conversation memory is unavailable right now. Please try again later.";
/// Separator between question and answer in a recap.
pub const RECAP_SEPARATOR: &str = "\n------------\n";

/// Placeholder sent when the deadline wins the race.
#[must_use]
pub fn processing_message(retry_keyword: &str) -> String {
    format!("Processing ...\n\nPlease wait a few seconds, then send [{retry_keyword}] to see the reply")
}

/// Poll reply while no answer exists yet.
#[must_use]
pub fn nothing_yet_message(retry_keyword: &str) -> String {
    format!("No reply yet, please send [{retry_keyword}] again shortly")
}

/// Usage message for `help` and unknown commands.
#[must_use]
pub fn help_message(retry_keyword: &str, command_prefix: &str) -> String {
    let retry = format!("{retry_keyword:^9}");
    let clear = format!("{command_prefix}clear");
    let help = format!("{command_prefix}help");
    format!(
        "Relay command guide\n\
         | keyword   | action                     |\n\
         | {retry} | reply to the last question |\n\
         | {clear:^9} | clear conversation context |\n\
         | {help:^9} | show this help             |"
    )
}

/// Reply for message types the relay does not handle.
#[must_use]
pub fn unsupported_message(kind: &str) -> String {
    format!("{kind} messages are not supported yet")
}

/// `question` + separator + `answer`.
#[must_use]
pub fn recap_message(question: &str, answer: &str) -> String {
    format!("{question}{RECAP_SEPARATOR}{answer}")
}
