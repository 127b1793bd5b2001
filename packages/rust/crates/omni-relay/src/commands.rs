//! Administrative command detection, checked before any question handling.
//!
//! Only an exact, lowercase `clear` is recognized as an action; every other prefixed text
//! (including `/CLEAR`) is answered with help.

/// Command recognized behind the configured prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayCommand {
    /// Drop the session's turn history.
    Clear,
    /// Show usage. Also the fallback for unknown commands.
    Help,
}

impl RelayCommand {
    /// Stable label for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Help => "help",
        }
    }
}

/// Detect a command; `None` when `input` does not start with `prefix`.
#[must_use]
pub fn detect_command(input: &str, prefix: &str) -> Option<RelayCommand> {
    if prefix.is_empty() {
        return None;
    }
    let rest = input.trim().strip_prefix(prefix)?;
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    match tokens.as_slice() {
        ["clear"] => Some(RelayCommand::Clear),
        _ => Some(RelayCommand::Help),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_clear_and_help() {
        assert_eq!(detect_command("/clear", "/"), Some(RelayCommand::Clear));
        assert_eq!(detect_command("  /clear ", "/"), Some(RelayCommand::Clear));
        assert_eq!(detect_command("/help", "/"), Some(RelayCommand::Help));
    }

    #[test]
    fn unknown_or_malformed_commands_fall_back_to_help() {
        assert_eq!(detect_command("/weather", "/"), Some(RelayCommand::Help));
        assert_eq!(detect_command("/", "/"), Some(RelayCommand::Help));
        assert_eq!(detect_command("/clear now", "/"), Some(RelayCommand::Help));
        assert_eq!(detect_command("/CLEAR", "/"), Some(RelayCommand::Help));
        assert_eq!(detect_command("/Clear", "/"), Some(RelayCommand::Help));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(detect_command("clear", "/"), None);
        assert_eq!(detect_command("what is /clear?", "/"), None);
        assert_eq!(detect_command("/clear", ""), None);
    }

    #[test]
    fn custom_prefix_is_honoured() {
        assert_eq!(detect_command("!clear", "!"), Some(RelayCommand::Clear));
        assert_eq!(detect_command("/clear", "!"), None);
    }
}
