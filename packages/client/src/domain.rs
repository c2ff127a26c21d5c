//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use crate::error::ClientError;

/// Inputs that end the interactive loop (compared case-insensitively)
pub const EXIT_COMMANDS: [&str; 3] = ["exit", "quit", "종료"];

/// One line of user input after interpretation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    Exit,
    Blank,
    Message(String),
}

/// Interpret one line typed at the prompt.
///
/// Surrounding whitespace is ignored; the message text is trimmed.
pub fn parse_input(line: &str) -> UserInput {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return UserInput::Blank;
    }

    let lowered = trimmed.to_lowercase();
    if EXIT_COMMANDS.contains(&lowered.as_str()) {
        return UserInput::Exit;
    }

    UserInput::Message(trimmed.to_string())
}

/// Check if the error means the channel could not be (re)established.
///
/// During setup these abort the run; during a turn they only fail the turn.
///
/// # Arguments
///
/// * `error` - The client error to check
///
/// # Returns
///
/// `true` for `ConnectionError` and `HandshakeError`, `false` otherwise
pub fn is_connection_failure(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::ConnectionError(_) | ClientError::HandshakeError(_)
    )
}
