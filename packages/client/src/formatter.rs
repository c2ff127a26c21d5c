//! Message formatting utilities for client display.

use std::{path::Path, time::Duration};

use crate::{domain::EXIT_COMMANDS, error::ClientError, listener::ListenOutcome};

const RULE: &str = "============================================================";
const LINE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the banner shown once the session is ready
    ///
    /// # Arguments
    ///
    /// * `actor` - The actor name sent with each request
    /// * `session_id` - The session id received in the handshake
    pub fn format_banner(actor: &str, session_id: &str) -> String {
        format!(
            "\n{rule}\nYou are '{actor}' (session: {session_id}).\n\
             Type a message and press Enter. Exit with: {exits}\n{rule}\n",
            rule = RULE,
            actor = actor,
            session_id = session_id,
            exits = EXIT_COMMANDS.join(", "),
        )
    }

    /// Prompt shown by the line editor
    pub fn format_prompt(actor: &str) -> String {
        format!("{}> ", actor)
    }

    /// Format the outcome of one turn
    pub fn format_outcome(outcome: &ListenOutcome, listen_timeout: Duration) -> String {
        match outcome {
            ListenOutcome::Text { body, audio } => {
                let mut output = Self::format_reply(body);
                if let Some(path) = audio {
                    output.push_str(&Self::format_audio_saved(path, None));
                }
                output
            }
            ListenOutcome::Audio { path, size } => Self::format_audio_saved(path, Some(*size)),
            ListenOutcome::TimedOut => Self::format_timed_out(listen_timeout),
            ListenOutcome::ConnectionClosed => Self::format_connection_closed(),
        }
    }

    /// Format a text reply
    pub fn format_reply(body: &str) -> String {
        format!("\n{line}\nAI: {body}\n{line}\n", line = LINE, body = body)
    }

    /// Format a saved-audio notification
    ///
    /// # Arguments
    ///
    /// * `path` - Where the audio was written
    /// * `size` - Payload size in bytes, when known
    pub fn format_audio_saved(path: &Path, size: Option<usize>) -> String {
        match size {
            Some(size) => format!(
                "\n← Received {} bytes of audio, saved to {}\n",
                size,
                path.display()
            ),
            None => format!("← Audio saved to {}\n", path.display()),
        }
    }

    pub fn format_timed_out(listen_timeout: Duration) -> String {
        format!(
            "\n(no reply within {}s; it may still arrive with the next turn)\n",
            listen_timeout.as_secs_f32()
        )
    }

    pub fn format_connection_closed() -> String {
        "\nServer closed the connection. It will be reopened with your next message.\n".to_string()
    }

    /// Format a failed turn with a retry hint
    pub fn format_turn_failed(error: &ClientError) -> String {
        format!("\n{}\nPlease try again.\n", error)
    }

    pub fn format_blank_input() -> String {
        "Please enter a message.".to_string()
    }

    pub fn format_waiting() -> String {
        "Waiting for reply...".to_string()
    }

    pub fn format_goodbye() -> String {
        "Chat ended.".to_string()
    }
}
