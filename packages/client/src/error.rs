//! Error types for the vgtalk client.

use thiserror::Error;

use crate::state::ConnectionState;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The WebSocket channel could not be established
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// No valid session id was received after connecting
    #[error("Handshake error: {0}")]
    HandshakeError(String),

    /// A chat request was attempted before any session id was known
    #[error("No session id available; connect to the server first")]
    MissingSession,

    /// The HTTP chat request failed or timed out
    #[error("Request failed: {reason}")]
    SendError {
        /// HTTP status code, when the server answered at all
        status: Option<u16>,
        reason: String,
    },

    /// Send or receive on a channel that is already closed
    #[error("Channel closed")]
    ChannelClosed,

    /// Received audio could not be decoded or saved
    #[error("Audio error: {0}")]
    AudioError(String),

    /// Illegal connection state transition
    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidState {
        from: ConnectionState,
        to: ConnectionState,
    },
}

impl ClientError {
    /// Build a `SendError` for a response that carried a status code.
    pub fn send_status(status: u16, reason: impl Into<String>) -> Self {
        Self::SendError {
            status: Some(status),
            reason: reason.into(),
        }
    }

    /// Build a `SendError` for a failure below HTTP (timeout, refused, ...).
    pub fn send_transport(reason: impl Into<String>) -> Self {
        Self::SendError {
            status: None,
            reason: reason.into(),
        }
    }
}

/// Errors reported by an audio player
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The player process could not be started
    #[error("Failed to start player '{program}': {reason}")]
    Spawn { program: String, reason: String },

    /// The player process exited unsuccessfully
    #[error("Player '{program}' exited with {status}")]
    Exit { program: String, status: String },
}
