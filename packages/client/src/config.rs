//! Client configuration.

use std::{path::PathBuf, time::Duration};

use crate::protocol::{ChatAction, Endpoint};

/// Local development address of the chat backend
pub const DEFAULT_HTTP_URL: &str = "http://localhost:5287";
pub const DEFAULT_WS_URL: &str = "ws://localhost:5287/ws";
pub const DEFAULT_ACTOR: &str = "test_user";
pub const DEFAULT_AUDIO_DIR: &str = "audio";

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
pub const LISTEN_TIMEOUT: Duration = Duration::from_secs(5);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL for HTTP chat requests
    pub http_url: String,
    /// WebSocket endpoint (`ws://` or `wss://`)
    pub ws_url: String,
    /// Actor name sent with every request
    pub actor: String,
    pub action: ChatAction,
    pub endpoint: Endpoint,
    /// Session to resume on the first connect
    pub session_id: Option<String>,
    /// Where received audio is written
    pub audio_dir: PathBuf,
    /// Player command line; the audio path is appended
    pub player: Option<String>,
    pub connect_timeout: Duration,
    pub handshake_timeout: Duration,
    pub listen_timeout: Duration,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http_url: DEFAULT_HTTP_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            actor: DEFAULT_ACTOR.to_string(),
            action: ChatAction::Chat,
            endpoint: Endpoint::Chat,
            session_id: None,
            audio_dir: PathBuf::from(DEFAULT_AUDIO_DIR),
            player: None,
            connect_timeout: CONNECT_TIMEOUT,
            handshake_timeout: HANDSHAKE_TIMEOUT,
            listen_timeout: LISTEN_TIMEOUT,
            http_timeout: HTTP_TIMEOUT,
        }
    }
}
