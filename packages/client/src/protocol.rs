//! Wire types exchanged with the chat server.
//!
//! - WebSocket: session handshake, integrated chat replies, raw text and binary frames
//! - HTTP: chat request body and response body

use serde::{Deserialize, Serialize};

use crate::transport::Frame;

/// Message type tags used by the server on the WebSocket channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Session handshake (`{"type":"session_id", ...}`)
    SessionId,
    /// Integrated chat reply (`{"type":"chat", ...}`)
    Chat,
}

/// Session handshake sent by the server right after the WebSocket upgrade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandshakeMessage {
    pub r#type: MessageType,
    pub session_id: String,
}

impl SessionHandshakeMessage {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            r#type: MessageType::SessionId,
            session_id: session_id.into(),
        }
    }

    /// Decode a handshake, returning the session id.
    ///
    /// Returns `None` for anything but `{"type":"session_id","session_id":"<non-empty>"}`.
    pub fn decode(text: &str) -> Option<String> {
        let message = serde_json::from_str::<SessionHandshakeMessage>(text).ok()?;
        if message.r#type != MessageType::SessionId || message.session_id.trim().is_empty() {
            return None;
        }
        Some(message.session_id)
    }
}

/// Chat reply carrying text and optionally base64-encoded audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReplyMessage {
    pub r#type: MessageType,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub audio_data: Option<String>,
    #[serde(default)]
    pub audio_format: Option<String>,
    #[serde(default)]
    pub audio_length: Option<f32>,
}

impl ChatReplyMessage {
    /// Decode an integrated chat reply; `None` if the body has another shape.
    pub fn decode(text: &str) -> Option<Self> {
        serde_json::from_str::<ChatReplyMessage>(text)
            .ok()
            .filter(|message| message.r#type == MessageType::Chat)
    }

    /// File extension for the embedded audio (`wav` unless the server says otherwise).
    pub fn audio_extension(&self) -> String {
        self.audio_format
            .as_deref()
            .map(extension_for_format)
            .unwrap_or_else(|| DEFAULT_AUDIO_EXTENSION.to_string())
    }
}

/// Extension used when the server does not name an audio format
pub const DEFAULT_AUDIO_EXTENSION: &str = "wav";

/// Turn an `audio_format` value into a file extension.
///
/// The backend reports the TTS content type (`audio/wav`, `audio/mpeg;
/// codecs=...`), older payloads a bare extension (`mp3`). The result only
/// contains ASCII alphanumerics, so it can never leave the audio directory.
pub fn extension_for_format(format: &str) -> String {
    let essence = format.split(';').next().unwrap_or_default().trim();
    let subtype = essence
        .rsplit_once('/')
        .map_or(essence, |(_, subtype)| subtype)
        .trim_start_matches("x-")
        .to_ascii_lowercase();

    let extension = match subtype.as_str() {
        "wav" | "wave" | "vnd.wave" => "wav".to_string(),
        "mpeg" | "mp3" | "mpeg3" => "mp3".to_string(),
        "ogg" | "opus" => "ogg".to_string(),
        "mp4" | "m4a" | "aac" => "m4a".to_string(),
        other => other
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect(),
    };

    if extension.is_empty() {
        DEFAULT_AUDIO_EXTENSION.to_string()
    } else {
        extension
    }
}

/// Inbound WebSocket message after classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    SessionHandshake { session_id: String },
    TextReply { body: String },
    BinaryPayload { bytes: Vec<u8> },
}

impl InboundMessage {
    /// Classify a frame.
    ///
    /// Binary framing wins first, then a structured handshake decode; any other
    /// text is an opaque reply.
    pub fn classify(frame: Frame) -> Self {
        match frame {
            Frame::Binary(bytes) => InboundMessage::BinaryPayload { bytes },
            Frame::Text(text) => match SessionHandshakeMessage::decode(&text) {
                Some(session_id) => InboundMessage::SessionHandshake { session_id },
                None => InboundMessage::TextReply { body: text },
            },
        }
    }

    /// Short description for log lines (never dumps binary content).
    pub fn describe(&self) -> String {
        match self {
            InboundMessage::SessionHandshake { session_id } => {
                format!("session handshake ({})", session_id)
            }
            InboundMessage::TextReply { body } => format!("text: {}", body),
            InboundMessage::BinaryPayload { bytes } => format!("{} bytes of binary data", bytes.len()),
        }
    }
}

/// Action tag carried by a chat request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChatAction {
    Chat,
    Talk,
    Test,
}

/// HTTP endpoint variant the chat request is posted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Endpoint {
    Chat,
    Talk,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Chat => "/api/chat",
            Endpoint::Talk => "/api/talk",
        }
    }

    /// Join the endpoint path onto a base URL such as `http://localhost:5287/`.
    pub fn url(self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }
}

/// HTTP chat request body
///
/// Fields are private: a request is immutable once built and is sent exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    session_id: String,
    actor: String,
    message: String,
    action: ChatAction,
}

impl ChatRequest {
    pub fn new(
        session_id: impl Into<String>,
        actor: impl Into<String>,
        message: impl Into<String>,
        action: ChatAction,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            actor: actor.into(),
            message: message.into(),
            action,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn action(&self) -> ChatAction {
        self.action
    }
}

/// HTTP chat response body
///
/// The renewed session id is normally `id`; `sessionId` and `session_id` are
/// accepted as well.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "sessionId")]
    pub session_id_camel: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatResponse {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn renewed_session_id(&self) -> Option<&str> {
        [&self.id, &self.session_id_camel, &self.session_id]
            .into_iter()
            .filter_map(|candidate| candidate.as_deref())
            .find(|candidate| !candidate.trim().is_empty())
    }
}
