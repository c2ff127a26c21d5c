//! Data Transfer Objects for the WebSocket and HTTP surfaces.

use serde::{Deserialize, Serialize};

/// Message type tag on WebSocket JSON frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    SessionId,
    Chat,
}

/// First frame on every connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdMessage {
    pub r#type: MessageType,
    pub session_id: String,
}

impl SessionIdMessage {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            r#type: MessageType::SessionId,
            session_id: session_id.into(),
        }
    }
}

/// Text reply with optional embedded audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReplyMessage {
    pub r#type: MessageType,
    pub session_id: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_length: Option<f32>,
}

/// `POST /api/chat` and `POST /api/talk` body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChatRequestBody {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub actor: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponseBody {
    pub success: bool,
    pub message: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}
