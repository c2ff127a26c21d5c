//! Canned replies pushed back over the socket after a chat request.

use base64::{Engine as _, engine::general_purpose::STANDARD};

use crate::{
    domain::Outbound,
    infrastructure::dto::{ChatReplyMessage, MessageType},
};

const SAMPLE_RATE: u32 = 16_000;
const BITS_PER_SAMPLE: u16 = 16;
const CHANNELS: u16 = 1;
const WAV_HEADER_LEN: usize = 44;

/// Length of the generated audio clip
pub const REPLY_AUDIO_MILLIS: u32 = 250;

/// What text the backend answers with
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReplyMode {
    /// Repeat the user's message
    #[default]
    Echo,
    /// Always answer with the same text
    Fixed(String),
    /// Accept requests but never push anything
    Silent,
}

impl ReplyMode {
    pub fn text_for(&self, message: &str) -> Option<String> {
        match self {
            ReplyMode::Echo => Some(format!("You said: {}", message)),
            ReplyMode::Fixed(text) => Some(text.clone()),
            ReplyMode::Silent => None,
        }
    }
}

/// Reply modality selected by the request's `action` and endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Plain text frame
    Text,
    /// Binary WAV frame
    Audio,
    /// `{"type":"chat"}` JSON with base64 audio
    Integrated,
}

impl ReplyKind {
    /// Map `action` to a reply kind; `fallback` applies when it is absent or unknown.
    pub fn from_action(action: Option<&str>, fallback: ReplyKind) -> Self {
        match action.map(|a| a.trim().to_ascii_lowercase()).as_deref() {
            Some("chat") => ReplyKind::Text,
            Some("talk") => ReplyKind::Audio,
            Some("test") => ReplyKind::Integrated,
            Some(other) => {
                tracing::debug!("Unknown action '{}', using {:?}", other, fallback);
                fallback
            }
            None => fallback,
        }
    }
}

/// Build the frame pushed for one request, or `None` in silent mode.
pub fn compose_reply(
    mode: &ReplyMode,
    kind: ReplyKind,
    session_id: &str,
    message: &str,
) -> Option<Outbound> {
    let text = mode.text_for(message)?;

    let frame = match kind {
        ReplyKind::Text => Outbound::Text(text),
        ReplyKind::Audio => Outbound::Binary(wav_silence(REPLY_AUDIO_MILLIS)),
        ReplyKind::Integrated => {
            let reply = ChatReplyMessage {
                r#type: MessageType::Chat,
                session_id: session_id.to_string(),
                text,
                audio_data: Some(STANDARD.encode(wav_silence(REPLY_AUDIO_MILLIS))),
                audio_format: Some("wav".to_string()),
                audio_length: Some(REPLY_AUDIO_MILLIS as f32 / 1000.0),
            };
            match serde_json::to_string(&reply) {
                Ok(json) => Outbound::Text(json),
                Err(e) => {
                    tracing::error!("Failed to serialize chat reply: {}", e);
                    return None;
                }
            }
        }
    };

    Some(frame)
}

/// A mono 16-bit PCM WAV file of silence.
pub fn wav_silence(duration_millis: u32) -> Vec<u8> {
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let byte_rate = SAMPLE_RATE * block_align as u32;
    let samples = SAMPLE_RATE * duration_millis / 1000;
    let data_len = samples * block_align as u32;

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(WAV_HEADER_LEN + data_len as usize, 0);
    wav
}
