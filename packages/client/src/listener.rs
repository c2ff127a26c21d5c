//! Waits for the server's reply to one chat turn.

use std::{path::PathBuf, sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::{
    audio::{AudioPlayer, AudioStore, PlaybackTasks},
    error::ClientError,
    protocol::{ChatReplyMessage, DEFAULT_AUDIO_EXTENSION, InboundMessage},
    session::SessionManager,
    transport::Channel,
};

/// Result of waiting for one reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenOutcome {
    /// Text reply; `audio` is set when the reply embedded audio
    Text {
        body: String,
        audio: Option<PathBuf>,
    },
    /// Binary payload saved to `path`
    Audio { path: PathBuf, size: usize },
    /// Nothing arrived before the listen timeout
    TimedOut,
    /// The server closed the channel
    ConnectionClosed,
}

pub struct ResponseListener {
    store: AudioStore,
    player: Arc<dyn AudioPlayer>,
    playback: PlaybackTasks,
}

impl ResponseListener {
    pub fn new(store: AudioStore, player: Arc<dyn AudioPlayer>) -> Self {
        Self {
            store,
            player,
            playback: PlaybackTasks::new(),
        }
    }

    /// Read from `channel` until one reply is classified or `timeout` elapses.
    ///
    /// Handshakes are skipped. Audio is saved and its playback started in the
    /// background before returning.
    pub async fn await_one(
        &mut self,
        channel: &mut dyn Channel,
        session: &mut SessionManager,
        timeout: Duration,
    ) -> Result<ListenOutcome, ClientError> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let frame = match tokio::time::timeout_at(deadline, channel.receive()).await {
                Err(_) => {
                    tracing::info!("No reply within {:?}", timeout);
                    return Ok(ListenOutcome::TimedOut);
                }
                Ok(Ok(Some(frame))) => frame,
                Ok(Ok(None)) | Ok(Err(ClientError::ChannelClosed)) => {
                    tracing::info!("Channel closed while waiting for a reply");
                    return Ok(ListenOutcome::ConnectionClosed);
                }
                Ok(Err(e)) => {
                    tracing::warn!("Receive failed, treating channel as closed: {}", e);
                    return Ok(ListenOutcome::ConnectionClosed);
                }
            };

            match InboundMessage::classify(frame) {
                InboundMessage::SessionHandshake { session_id } => {
                    if session.observe_handshake(&session_id) {
                        tracing::info!("Session id received mid-stream: {}", session_id);
                    } else {
                        tracing::debug!("Skipping session handshake ({})", session_id);
                    }
                }
                InboundMessage::TextReply { body } => return self.on_text(body).await,
                InboundMessage::BinaryPayload { bytes } => {
                    let size = bytes.len();
                    let path = self.save_and_play(&bytes, DEFAULT_AUDIO_EXTENSION).await?;
                    return Ok(ListenOutcome::Audio { path, size });
                }
            }
        }
    }

    /// Cancel outstanding playback; called once at shutdown.
    pub async fn shutdown(&mut self) {
        self.playback.shutdown().await;
    }

    pub fn pending_playbacks(&self) -> usize {
        self.playback.len()
    }

    async fn on_text(&mut self, body: String) -> Result<ListenOutcome, ClientError> {
        let Some(reply) = ChatReplyMessage::decode(&body) else {
            return Ok(ListenOutcome::Text { body, audio: None });
        };

        let audio = match reply.audio_data.as_deref().filter(|data| !data.is_empty()) {
            Some(encoded) => match STANDARD.decode(encoded) {
                Ok(bytes) => match self.save_and_play(&bytes, &reply.audio_extension()).await {
                    Ok(path) => Some(path),
                    Err(e) => {
                        tracing::warn!("Keeping text reply, audio was not saved: {}", e);
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!("Discarding undecodable audio_data: {}", e);
                    None
                }
            },
            None => None,
        };

        Ok(ListenOutcome::Text {
            body: reply.text.unwrap_or_default(),
            audio,
        })
    }

    async fn save_and_play(&mut self, bytes: &[u8], extension: &str) -> Result<PathBuf, ClientError> {
        let path = self.store.save(bytes, extension).await?;
        self.playback.spawn(self.player.clone(), path.clone());
        Ok(path)
    }
}
