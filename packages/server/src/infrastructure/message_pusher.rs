//! WebSocket を使った MessagePusher 実装
//!
//! WebSocket の生成は UI 層 (`ui/handler/websocket.rs`) で行われます。
//! この実装は生成された `PusherChannel` を受け取り、フレーム送信に使用します。

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, Outbound, PusherChannel};

struct Registration {
    connection_id: ConnectionId,
    sender: PusherChannel,
}

/// WebSocket を使った MessagePusher 実装
///
/// Key: session_id, Value: 最新の接続の sender
#[derive(Default)]
pub struct WebSocketMessagePusher {
    sessions: Mutex<HashMap<String, Registration>>,
    next_connection_id: AtomicU64,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register(&self, session_id: &str, sender: PusherChannel) -> ConnectionId {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let mut sessions = self.sessions.lock().await;
        let previous = sessions.insert(
            session_id.to_string(),
            Registration {
                connection_id,
                sender,
            },
        );
        if previous.is_some() {
            tracing::info!("Session '{}' replaced its previous connection", session_id);
        }
        tracing::debug!(
            "Session '{}' registered as connection {}",
            session_id,
            connection_id
        );
        connection_id
    }

    async fn unregister(&self, session_id: &str, connection_id: ConnectionId) -> bool {
        let mut sessions = self.sessions.lock().await;
        match sessions.get(session_id) {
            Some(registration) if registration.connection_id == connection_id => {
                sessions.remove(session_id);
                tracing::debug!("Session '{}' unregistered", session_id);
                true
            }
            _ => false,
        }
    }

    async fn is_connected(&self, session_id: &str) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    async fn push_to(&self, session_id: &str, frame: Outbound) -> Result<(), MessagePushError> {
        let sessions = self.sessions.lock().await;
        let registration = sessions
            .get(session_id)
            .ok_or_else(|| MessagePushError::NotConnected(session_id.to_string()))?;

        registration
            .sender
            .send(frame)
            .map_err(|_| MessagePushError::ChannelClosed(session_id.to_string()))?;
        tracing::debug!("Pushed frame to session '{}'", session_id);
        Ok(())
    }

    async fn connected_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
