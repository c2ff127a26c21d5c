//! UseCase: セッション接続処理
//!
//! - `sessionId` 指定なし: 新しいセッション ID を発行する
//! - `sessionId` 指定あり: その ID をそのまま採用する (既存の接続は置き換え)

use std::sync::Arc;

use vgtalk_shared::time::{Clock, timestamp_to_rfc3339};

use crate::domain::{
    ConnectionId, MessagePusher, PusherChannel, generate_session_id, requested_session_id,
};

/// Result of registering a new connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectedSession {
    pub session_id: String,
    pub connection_id: ConnectionId,
    /// Unix timestamp in milliseconds
    pub connected_at: i64,
}

/// セッション接続のユースケース
pub struct ConnectSessionUseCase {
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl ConnectSessionUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            message_pusher,
            clock,
        }
    }

    /// セッション接続を実行
    ///
    /// # Arguments
    ///
    /// * `requested` - クエリの `sessionId` (空白のみは指定なし扱い)
    /// * `sender` - このセッションへのフレーム送信用チャンネル
    pub async fn execute(&self, requested: Option<&str>, sender: PusherChannel) -> ConnectedSession {
        let connected_at = self.clock.now_millis();
        let session_id = match requested_session_id(requested) {
            Some(id) => {
                tracing::info!("Resuming session '{}'", id);
                id.to_string()
            }
            None => generate_session_id(connected_at, uuid::Uuid::new_v4()),
        };

        let connection_id = self.message_pusher.register(&session_id, sender).await;
        tracing::info!(
            "Session '{}' connected at {}",
            session_id,
            timestamp_to_rfc3339(connected_at)
        );

        ConnectedSession {
            session_id,
            connection_id,
            connected_at,
        }
    }
}
