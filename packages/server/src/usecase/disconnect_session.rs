//! UseCase: セッション切断処理

use std::sync::Arc;

use crate::domain::{ConnectionId, MessagePusher};

/// セッション切断のユースケース
pub struct DisconnectSessionUseCase {
    message_pusher: Arc<dyn MessagePusher>,
}

impl DisconnectSessionUseCase {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    /// 切断された接続の登録を解除する
    ///
    /// 同じセッションが既に再接続している場合は何もしない。
    pub async fn execute(&self, session_id: &str, connection_id: ConnectionId) {
        if self
            .message_pusher
            .unregister(session_id, connection_id)
            .await
        {
            tracing::info!("Session '{}' disconnected", session_id);
        } else {
            tracing::debug!(
                "Connection {} of session '{}' was already replaced",
                connection_id,
                session_id
            );
        }
    }
}
