//! UseCase: チャットリクエスト処理
//!
//! HTTP では受付結果だけを返し、応答フレームはソケット経由で後から送る。

use std::{sync::Arc, time::Duration};

use crate::{
    domain::{MessagePushError, MessagePusher, Outbound},
    infrastructure::dto::ChatRequestBody,
    reply::{ReplyKind, ReplyMode, compose_reply},
};

use super::error::SendChatError;

/// Reply accepted for delivery on the session's socket
pub struct PendingReply {
    message_pusher: Arc<dyn MessagePusher>,
    session_id: String,
    frame: Option<Outbound>,
    delay: Duration,
}

impl PendingReply {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn frame(&self) -> Option<&Outbound> {
        self.frame.as_ref()
    }

    /// Wait out the configured delay, then push the frame.
    ///
    /// Returns `Ok(false)` when there was nothing to send.
    pub async fn deliver(self) -> Result<bool, MessagePushError> {
        let Some(frame) = self.frame else {
            tracing::debug!("No reply for session '{}'", self.session_id);
            return Ok(false);
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.message_pusher.push_to(&self.session_id, frame).await?;
        Ok(true)
    }
}

/// チャットリクエスト処理のユースケース
pub struct SendChatUseCase {
    message_pusher: Arc<dyn MessagePusher>,
    reply_mode: ReplyMode,
    reply_delay: Duration,
}

impl SendChatUseCase {
    pub fn new(
        message_pusher: Arc<dyn MessagePusher>,
        reply_mode: ReplyMode,
        reply_delay: Duration,
    ) -> Self {
        Self {
            message_pusher,
            reply_mode,
            reply_delay,
        }
    }

    /// リクエストを受け付け、送るべき応答を組み立てる
    ///
    /// # Arguments
    ///
    /// * `request` - HTTP リクエストボディ
    /// * `fallback` - `action` が無い場合の応答種別 (エンドポイントごとに異なる)
    pub async fn accept(
        &self,
        request: &ChatRequestBody,
        fallback: ReplyKind,
    ) -> Result<PendingReply, SendChatError> {
        let session_id = request.session_id.trim();
        if session_id.is_empty() {
            return Err(SendChatError::MissingSession);
        }
        if !self.message_pusher.is_connected(session_id).await {
            return Err(SendChatError::UnknownSession(session_id.to_string()));
        }

        let kind = ReplyKind::from_action(request.action.as_deref(), fallback);
        tracing::info!(
            "Chat from '{}' in session '{}' ({:?}): {}",
            request.actor,
            session_id,
            kind,
            request.message
        );

        Ok(PendingReply {
            message_pusher: self.message_pusher.clone(),
            session_id: session_id.to_string(),
            frame: compose_reply(&self.reply_mode, kind, session_id, &request.message),
            delay: self.reply_delay,
        })
    }
}
