//! Session id tracking.
//!
//! The server assigns a session id in the WebSocket handshake and may renew
//! it in HTTP chat responses. Every chat request must carry the current id.

use std::time::Duration;

use crate::{
    error::ClientError,
    protocol::InboundMessage,
    transport::Channel,
};

/// Where the stored session id came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSource {
    /// WebSocket handshake message
    Handshake,
    /// `id` field of an HTTP chat response
    Http,
    /// Supplied by the user to resume an earlier session
    Configured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub created_via: SessionSource,
}

/// Holds the current session for one run
#[derive(Debug, Default)]
pub struct SessionManager {
    current: Option<Session>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known session id (resumption).
    pub fn resuming(session_id: impl Into<String>) -> Self {
        let id = session_id.into();
        if id.trim().is_empty() {
            return Self::new();
        }
        Self {
            current: Some(Session {
                id,
                created_via: SessionSource::Configured,
            }),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.current.as_ref().map(|session| session.id.as_str())
    }

    pub fn session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// The current id, or `MissingSession` if none has been received.
    pub fn require(&self) -> Result<&str, ClientError> {
        self.id().ok_or(ClientError::MissingSession)
    }

    /// Consume exactly one inbound message and expect it to be the handshake.
    pub async fn await_handshake(
        &mut self,
        channel: &mut dyn Channel,
        timeout: Duration,
    ) -> Result<String, ClientError> {
        tracing::info!("Waiting for session id...");

        let frame = match tokio::time::timeout(timeout, channel.receive()).await {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => {
                return Err(ClientError::ConnectionError(
                    "channel closed before the session handshake".to_string(),
                ));
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(ClientError::HandshakeError(format!(
                    "no session id received within {:?}",
                    timeout
                )));
            }
        };

        match InboundMessage::classify(frame) {
            InboundMessage::SessionHandshake { session_id } => {
                tracing::info!("Session id received: {}", session_id);
                self.store(session_id.clone(), SessionSource::Handshake);
                Ok(session_id)
            }
            other => {
                let description = other.describe();
                tracing::warn!("Unexpected message while waiting for session id: {}", description);
                Err(ClientError::HandshakeError(format!(
                    "unexpected message: {}",
                    description
                )))
            }
        }
    }

    /// Overwrite the stored id with one from an HTTP response (last write wins).
    ///
    /// Returns `true` if the id changed.
    pub fn update(&mut self, candidate_id: &str) -> bool {
        if candidate_id.trim().is_empty() || self.id() == Some(candidate_id) {
            return false;
        }
        if let Some(previous) = self.id() {
            tracing::info!("Session renewed: {} -> {}", previous, candidate_id);
        }
        self.store(candidate_id.to_string(), SessionSource::Http);
        true
    }

    /// Record a handshake seen outside `await_handshake`.
    ///
    /// Only fills an empty session; a stored id is never replaced here.
    pub fn observe_handshake(&mut self, session_id: &str) -> bool {
        if self.current.is_some() || session_id.trim().is_empty() {
            return false;
        }
        self.store(session_id.to_string(), SessionSource::Handshake);
        true
    }

    fn store(&mut self, id: String, created_via: SessionSource) {
        self.current = Some(Session { id, created_via });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{
        Frame,
        testing::{AfterScript, ScriptedChannel},
    };

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[test]
    fn test_require_without_session() {
        // テスト項目: セッション ID が無い場合は MissingSession エラーになる
        // given (前提条件):
        let manager = SessionManager::new();

        // when (操作):
        let result = manager.require();

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::MissingSession)));
    }

    #[test]
    fn test_resuming_with_blank_id_is_empty() {
        // テスト項目: 空白のみのセッション ID では再開扱いにならない
        // given (前提条件):

        // when (操作):
        let manager = SessionManager::resuming("  ");

        // then (期待する結果):
        assert!(manager.id().is_none());
    }

    #[tokio::test]
    async fn test_await_handshake_stores_session() {
        // テスト項目: 正しいハンドシェイクを受信するとセッション ID が保存される
        // given (前提条件):
        let mut manager = SessionManager::new();
        let mut channel = ScriptedChannel::new(
            vec![ScriptedChannel::handshake("abc")],
            AfterScript::Pending,
        );

        // when (操作):
        let result = manager.await_handshake(&mut channel, TIMEOUT).await;

        // then (期待する結果):
        assert_eq!(result.unwrap(), "abc");
        assert_eq!(
            manager.session(),
            Some(&Session {
                id: "abc".to_string(),
                created_via: SessionSource::Handshake
            })
        );
    }

    #[tokio::test]
    async fn test_await_handshake_rejects_wrong_shape() {
        // テスト項目: session_id の無いメッセージはハンドシェイク失敗となり状態は変わらない
        // given (前提条件):
        let mut manager = SessionManager::new();
        let mut channel = ScriptedChannel::new(
            vec![Frame::Text(r#"{"type":"session_id"}"#.to_string())],
            AfterScript::Pending,
        );

        // when (操作):
        let result = manager.await_handshake(&mut channel, TIMEOUT).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::HandshakeError(_))));
        assert!(manager.id().is_none());
    }

    #[tokio::test]
    async fn test_await_handshake_consumes_only_one_message() {
        // テスト項目: 最初のメッセージがハンドシェイクでなければ、後続のハンドシェイクは読まずに失敗する
        // given (前提条件):
        let mut manager = SessionManager::new();
        let mut channel = ScriptedChannel::new(
            vec![
                Frame::Text("hello".to_string()),
                ScriptedChannel::handshake("abc"),
            ],
            AfterScript::Pending,
        );

        // when (操作):
        let result = manager.await_handshake(&mut channel, TIMEOUT).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::HandshakeError(_))));
        assert!(manager.id().is_none());
        let next = channel.receive().await.unwrap();
        assert_eq!(next, Some(ScriptedChannel::handshake("abc")));
    }

    #[tokio::test]
    async fn test_await_handshake_rejects_binary() {
        // テスト項目: バイナリメッセージはハンドシェイク失敗となる
        // given (前提条件):
        let mut manager = SessionManager::new();
        let mut channel = ScriptedChannel::new(vec![Frame::Binary(vec![1, 2, 3])], AfterScript::Pending);

        // when (操作):
        let result = manager.await_handshake(&mut channel, TIMEOUT).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::HandshakeError(_))));
    }

    #[tokio::test]
    async fn test_await_handshake_times_out() {
        // テスト項目: タイムアウトまでに何も届かなければハンドシェイク失敗となる
        // given (前提条件):
        let mut manager = SessionManager::new();
        let mut channel = ScriptedChannel::new(vec![], AfterScript::Pending);

        // when (操作):
        let result = manager.await_handshake(&mut channel, TIMEOUT).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::HandshakeError(_))));
        assert!(manager.id().is_none());
    }

    #[tokio::test]
    async fn test_await_handshake_on_closed_channel() {
        // テスト項目: ハンドシェイク前にチャネルが閉じた場合は接続エラーになる
        // given (前提条件):
        let mut manager = SessionManager::new();
        let mut channel = ScriptedChannel::new(vec![], AfterScript::Closed);

        // when (操作):
        let result = manager.await_handshake(&mut channel, TIMEOUT).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::ConnectionError(_))));
    }

    #[tokio::test]
    async fn test_await_handshake_overwrites_resumed_session() {
        // テスト項目: 再開時のハンドシェイクでサーバーが返した ID に置き換わる
        // given (前提条件):
        let mut manager = SessionManager::resuming("old");
        let mut channel = ScriptedChannel::new(
            vec![ScriptedChannel::handshake("new")],
            AfterScript::Pending,
        );

        // when (操作):
        let result = manager.await_handshake(&mut channel, TIMEOUT).await;

        // then (期待する結果):
        assert_eq!(result.unwrap(), "new");
        assert_eq!(manager.id(), Some("new"));
    }

    #[test]
    fn test_update_overwrites_last_write_wins() {
        // テスト項目: HTTP 応答の ID で上書きされる（後勝ち）
        // given (前提条件):
        let mut manager = SessionManager::resuming("abc");

        // when (操作):
        let first = manager.update("def");
        let second = manager.update("ghi");

        // then (期待する結果):
        assert!(first && second);
        assert_eq!(
            manager.session(),
            Some(&Session {
                id: "ghi".to_string(),
                created_via: SessionSource::Http
            })
        );
    }

    #[test]
    fn test_update_with_same_id_keeps_source() {
        // テスト項目: 同じ ID での更新では変更なしとなり取得元も保持される
        // given (前提条件):
        let mut manager = SessionManager::new();
        manager.observe_handshake("abc");

        // when (操作):
        let changed = manager.update("abc");

        // then (期待する結果):
        assert!(!changed);
        assert_eq!(manager.session().unwrap().created_via, SessionSource::Handshake);
    }

    #[test]
    fn test_update_ignores_blank_id() {
        // テスト項目: 空の ID では更新されない
        // given (前提条件):
        let mut manager = SessionManager::resuming("abc");

        // when (操作):
        let changed = manager.update("");

        // then (期待する結果):
        assert!(!changed);
        assert_eq!(manager.id(), Some("abc"));
    }

    #[test]
    fn test_observe_handshake_does_not_replace_existing() {
        // テスト項目: 途中で届いたハンドシェイクは既存のセッション ID を置き換えない
        // given (前提条件):
        let mut manager = SessionManager::resuming("abc");

        // when (操作):
        let changed = manager.observe_handshake("other");

        // then (期待する結果):
        assert!(!changed);
        assert_eq!(manager.id(), Some("abc"));
    }

    #[test]
    fn test_observe_handshake_fills_empty_session() {
        // テスト項目: セッション未設定時は途中のハンドシェイクで ID が設定される
        // given (前提条件):
        let mut manager = SessionManager::new();

        // when (操作):
        let changed = manager.observe_handshake("abc");

        // then (期待する結果):
        assert!(changed);
        assert_eq!(manager.id(), Some("abc"));
    }
}
