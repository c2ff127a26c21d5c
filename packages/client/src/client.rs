//! Per-run client context: one session, one channel, one turn at a time.

use std::sync::Arc;

use vgtalk_shared::time::SystemClock;

use crate::{
    audio::{AudioStore, player_from_config},
    config::ClientConfig,
    error::ClientError,
    listener::{ListenOutcome, ResponseListener},
    protocol::ChatRequest,
    sender::{ChatApi, HttpChatApi, RequestSender},
    session::SessionManager,
    state::ConnectionState,
    transport::{Channel, Connector, WsConnector},
};

/// Owns everything one run of the interactive loop needs
pub struct ChatClient {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    sender: RequestSender,
    listener: ResponseListener,
    session: SessionManager,
    channel: Option<Box<dyn Channel>>,
    state: ConnectionState,
}

impl ChatClient {
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        api: Arc<dyn ChatApi>,
        listener: ResponseListener,
    ) -> Self {
        let session = match config.session_id.as_deref() {
            Some(id) => SessionManager::resuming(id),
            None => SessionManager::new(),
        };

        Self {
            config,
            connector,
            sender: RequestSender::new(api),
            listener,
            session,
            channel: None,
            state: ConnectionState::Disconnected,
        }
    }

    /// Wire the real WebSocket, HTTP, and audio collaborators.
    pub fn from_config(config: ClientConfig) -> Result<Self, ClientError> {
        let connector = Arc::new(WsConnector::new(&config.ws_url, config.connect_timeout));
        let api = Arc::new(HttpChatApi::new(
            &config.http_url,
            config.endpoint,
            config.http_timeout,
        )?);
        let store = AudioStore::new(&config.audio_dir, Arc::new(SystemClock));
        let listener = ResponseListener::new(store, player_from_config(config.player.as_deref()));

        Ok(Self::new(config, connector, api, listener))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.channel.is_some()
    }

    /// Open a fresh channel and wait for the session handshake.
    ///
    /// A known session id is sent for resumption; the handshake is awaited
    /// either way and its id is stored.
    pub async fn connect(&mut self) -> Result<String, ClientError> {
        if self.state.is_terminal() {
            // new transport instance, new lifetime
            self.state = ConnectionState::Disconnected;
        }
        self.advance(ConnectionState::Connecting)?;

        let resume_id = self.session.id().map(str::to_owned);
        let mut channel = match self.connector.connect(resume_id.as_deref()).await {
            Ok(channel) => channel,
            Err(e) => {
                self.advance(ConnectionState::Closed)?;
                return Err(e);
            }
        };
        self.advance(ConnectionState::AwaitingHandshake)?;

        match self
            .session
            .await_handshake(channel.as_mut(), self.config.handshake_timeout)
            .await
        {
            Ok(session_id) => {
                self.channel = Some(channel);
                self.advance(ConnectionState::Ready)?;
                Ok(session_id)
            }
            Err(e) => {
                if let Err(close_error) = channel.close().await {
                    tracing::debug!("Close after failed handshake: {}", close_error);
                }
                self.advance(ConnectionState::Closed)?;
                Err(e)
            }
        }
    }

    /// Run one turn: send `message` over HTTP, then wait for the reply.
    ///
    /// Fails with `MissingSession` before any I/O when no session id is known.
    /// Reconnects first if the previous turn saw the channel close.
    pub async fn turn(&mut self, message: &str) -> Result<ListenOutcome, ClientError> {
        self.session.require()?;

        if self.channel.is_none() {
            tracing::info!("Reconnecting before sending");
            self.connect().await?;
        }

        let request = ChatRequest::new(
            self.session.require()?,
            &self.config.actor,
            message,
            self.config.action,
        );

        self.advance(ConnectionState::Sending)?;
        tracing::info!("Sending request...");
        match self.sender.send(&request).await {
            Ok(renewed) => {
                self.session.update(&renewed);
            }
            Err(e) => {
                self.advance(ConnectionState::Ready)?;
                return Err(e);
            }
        }

        self.advance(ConnectionState::Listening)?;
        let Some(channel) = self.channel.as_mut() else {
            return Err(ClientError::ChannelClosed);
        };
        let outcome = self
            .listener
            .await_one(channel.as_mut(), &mut self.session, self.config.listen_timeout)
            .await;

        match outcome {
            Ok(ListenOutcome::ConnectionClosed) => {
                self.channel = None;
                self.advance(ConnectionState::Closing)?;
                self.advance(ConnectionState::Closed)?;
                Ok(ListenOutcome::ConnectionClosed)
            }
            Ok(outcome) => {
                self.advance(ConnectionState::Ready)?;
                Ok(outcome)
            }
            Err(e) => {
                self.advance(ConnectionState::Ready)?;
                Err(e)
            }
        }
    }

    /// Close the channel and cancel outstanding playback.
    pub async fn close(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if self.state.can_transition_to(ConnectionState::Closing) {
                self.state = ConnectionState::Closing;
            }
            match channel.close().await {
                Ok(()) => tracing::info!("WebSocket connection closed"),
                Err(e) => tracing::warn!("Failed to close WebSocket cleanly: {}", e),
            }
            self.state = ConnectionState::Closed;
        }
        self.listener.shutdown().await;
    }

    fn advance(&mut self, to: ConnectionState) -> Result<(), ClientError> {
        self.state = self.state.transition(to)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::{
        audio::NullPlayer,
        protocol::{ChatAction, ChatResponse},
        sender::MockChatApi,
        transport::{
            Frame,
            testing::{AfterScript, ScriptedChannel, ScriptedConnector},
        },
    };
    use std::time::Duration;
    use vgtalk_shared::time::FixedClock;

    fn test_config(session_id: Option<&str>) -> ClientConfig {
        ClientConfig {
            session_id: session_id.map(str::to_owned),
            listen_timeout: Duration::from_millis(200),
            handshake_timeout: Duration::from_millis(200),
            ..ClientConfig::default()
        }
    }

    fn client_with(
        config: ClientConfig,
        connector: Arc<ScriptedConnector>,
        api: MockChatApi,
        dir: &Path,
    ) -> ChatClient {
        let store = AudioStore::new(dir, Arc::new(FixedClock::new(1672531200123)));
        let listener = ResponseListener::new(store, Arc::new(NullPlayer));
        ChatClient::new(config, connector, Arc::new(api), listener)
    }

    #[tokio::test]
    async fn test_turn_without_session_makes_no_request() {
        // テスト項目: セッション ID が無い状態での送信は MissingSession となり、通信は一切行われない
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(ScriptedConnector::new(vec![]));
        let mut api = MockChatApi::new();
        api.expect_post_chat().times(0);
        let mut client = client_with(test_config(None), connector.clone(), api, dir.path());

        // when (操作):
        let result = client.turn("hi").await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::MissingSession)));
        assert!(connector.requested_sessions.lock().unwrap().is_empty());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_new_session_chat_round_trip() {
        // テスト項目: 新規接続→ハンドシェイク→送信→テキスト応答の一連の流れが成功する
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let channel = ScriptedChannel::new(
            vec![
                ScriptedChannel::handshake("abc"),
                Frame::Text("hello".to_string()),
            ],
            AfterScript::Pending,
        );
        let connector = Arc::new(ScriptedConnector::new(vec![channel]));
        let mut api = MockChatApi::new();
        api.expect_post_chat()
            .withf(|req| {
                req.session_id() == "abc" && req.message() == "hi" && req.action() == ChatAction::Chat
            })
            .times(1)
            .returning(|_| Ok(ChatResponse::with_id("abc")));
        let mut client = client_with(test_config(None), connector.clone(), api, dir.path());

        // when (操作):
        let session_id = client.connect().await.unwrap();
        let outcome = client.turn("hi").await.unwrap();

        // then (期待する結果):
        assert_eq!(session_id, "abc");
        assert_eq!(
            outcome,
            ListenOutcome::Text {
                body: "hello".to_string(),
                audio: None
            }
        );
        assert_eq!(client.session().id(), Some("abc"));
        assert_eq!(client.state(), ConnectionState::Ready);
        assert_eq!(*connector.requested_sessions.lock().unwrap(), vec![None]);
    }

    #[tokio::test]
    async fn test_resume_sends_session_and_awaits_handshake() {
        // テスト項目: 既存セッションで接続すると sessionId を渡し、ハンドシェイクも待つ
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let channel = ScriptedChannel::new(
            vec![ScriptedChannel::handshake("abc")],
            AfterScript::Pending,
        );
        let connector = Arc::new(ScriptedConnector::new(vec![channel]));
        let mut client = client_with(
            test_config(Some("abc")),
            connector.clone(),
            MockChatApi::new(),
            dir.path(),
        );

        // when (操作):
        let session_id = client.connect().await.unwrap();

        // then (期待する結果):
        assert_eq!(session_id, "abc");
        assert_eq!(
            *connector.requested_sessions.lock().unwrap(),
            vec![Some("abc".to_string())]
        );
        assert_eq!(client.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn test_resume_without_handshake_fails() {
        // テスト項目: 再開時でもハンドシェイクが届かなければ HandshakeError となり Closed になる
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let channel = ScriptedChannel::new(vec![], AfterScript::Pending);
        let closed = channel.closed.clone();
        let connector = Arc::new(ScriptedConnector::new(vec![channel]));
        let mut client = client_with(
            test_config(Some("abc")),
            connector,
            MockChatApi::new(),
            dir.path(),
        );

        // when (操作):
        let result = client.connect().await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::HandshakeError(_))));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(*closed.lock().unwrap());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        // テスト項目: 接続できない場合は ConnectionError となり Closed になる
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(ScriptedConnector::new(vec![]));
        let mut client = client_with(test_config(None), connector, MockChatApi::new(), dir.path());

        // when (操作):
        let result = client.connect().await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::ConnectionError(_))));
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_turn_stores_renewed_session_id() {
        // テスト項目: HTTP 応答で新しい ID が返されるとセッション ID が更新される
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let channel = ScriptedChannel::new(
            vec![
                ScriptedChannel::handshake("abc"),
                Frame::Text("hello".to_string()),
            ],
            AfterScript::Pending,
        );
        let connector = Arc::new(ScriptedConnector::new(vec![channel]));
        let mut api = MockChatApi::new();
        api.expect_post_chat()
            .times(1)
            .returning(|_| Ok(ChatResponse::with_id("def")));
        let mut client = client_with(test_config(None), connector, api, dir.path());
        client.connect().await.unwrap();

        // when (操作):
        client.turn("hi").await.unwrap();

        // then (期待する結果):
        assert_eq!(client.session().id(), Some("def"));
    }

    #[tokio::test]
    async fn test_turn_keeps_session_when_response_has_no_id() {
        // テスト項目: HTTP 応答に ID が無い場合はセッション ID が変わらない
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let channel = ScriptedChannel::new(
            vec![
                ScriptedChannel::handshake("abc"),
                Frame::Text("hello".to_string()),
            ],
            AfterScript::Pending,
        );
        let connector = Arc::new(ScriptedConnector::new(vec![channel]));
        let mut api = MockChatApi::new();
        api.expect_post_chat()
            .times(1)
            .returning(|_| Ok(ChatResponse::default()));
        let mut client = client_with(test_config(None), connector, api, dir.path());
        client.connect().await.unwrap();

        // when (操作):
        client.turn("hi").await.unwrap();

        // then (期待する結果):
        assert_eq!(client.session().id(), Some("abc"));
    }

    #[tokio::test]
    async fn test_send_error_returns_to_ready() {
        // テスト項目: HTTP 送信失敗はエラーを返し、状態は Ready に戻り、応答待ちはしない
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let channel = ScriptedChannel::new(
            vec![
                ScriptedChannel::handshake("abc"),
                Frame::Text("late reply".to_string()),
            ],
            AfterScript::Pending,
        );
        let connector = Arc::new(ScriptedConnector::new(vec![channel]));
        let mut api = MockChatApi::new();
        api.expect_post_chat()
            .times(1)
            .returning(|_| Err(ClientError::send_status(404, "404 Not Found - unknown session")));
        let mut client = client_with(test_config(None), connector, api, dir.path());
        client.connect().await.unwrap();

        // when (操作):
        let result = client.turn("hi").await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ClientError::SendError {
                status: Some(404),
                ..
            })
        ));
        assert_eq!(client.state(), ConnectionState::Ready);
        assert_eq!(client.session().id(), Some("abc"));
    }

    #[tokio::test]
    async fn test_http_timeout_is_turn_error_and_returns_to_ready() {
        // テスト項目: HTTP がタイムアウトしてもターンの失敗に留まり、状態は Ready に戻る
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let http = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let http_url = format!("http://{}", http.local_addr().unwrap());
        let _accept = tokio::spawn(async move {
            // accept and hold the socket without answering
            let (_socket, _) = http.accept().await.unwrap();
            std::future::pending::<()>().await;
        });
        let channel = ScriptedChannel::new(
            vec![ScriptedChannel::handshake("abc")],
            AfterScript::Pending,
        );
        let connector = Arc::new(ScriptedConnector::new(vec![channel]));
        let api = HttpChatApi::new(
            &http_url,
            crate::protocol::Endpoint::Chat,
            Duration::from_millis(200),
        )
        .unwrap();
        let store = AudioStore::new(dir.path(), Arc::new(FixedClock::new(1672531200123)));
        let listener = ResponseListener::new(store, Arc::new(NullPlayer));
        let mut client = ChatClient::new(test_config(None), connector, Arc::new(api), listener);
        client.connect().await.unwrap();

        // when (操作):
        let result = client.turn("hi").await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::SendError { status: None, .. })));
        assert_eq!(client.state(), ConnectionState::Ready);
        assert_eq!(client.session().id(), Some("abc"));
    }

    #[tokio::test]
    async fn test_turn_times_out_and_stays_ready() {
        // テスト項目: 応答が無い場合は TimedOut となり、セッションは継続する
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let channel = ScriptedChannel::new(
            vec![ScriptedChannel::handshake("abc")],
            AfterScript::Pending,
        );
        let connector = Arc::new(ScriptedConnector::new(vec![channel]));
        let mut api = MockChatApi::new();
        api.expect_post_chat()
            .times(1)
            .returning(|_| Ok(ChatResponse::with_id("abc")));
        let mut client = client_with(test_config(None), connector, api, dir.path());
        client.connect().await.unwrap();

        // when (操作):
        let outcome = client.turn("hi").await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome, ListenOutcome::TimedOut);
        assert_eq!(client.state(), ConnectionState::Ready);
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn test_closed_channel_reconnects_on_next_turn() {
        // テスト項目: 切断後の次のターンでは、既存セッション ID を使って再接続してから送信する
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let first = ScriptedChannel::new(
            vec![ScriptedChannel::handshake("abc")],
            AfterScript::Closed,
        );
        let second = ScriptedChannel::new(
            vec![
                ScriptedChannel::handshake("abc"),
                Frame::Text("welcome back".to_string()),
            ],
            AfterScript::Pending,
        );
        let connector = Arc::new(ScriptedConnector::new(vec![first, second]));
        let mut api = MockChatApi::new();
        api.expect_post_chat()
            .times(2)
            .returning(|_| Ok(ChatResponse::with_id("abc")));
        let mut client = client_with(test_config(None), connector.clone(), api, dir.path());
        client.connect().await.unwrap();

        // when (操作):
        let first_outcome = client.turn("hi").await.unwrap();
        let state_after_close = client.state();
        let second_outcome = client.turn("again").await.unwrap();

        // then (期待する結果):
        assert_eq!(first_outcome, ListenOutcome::ConnectionClosed);
        assert_eq!(state_after_close, ConnectionState::Closed);
        assert_eq!(
            second_outcome,
            ListenOutcome::Text {
                body: "welcome back".to_string(),
                audio: None
            }
        );
        assert_eq!(
            *connector.requested_sessions.lock().unwrap(),
            vec![None, Some("abc".to_string())]
        );
        assert_eq!(client.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn test_failed_reconnect_is_turn_error() {
        // テスト項目: 再接続に失敗したターンはエラーを返すが、セッション ID は保持される
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let first = ScriptedChannel::new(
            vec![ScriptedChannel::handshake("abc")],
            AfterScript::Closed,
        );
        let connector = Arc::new(ScriptedConnector::new(vec![first]));
        let mut api = MockChatApi::new();
        api.expect_post_chat()
            .times(1)
            .returning(|_| Ok(ChatResponse::with_id("abc")));
        let mut client = client_with(test_config(None), connector, api, dir.path());
        client.connect().await.unwrap();
        client.turn("hi").await.unwrap();

        // when (操作):
        let result = client.turn("again").await;

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::ConnectionError(_))));
        assert_eq!(client.session().id(), Some("abc"));
        assert_eq!(client.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_close_closes_channel() {
        // テスト項目: close でチャネルが閉じられ、状態が Closed になる
        // given (前提条件):
        let dir = tempfile::tempdir().unwrap();
        let channel = ScriptedChannel::new(
            vec![ScriptedChannel::handshake("abc")],
            AfterScript::Pending,
        );
        let closed = channel.closed.clone();
        let connector = Arc::new(ScriptedConnector::new(vec![channel]));
        let mut client = client_with(test_config(None), connector, MockChatApi::new(), dir.path());
        client.connect().await.unwrap();

        // when (操作):
        client.close().await;

        // then (期待する結果):
        assert!(*closed.lock().unwrap());
        assert_eq!(client.state(), ConnectionState::Closed);
        assert!(!client.is_connected());
    }
}
