//! Server state.

use std::sync::Arc;

use crate::{
    domain::MessagePusher,
    usecase::{ConnectSessionUseCase, DisconnectSessionUseCase, SendChatUseCase},
};

/// Shared application state
pub struct AppState {
    pub connect_session_usecase: ConnectSessionUseCase,
    pub disconnect_session_usecase: DisconnectSessionUseCase,
    pub send_chat_usecase: SendChatUseCase,
    /// MessagePusher（メッセージ通知の抽象化）
    pub message_pusher: Arc<dyn MessagePusher>,
}
