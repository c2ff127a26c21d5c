//! UseCase layer: session lifecycle and chat request handling.

mod connect_session;
mod disconnect_session;
mod error;
mod send_chat;

pub use connect_session::{ConnectSessionUseCase, ConnectedSession};
pub use disconnect_session::DisconnectSessionUseCase;
pub use error::SendChatError;
pub use send_chat::{PendingReply, SendChatUseCase};
