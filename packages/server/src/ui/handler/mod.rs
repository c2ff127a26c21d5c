//! Request handlers.

mod http;
mod websocket;

pub use http::{health_check, post_chat, post_talk};
pub use websocket::websocket_handler;
