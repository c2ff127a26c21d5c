//! Mock chat backend for the vgtalk client.
//!
//! Speaks the same protocol as the real service: a WebSocket at `/ws` that
//! announces the session id, and HTTP chat endpoints whose replies are pushed
//! back over that socket.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod reply;

pub use reply::ReplyMode;
pub use ui::{RunningServer, Server, ServerOptions};
