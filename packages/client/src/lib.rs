//! Interactive test client for a session-oriented chat service.
//!
//! The client keeps one WebSocket channel open for server pushes and sends
//! each user message as an HTTP request. A turn is one request followed by
//! waiting for at most one reply on the channel.

pub mod audio;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod listener;
pub mod protocol;
pub mod repl;
pub mod sender;
pub mod session;
pub mod state;
pub mod transport;

pub use client::ChatClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use repl::{SessionReport, run_client};
