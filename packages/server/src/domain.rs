//! Domain types for the mock chat backend.
//!
//! Sessions are identified by opaque strings. The backend assigns one when a
//! WebSocket connects without `sessionId` and otherwise adopts the requested
//! id as-is.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// .NET ticks (100ns) between 0001-01-01 and the Unix epoch
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;
const TICKS_PER_MILLI: i64 = 10_000;

/// Frame pushed to a connected session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Binary(Vec<u8>),
}

/// Per-connection outbound queue drained by the socket's pusher loop
pub type PusherChannel = mpsc::UnboundedSender<Outbound>;

/// Identifies one WebSocket connection of a session
pub type ConnectionId = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("Session '{0}' is not connected")]
    NotConnected(String),

    #[error("Connection for session '{0}' is gone")]
    ChannelClosed(String),
}

/// Delivery of frames to connected sessions
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Register `sender` for `session_id`, replacing any previous connection.
    async fn register(&self, session_id: &str, sender: PusherChannel) -> ConnectionId;

    /// Remove the registration if it still belongs to `connection_id`.
    ///
    /// Returns `false` when a newer connection has taken the session over.
    async fn unregister(&self, session_id: &str, connection_id: ConnectionId) -> bool;

    async fn is_connected(&self, session_id: &str) -> bool;

    async fn push_to(&self, session_id: &str, frame: Outbound) -> Result<(), MessagePushError>;

    async fn connected_count(&self) -> usize;
}

/// Build a new session id: `session_<ticks>_<8 hex>`.
///
/// # Arguments
///
/// * `now_millis` - Current Unix time in milliseconds
/// * `nonce` - Random suffix source; only the first 8 hex digits are used
pub fn generate_session_id(now_millis: i64, nonce: uuid::Uuid) -> String {
    let ticks = UNIX_EPOCH_TICKS + now_millis * TICKS_PER_MILLI;
    let simple = nonce.simple().to_string();
    format!("session_{}_{}", ticks, &simple[..8])
}

/// The session id requested in the query, or `None` if it is blank.
pub fn requested_session_id(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|id| !id.is_empty())
}
