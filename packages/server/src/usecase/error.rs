//! UseCase errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendChatError {
    #[error("session_id is required")]
    MissingSession,

    #[error("Session '{0}' not found")]
    UnknownSession(String),
}
