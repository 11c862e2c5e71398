//! Error types for the chat subsystem.

use thiserror::Error;

use crate::chat::core::ids::UserId;

/// Chat subsystem error type.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The referenced user does not exist.
    #[error("user {0} not found")]
    NotFound(UserId),
    /// A user with this identifier is already registered.
    #[error("user {0} already exists")]
    AlreadyExists(UserId),
    /// A persisted chat record is missing mandatory fields.
    #[error("chat record for user {0} is incomplete; required fields are missing")]
    IncompleteRecord(UserId),
    /// Completion or translation service unreachable or errored.
    #[error("upstream service error: {0}")]
    Upstream(String),
    /// Rejected question/answer pair.
    #[error("invalid turn: {0}")]
    InvalidTurn(String),
    /// Rejected request payload.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// `SQLite` storage error.
    #[error("tokio-rusqlite error: {0}")]
    TokioSqlite(#[from] tokio_rusqlite::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// URL parse error.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Convenience result alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;
