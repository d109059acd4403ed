//! Error types for the Butai client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClientError {
    /// The room does not exist and this client may not create it
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    /// The room is at capacity
    #[error("Room '{0}' is full")]
    RoomFull(String),

    /// Any other admission rejection
    #[error("Connection rejected with HTTP status {0}")]
    Rejected(u16),

    /// The connection dropped after it was established
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The connection could not be established
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A typed command could not be parsed
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}
