//! Domain errors.

use thiserror::Error;

/// Validation failures for value objects.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueObjectError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{0} contains invalid characters")]
    InvalidCharacters(&'static str),

    #[error("{0} is out of range")]
    OutOfRange(&'static str),
}

/// Errors raised by room operations.
///
/// Every variant is reported to the acting participant only; a failed
/// operation never changes room state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoomError {
    #[error("Room '{0}' not found")]
    RoomNotFound(String),

    #[error("Room '{room_id}' is full ({max_participants} participants)")]
    RoomFull {
        room_id: String,
        max_participants: u32,
    },

    #[error("User '{0}' has already joined this room")]
    AlreadyJoined(String),

    #[error("Invalid room capacity: {0}")]
    InvalidCapacity(i64),

    #[error("User '{0}' is not allowed to perform this action")]
    Unauthorized(String),

    #[error("Participant '{0}' not found in room")]
    ParticipantNotFound(String),

    #[error("User '{0}' is sending chat messages too fast")]
    RateLimited(String),

    #[error("Room '{0}' is no longer live")]
    RoomClosed(String),

    #[error("Room '{0}' already exists")]
    RoomAlreadyExists(String),

    #[error(transparent)]
    InvalidValue(#[from] ValueObjectError),
}

/// Errors raised by the room registry storage.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepositoryError {
    #[error("Room '{0}' already exists")]
    RoomAlreadyExists(String),
}

impl From<RepositoryError> for RoomError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::RoomAlreadyExists(room_id) => Self::RoomAlreadyExists(room_id),
        }
    }
}

/// Errors raised while pushing messages to a connection.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MessagePushError {
    #[error("Client '{0}' not found")]
    ClientNotFound(String),

    #[error("Outbound queue for '{0}' overflowed; connection dropped")]
    QueueOverflow(String),

    #[error("Connection for '{0}' is closed")]
    ConnectionClosed(String),

    #[error("Failed to encode '{0}' message")]
    Encoding(&'static str),
}
