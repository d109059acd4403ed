//! Domain logic for client-side operations.
//!
//! This module contains pure functions that implement business logic
//! without side effects, making them easy to test.

use std::time::Duration;

use crate::error::ClientError;

/// Map an HTTP status returned instead of an upgrade to a client error.
///
/// A second connection for the same user supersedes the first instead of
/// being refused, so there is no "already joined" rejection.
///
/// # Arguments
///
/// * `status` - The HTTP status code of the rejected upgrade
/// * `room_id` - The room that was requested
pub fn rejection_for_status(status: u16, room_id: &str) -> ClientError {
    match status {
        404 => ClientError::RoomNotFound(room_id.to_string()),
        503 => ClientError::RoomFull(room_id.to_string()),
        other => ClientError::Rejected(other),
    }
}

/// Check if the client should exit immediately based on the error type.
///
/// Admission rejections are final: retrying would be refused the same way.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(
        error,
        ClientError::RoomNotFound(_)
            | ClientError::RoomFull(_)
            | ClientError::Rejected(_)
    )
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    // Don't reconnect if the error requires immediate exit
    if should_exit_immediately(error) {
        return false;
    }

    // Don't reconnect if we've exhausted all attempts
    current_attempt < max_attempts
}

/// Exponential backoff with symmetric jitter.
///
/// `min(max_delay, base_delay * 2^attempt)` scaled by
/// `1 + (random * 2 - 1) * jitter_factor`, where `random` is in `[0, 1)`.
pub fn backoff_delay(
    attempt: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_factor: f64,
    random: f64,
) -> Duration {
    let exponential = base_delay_ms.saturating_mul(1u64 << attempt.min(31));
    let capped = exponential.min(max_delay_ms);

    let jitter = 1.0 + (random * 2.0 - 1.0) * jitter_factor.clamp(0.0, 1.0);
    let millis = (capped as f64 * jitter).round().max(0.0);

    Duration::from_millis(millis as u64)
}
