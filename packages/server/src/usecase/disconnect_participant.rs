//! UseCase: 参加者の切断

use crate::domain::{ConnectionId, RoomHandle, UserId};

/// Report that a signaling connection closed.
#[derive(Default)]
pub struct DisconnectParticipantUseCase;

impl DisconnectParticipantUseCase {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self, room: &RoomHandle, user_id: UserId, connection_id: ConnectionId) {
        tracing::info!(
            "Connection {} of '{}' closed (room '{}')",
            connection_id.value(),
            user_id,
            room.room_id()
        );
        room.disconnect(user_id, connection_id).await;
    }
}
