//! UseCase: ルーム参加 / 退出 / 終了 (REST)

use std::sync::Arc;

use crate::domain::{Participant, RoomError, RoomId, RoomRepository, UserId, Username};

use super::find_room;

/// Admit a viewer ahead of its signaling connection.
pub struct JoinRoomUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl JoinRoomUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        username: Username,
    ) -> Result<Participant, RoomError> {
        let room = find_room(self.repository.as_ref(), room_id).await?;
        room.join(user_id, username).await
    }
}

/// Confirmed leave.
pub struct LeaveRoomUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl LeaveRoomUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, room_id: &RoomId, user_id: UserId) -> Result<(), RoomError> {
        let room = find_room(self.repository.as_ref(), room_id).await?;
        room.leave(user_id).await
    }
}

/// End a room on behalf of its host.
pub struct EndRoomUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl EndRoomUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, room_id: &RoomId, acting: UserId) -> Result<(), RoomError> {
        let room = find_room(self.repository.as_ref(), room_id).await?;
        room.end(acting).await
    }
}
