//! UseCase: ルーム一覧 / 詳細の取得

use std::sync::Arc;

use crate::domain::{RoomError, RoomId, RoomRepository, RoomSnapshot, RoomSummary};

use super::find_room;

pub struct GetRoomsUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomsUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    /// Summaries of every live room. Rooms that close while being listed
    /// are skipped.
    pub async fn execute(&self) -> Vec<RoomSummary> {
        let mut summaries = Vec::new();
        for room in self.repository.list().await {
            match room.summary().await {
                Ok(summary) if summary.is_live => summaries.push(summary),
                Ok(_) => {}
                Err(e) => tracing::debug!("Skipping room '{}': {}", room.room_id(), e),
            }
        }
        summaries
    }

    pub async fn count(&self) -> usize {
        self.repository.count().await
    }
}

pub struct GetRoomDetailUseCase {
    repository: Arc<dyn RoomRepository>,
}

impl GetRoomDetailUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, room_id: &RoomId) -> Result<RoomSnapshot, RoomError> {
        let room = find_room(self.repository.as_ref(), room_id).await?;
        room.snapshot().await
    }
}
