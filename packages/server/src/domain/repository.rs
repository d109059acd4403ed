//! Room registry storage.

use async_trait::async_trait;

use super::{error::RepositoryError, session::RoomHandle, value_object::RoomId};

/// Registry of live rooms.
///
/// Only handles are stored; each room's state is owned by its session task.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomRepository: Send + Sync {
    /// Register a room. Fails if a room with the same id is already registered.
    async fn insert(&self, handle: RoomHandle) -> Result<(), RepositoryError>;

    async fn get(&self, room_id: &RoomId) -> Option<RoomHandle>;

    async fn remove(&self, room_id: &RoomId) -> Option<RoomHandle>;

    /// Every registered room, ordered by id.
    async fn list(&self) -> Vec<RoomHandle>;

    async fn count(&self) -> usize;
}
