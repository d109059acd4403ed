//! In-memory room registry.
//!
//! Holds one `RoomHandle` per live room. The lock is taken only while a
//! room is registered, looked up or removed; room state itself lives in
//! the session tasks.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{RepositoryError, RoomHandle, RoomId, RoomRepository};

#[derive(Default)]
pub struct InMemoryRoomRepository {
    rooms: Mutex<BTreeMap<RoomId, RoomHandle>>,
}

impl InMemoryRoomRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    async fn insert(&self, handle: RoomHandle) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().await;
        if let Some(existing) = rooms.get(handle.room_id()) {
            if !existing.is_closed() {
                return Err(RepositoryError::RoomAlreadyExists(
                    handle.room_id().as_str().to_string(),
                ));
            }
            tracing::debug!(
                "Replacing closed room '{}' in registry",
                handle.room_id()
            );
        }
        rooms.insert(handle.room_id().clone(), handle);
        Ok(())
    }

    async fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).filter(|h| !h.is_closed()).cloned()
    }

    async fn remove(&self, room_id: &RoomId) -> Option<RoomHandle> {
        let mut rooms = self.rooms.lock().await;
        rooms.remove(room_id)
    }

    async fn list(&self) -> Vec<RoomHandle> {
        let rooms = self.rooms.lock().await;
        rooms.values().filter(|h| !h.is_closed()).cloned().collect()
    }

    async fn count(&self) -> usize {
        let rooms = self.rooms.lock().await;
        rooms.values().filter(|h| !h.is_closed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn handle(id: &str) -> (RoomHandle, mpsc::Receiver<crate::domain::RoomCommand>) {
        let (tx, rx) = mpsc::channel(1);
        (RoomHandle::new(RoomId::new(id.to_string()).unwrap(), tx), rx)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        // テスト項目: 登録したルームを ID で取得できる
        // given (前提条件):
        let repository = InMemoryRoomRepository::new();
        let (room, _rx) = handle("room-1");

        // when (操作):
        repository.insert(room).await.unwrap();
        let found = repository
            .get(&RoomId::new("room-1".to_string()).unwrap())
            .await;

        // then (期待する結果):
        assert_eq!(found.unwrap().room_id().as_str(), "room-1");
        assert_eq!(repository.count().await, 1);
    }

    #[tokio::test]
    async fn test_insert_duplicate_live_room_fails() {
        // テスト項目: 稼働中のルームと同じ ID の登録は RoomAlreadyExists になる
        // given (前提条件):
        let repository = InMemoryRoomRepository::new();
        let (first, _rx1) = handle("room-1");
        let (second, _rx2) = handle("room-1");
        repository.insert(first).await.unwrap();

        // when (操作):
        let result = repository.insert(second).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::RoomAlreadyExists("room-1".to_string()))
        );
    }

    #[tokio::test]
    async fn test_closed_rooms_are_hidden_and_replaceable() {
        // テスト項目: セッションが終了したルームは一覧に現れず、同じ ID で再登録できる
        // given (前提条件):
        let repository = InMemoryRoomRepository::new();
        let (first, rx1) = handle("room-1");
        repository.insert(first).await.unwrap();
        drop(rx1);

        // when (操作):
        let listed = repository.list().await;
        let (second, _rx2) = handle("room-1");
        let result = repository.insert(second).await;

        // then (期待する結果):
        assert!(listed.is_empty());
        assert!(result.is_ok());
        assert_eq!(repository.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_id() {
        // テスト項目: 一覧はルーム ID 順に並ぶ
        // given (前提条件):
        let repository = InMemoryRoomRepository::new();
        let (b, _rx_b) = handle("b-room");
        let (a, _rx_a) = handle("a-room");
        repository.insert(b).await.unwrap();
        repository.insert(a).await.unwrap();

        // when (操作):
        let ids: Vec<String> = repository
            .list()
            .await
            .iter()
            .map(|h| h.room_id().to_string())
            .collect();

        // then (期待する結果):
        assert_eq!(ids, vec!["a-room".to_string(), "b-room".to_string()]);
    }
}
