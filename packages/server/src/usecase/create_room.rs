//! UseCase: ルーム作成

use std::sync::Arc;

use crate::domain::{Room, RoomError, RoomIdFactory, RoomSnapshot, RoomTitle, UserId, Username};

use super::session::RoomSpawner;

/// Create a room with the requesting user as its host.
pub struct CreateRoomUseCase {
    spawner: Arc<RoomSpawner>,
}

impl CreateRoomUseCase {
    pub fn new(spawner: Arc<RoomSpawner>) -> Self {
        Self { spawner }
    }

    /// Create and start a room under a freshly generated id.
    ///
    /// `max_participants` falls back to the configured default.
    pub async fn execute(
        &self,
        host_id: UserId,
        host_name: Username,
        title: RoomTitle,
        max_participants: Option<i64>,
    ) -> Result<RoomSnapshot, RoomError> {
        let capacity = max_participants.unwrap_or(self.spawner.config().default_max_participants);
        let room = Room::create(
            RoomIdFactory::generate()?,
            host_id,
            host_name,
            title,
            capacity,
            self.spawner.now(),
            self.spawner.config().room_settings(),
        )?;
        let snapshot = room.snapshot();

        self.spawner.open(room).await?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{MessagePusher, RoomRepository, TickerFeed},
        infrastructure::{
            message_pusher::WebSocketMessagePusher, repository::inmemory::InMemoryRoomRepository,
            ticker::RandomWalkFeed,
        },
        usecase::session::SessionConfig,
    };
    use butai_shared::time::FixedClock;

    fn create_usecase() -> (CreateRoomUseCase, Arc<InMemoryRoomRepository>) {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let spawner = Arc::new(RoomSpawner::new(
            repository.clone(),
            Arc::new(|| Arc::new(WebSocketMessagePusher::new()) as Arc<dyn MessagePusher>),
            Arc::new(|| Box::new(RandomWalkFeed::with_seed(&[], 0)) as Box<dyn TickerFeed>),
            Arc::new(FixedClock::new(5_000)),
            Arc::new(SessionConfig {
                default_max_participants: 8,
                ..SessionConfig::default()
            }),
        ));
        (CreateRoomUseCase::new(spawner), repository)
    }

    fn host() -> (UserId, Username, RoomTitle) {
        (
            UserId::new("host".to_string()).unwrap(),
            Username::new("Host".to_string()).unwrap(),
            RoomTitle::new("Evening session".to_string()).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_create_room_registers_live_room() {
        // テスト項目: 作成したルームはレジストリに登録され、ホストが唯一の参加者になる
        // given (前提条件):
        let (usecase, repository) = create_usecase();
        let (host_id, host_name, title) = host();

        // when (操作):
        let snapshot = usecase
            .execute(host_id.clone(), host_name, title, None)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(snapshot.is_live);
        assert_eq!(snapshot.max_participants, 8);
        assert_eq!(snapshot.host_id, Some(host_id));
        assert_eq!(snapshot.created_at.value(), 5_000);
        assert!(repository.get(&snapshot.id).await.is_some());
    }

    #[tokio::test]
    async fn test_create_room_rejects_invalid_capacity() {
        // テスト項目: 定員 0 以下ではルームを作成できず、レジストリも変わらない
        // given (前提条件):
        let (usecase, repository) = create_usecase();
        let (host_id, host_name, title) = host();

        // when (操作):
        let result = usecase.execute(host_id, host_name, title, Some(0)).await;

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), RoomError::InvalidCapacity(0));
        assert_eq!(repository.count().await, 0);
    }
}
