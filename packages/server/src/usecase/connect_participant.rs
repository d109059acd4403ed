//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - ルームの解決（host による未知ルームの作成、participant の拒否）と接続の紐付け
//!
//! ### どのような状況を想定しているか
//! - 正常系：host が未知のルームを作成して接続、既存ルームへの participant 接続
//! - 異常系：participant による未知ルームへの接続、定員超過
//! - エッジケース：既存ルームへの host 主張（視聴者として参加する）

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use serde::Deserialize;

use crate::domain::{
    ConnectOutcome, ConnectRequest, ConnectionId, PusherChannel, Room, RoomError, RoomHandle,
    RoomId, RoomRepository, RoomTitle, UserId, Username,
};

use super::{find_room, session::RoomSpawner};

/// Role claimed by a connecting client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Host,
    Participant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectParams {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub username: Option<Username>,
    pub user_type: UserType,
    /// Capacity for a room created by this connection
    pub max_connections: Option<i64>,
}

/// A connection bound to its room.
#[derive(Debug)]
pub struct Connected {
    pub room: RoomHandle,
    pub connection_id: ConnectionId,
    pub outcome: ConnectOutcome,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    repository: Arc<dyn RoomRepository>,
    spawner: Arc<RoomSpawner>,
    next_connection_id: AtomicU64,
}

impl ConnectParticipantUseCase {
    pub fn new(repository: Arc<dyn RoomRepository>, spawner: Arc<RoomSpawner>) -> Self {
        Self {
            repository,
            spawner,
            next_connection_id: AtomicU64::new(1),
        }
    }

    /// Bind a new signaling connection.
    ///
    /// A `host` connecting to an unknown room creates it; a `participant`
    /// gets `RoomNotFound`. Claiming `host` for an existing room has no
    /// effect on roles.
    pub async fn execute(
        &self,
        params: ConnectParams,
        channel: PusherChannel,
    ) -> Result<Connected, RoomError> {
        let username = match params.username.clone() {
            Some(username) => username,
            None => Username::new(params.user_id.as_str().to_string())?,
        };
        let room = self.resolve_room(&params, &username).await?;

        let connection_id =
            ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed));
        let outcome = room
            .connect(ConnectRequest {
                user_id: params.user_id,
                username,
                connection_id,
                channel,
            })
            .await?;

        Ok(Connected {
            room,
            connection_id,
            outcome,
        })
    }

    async fn resolve_room(
        &self,
        params: &ConnectParams,
        username: &Username,
    ) -> Result<RoomHandle, RoomError> {
        if params.user_type == UserType::Participant {
            return find_room(self.repository.as_ref(), &params.room_id).await;
        }

        // A concurrent host may register the same id first; the second lookup finds it.
        for _ in 0..2 {
            if let Some(room) = self.repository.get(&params.room_id).await {
                return Ok(room);
            }
            let config = self.spawner.config();
            let room = Room::create(
                params.room_id.clone(),
                params.user_id.clone(),
                username.clone(),
                RoomTitle::new(params.room_id.as_str().to_string())?,
                params
                    .max_connections
                    .unwrap_or(config.default_max_participants),
                self.spawner.now(),
                config.room_settings(),
            )?;
            match self.spawner.open(room).await {
                Ok(room) => return Ok(room),
                Err(e) => tracing::debug!("Room creation raced: {}", e),
            }
        }
        find_room(self.repository.as_ref(), &params.room_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{Binding, MessagePusher, Role, TickerFeed},
        infrastructure::{
            message_pusher::WebSocketMessagePusher, repository::inmemory::InMemoryRoomRepository,
            ticker::RandomWalkFeed,
        },
        usecase::session::SessionConfig,
    };
    use butai_shared::time::FixedClock;
    use tokio::sync::mpsc;

    fn create_usecase() -> (ConnectParticipantUseCase, Arc<InMemoryRoomRepository>) {
        let repository = Arc::new(InMemoryRoomRepository::new());
        let spawner = Arc::new(RoomSpawner::new(
            repository.clone(),
            Arc::new(|| Arc::new(WebSocketMessagePusher::new()) as Arc<dyn MessagePusher>),
            Arc::new(|| Box::new(RandomWalkFeed::with_seed(&[], 0)) as Box<dyn TickerFeed>),
            Arc::new(FixedClock::new(1_000)),
            Arc::new(SessionConfig::default()),
        ));
        (
            ConnectParticipantUseCase::new(repository.clone(), spawner),
            repository,
        )
    }

    fn params(user: &str, user_type: UserType, max_connections: Option<i64>) -> ConnectParams {
        ConnectParams {
            room_id: RoomId::new("live-1".to_string()).unwrap(),
            user_id: UserId::new(user.to_string()).unwrap(),
            username: None,
            user_type,
            max_connections,
        }
    }

    #[tokio::test]
    async fn test_host_creates_unknown_room() {
        // テスト項目: host が未知のルームに接続するとルームが作成され、Host として接続される
        // given (前提条件):
        let (usecase, repository) = create_usecase();
        let (tx, mut rx) = mpsc::channel(16);

        // when (操作):
        let connected = usecase
            .execute(params("alice", UserType::Host, Some(3)), tx)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(connected.outcome.participant.role, Role::Host);
        assert_eq!(connected.outcome.binding, Binding::Fresh);
        assert_eq!(repository.count().await, 1);
        let summary = connected.room.summary().await.unwrap();
        assert_eq!(summary.max_participants, 3);
        let first = rx.recv().await.unwrap();
        assert!(first.starts_with(r#"{"type":"room_state""#));
    }

    #[tokio::test]
    async fn test_participant_unknown_room_is_room_not_found() {
        // テスト項目: participant が未知のルームに接続すると RoomNotFound になり、ルームは作られない
        // given (前提条件):
        let (usecase, repository) = create_usecase();
        let (tx, _rx) = mpsc::channel(16);

        // when (操作):
        let result = usecase
            .execute(params("bob", UserType::Participant, None), tx)
            .await;

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            RoomError::RoomNotFound("live-1".to_string())
        );
        assert_eq!(repository.count().await, 0);
    }

    #[tokio::test]
    async fn test_host_claim_for_existing_room_joins_as_viewer() {
        // テスト項目: 既存ルームへの host 主張は無視され、視聴者として接続される
        // given (前提条件):
        let (usecase, _repository) = create_usecase();
        let (tx1, _rx1) = mpsc::channel(16);
        let (tx2, _rx2) = mpsc::channel(16);
        let first = usecase
            .execute(params("alice", UserType::Host, None), tx1)
            .await
            .unwrap();

        // when (操作):
        let second = usecase
            .execute(params("mallory", UserType::Host, None), tx2)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(second.outcome.participant.role, Role::Viewer);
        assert_ne!(first.connection_id, second.connection_id);
        let snapshot = second.room.snapshot().await.unwrap();
        assert_eq!(snapshot.host_id.unwrap().as_str(), "alice");
    }

    #[tokio::test]
    async fn test_connect_to_full_room_is_room_full() {
        // テスト項目: 定員に達したルームへの接続は RoomFull になる
        // given (前提条件):
        let (usecase, _repository) = create_usecase();
        let (tx1, _rx1) = mpsc::channel(16);
        let (tx2, _rx2) = mpsc::channel(16);
        usecase
            .execute(params("alice", UserType::Host, Some(1)), tx1)
            .await
            .unwrap();

        // when (操作):
        let result = usecase
            .execute(params("bob", UserType::Participant, None), tx2)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(RoomError::RoomFull { .. })));
    }
}
