//! UseCase: 受信メッセージの処理
//!
//! 結果は呼び出し元には返らず、ルームの MessagePusher を通じて参加者に届く。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DispatchActionUseCase::execute() メソッド
//! - 検証済みの Action が送信元の接続 ID 付きでルームのメールボックスに届くこと
//!
//! ### どのような状況を想定しているか
//! - 正常系：稼働中のルームへの Action の転送
//! - 異常系：セッションが終了したルームへの転送（RoomNotFound）

use crate::domain::{Action, ConnectionId, RoomError, RoomHandle, UserId};

/// Forward a parsed action to the owning room.
#[derive(Default)]
pub struct DispatchActionUseCase;

impl DispatchActionUseCase {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(
        &self,
        room: &RoomHandle,
        user_id: UserId,
        connection_id: ConnectionId,
        action: Action,
    ) -> Result<(), RoomError> {
        tracing::debug!(
            "'{}' from '{}' to room '{}'",
            action.name(),
            user_id,
            room.room_id()
        );
        room.dispatch(user_id, connection_id, action).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RoomCommand, RoomId};
    use tokio::sync::mpsc;

    fn room() -> (RoomHandle, mpsc::Receiver<RoomCommand>) {
        let (tx, rx) = mpsc::channel(4);
        (
            RoomHandle::new(RoomId::new("room-1".to_string()).unwrap(), tx),
            rx,
        )
    }

    fn alice() -> UserId {
        UserId::new("alice".to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_execute_forwards_action_with_connection_id() {
        // テスト項目: Action が送信元と接続 ID 付きでルームに転送される
        // given (前提条件):
        let usecase = DispatchActionUseCase::new();
        let (handle, mut rx) = room();

        // when (操作):
        let result = usecase
            .execute(&handle, alice(), ConnectionId::new(7), Action::StrokeUndo)
            .await;

        // then (期待する結果):
        assert!(result.is_ok());
        match rx.recv().await {
            Some(RoomCommand::Dispatch {
                user_id,
                connection_id,
                action,
            }) => {
                assert_eq!(user_id, alice());
                assert_eq!(connection_id, ConnectionId::new(7));
                assert_eq!(action, Action::StrokeUndo);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_on_closed_room_is_room_not_found() {
        // テスト項目: セッションが終了したルームへの転送は RoomNotFound になる
        // given (前提条件):
        let usecase = DispatchActionUseCase::new();
        let (handle, rx) = room();
        drop(rx);

        // when (操作):
        let result = usecase
            .execute(&handle, alice(), ConnectionId::new(1), Action::Leave)
            .await;

        // then (期待する結果):
        assert_eq!(result, Err(RoomError::RoomNotFound("room-1".to_string())));
    }
}
