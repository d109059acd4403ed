//! WebSocket-backed `MessagePusher`.
//!
//! The UI layer creates a bounded channel per connection and spawns the
//! loop that drains it into the socket. This pusher only holds the sending
//! halves and turns `OutboundMessage`s into JSON text frames. Delivery never waits: when a queue is full the connection is
//! dropped (disconnect-on-overflow) so one stalled participant cannot hold
//! up the room.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::{
    domain::{ConnectionId, MessagePushError, MessagePusher, OutboundMessage, PusherChannel, UserId},
    infrastructure::dto::websocket::ServerMessage,
};

struct ClientSlot {
    connection_id: ConnectionId,
    sender: PusherChannel,
}

/// Outbound queues of one room's connections.
#[derive(Default)]
pub struct WebSocketMessagePusher {
    clients: Mutex<HashMap<UserId, ClientSlot>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered queues.
    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.lock().await.is_empty()
    }

    fn encode(message: &OutboundMessage) -> Result<String, MessagePushError> {
        ServerMessage::from(message)
            .to_json()
            .ok_or(MessagePushError::Encoding(message.name()))
    }

    /// Try to enqueue without waiting. Removes the slot if the queue is
    /// full or already closed.
    fn deliver(
        clients: &mut HashMap<UserId, ClientSlot>,
        user_id: &UserId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let Some(slot) = clients.get(user_id) else {
            return Err(MessagePushError::ClientNotFound(
                user_id.as_str().to_string(),
            ));
        };

        match slot.sender.try_send(content.to_string()) {
            Ok(()) => {
                tracing::debug!("Pushed message to '{}'", user_id);
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                clients.remove(user_id);
                tracing::warn!(
                    "Outbound queue of '{}' overflowed; dropping connection",
                    user_id
                );
                Err(MessagePushError::QueueOverflow(user_id.as_str().to_string()))
            }
            Err(TrySendError::Closed(_)) => {
                clients.remove(user_id);
                Err(MessagePushError::ConnectionClosed(
                    user_id.as_str().to_string(),
                ))
            }
        }
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
    ) {
        let mut clients = self.clients.lock().await;
        let previous = clients.insert(
            user_id.clone(),
            ClientSlot {
                connection_id,
                sender,
            },
        );
        match previous {
            Some(slot) => tracing::info!(
                "Connection {} of '{}' superseded by connection {}",
                slot.connection_id.value(),
                user_id,
                connection_id.value()
            ),
            None => tracing::debug!("Client '{}' registered to MessagePusher", user_id),
        }
    }

    async fn unregister_client(&self, user_id: &UserId, connection_id: Option<ConnectionId>) {
        let mut clients = self.clients.lock().await;
        let matches = clients
            .get(user_id)
            .is_some_and(|slot| connection_id.is_none_or(|id| slot.connection_id == id));
        if matches {
            clients.remove(user_id);
            tracing::debug!("Client '{}' unregistered from MessagePusher", user_id);
        }
    }

    async fn push_to(
        &self,
        user_id: &UserId,
        message: &OutboundMessage,
    ) -> Result<(), MessagePushError> {
        let content = Self::encode(message)?;
        let mut clients = self.clients.lock().await;
        Self::deliver(&mut clients, user_id, &content)
    }

    async fn broadcast(&self, targets: Vec<UserId>, message: &OutboundMessage) {
        let content = match Self::encode(message) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!("Broadcast skipped: {}", e);
                return;
            }
        };
        let mut clients = self.clients.lock().await;
        for target in targets {
            if let Err(e) = Self::deliver(&mut clients, &target, &content) {
                tracing::warn!("Broadcast to '{}' failed: {}", target, e);
            }
        }
    }

    async fn close_all(&self) {
        let mut clients = self.clients.lock().await;
        let count = clients.len();
        clients.clear();
        tracing::debug!("Closed {} outbound queues", count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timestamp;
    use serde_json::Value;
    use tokio::sync::mpsc;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn beat(server_time: i64) -> OutboundMessage {
        OutboundMessage::Heartbeat {
            server_time: Timestamp::new(server_time),
            client_time: None,
        }
    }

    fn server_time(frame: Option<String>) -> i64 {
        let value: Value = serde_json::from_str(&frame.unwrap()).unwrap();
        value["payload"]["serverTime"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 登録済みのクライアントに JSON エンコードされたメッセージが届く
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::channel(4);
        pusher
            .register_client(user("alice"), ConnectionId::new(1), tx)
            .await;
        let message = OutboundMessage::Kicked {
            user_id: user("bob"),
            by: user("alice"),
        };

        // when (操作):
        let result = pusher.push_to(&user("alice"), &message).await;

        // then (期待する結果):
        assert!(result.is_ok());
        let frame: Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "kick");
        assert_eq!(frame["payload"]["userId"], "bob");
        assert_eq!(frame["payload"]["by"], "alice");
    }

    #[tokio::test]
    async fn test_push_to_client_not_found() {
        // テスト項目: 存在しないクライアントへの送信は ClientNotFound を返す
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();

        // when (操作):
        let result = pusher.push_to(&user("nobody"), &beat(1)).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(MessagePushError::ClientNotFound("nobody".to_string()))
        );
    }

    #[tokio::test]
    async fn test_overflow_drops_connection() {
        // テスト項目: キューが溢れたクライアントは切断され、送信側チャンネルが閉じる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (tx, mut rx) = mpsc::channel(1);
        pusher
            .register_client(user("slow"), ConnectionId::new(1), tx)
            .await;
        pusher.push_to(&user("slow"), &beat(1)).await.unwrap();

        // when (操作):
        let result = pusher.push_to(&user("slow"), &beat(2)).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(MessagePushError::QueueOverflow("slow".to_string()))
        );
        assert!(pusher.is_empty().await);
        assert_eq!(server_time(rx.recv().await), 1);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_slow_client_does_not_block_broadcast() {
        // テスト項目: 詰まったクライアントがいても他のクライアントへのブロードキャストは届く
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        pusher
            .register_client(user("slow"), ConnectionId::new(1), slow_tx)
            .await;
        pusher
            .register_client(user("fast"), ConnectionId::new(2), fast_tx)
            .await;

        // when (操作):
        for i in 0..3 {
            pusher
                .broadcast(vec![user("slow"), user("fast")], &beat(i))
                .await;
        }

        // then (期待する結果):
        assert_eq!(pusher.len().await, 1);
        for i in 0..3 {
            assert_eq!(server_time(fast_rx.recv().await), i);
        }
    }

    #[tokio::test]
    async fn test_stale_unregister_keeps_new_connection() {
        // テスト項目: 古い接続の登録解除は、新しい接続の送信キューを消さない
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (old_tx, mut old_rx) = mpsc::channel(4);
        let (new_tx, mut new_rx) = mpsc::channel(4);
        pusher
            .register_client(user("alice"), ConnectionId::new(1), old_tx)
            .await;
        pusher
            .register_client(user("alice"), ConnectionId::new(2), new_tx)
            .await;

        // when (操作):
        pusher
            .unregister_client(&user("alice"), Some(ConnectionId::new(1)))
            .await;
        pusher.push_to(&user("alice"), &beat(7)).await.unwrap();

        // then (期待する結果):
        assert_eq!(old_rx.recv().await, None);
        assert_eq!(server_time(new_rx.recv().await), 7);
    }
}
