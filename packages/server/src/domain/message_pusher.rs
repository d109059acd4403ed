//! Outbound delivery to connected participants.
//!
//! The room session decides *who* receives a message; a `MessagePusher`
//! owns the per-connection outbound queues, encodes each message for the
//! transport and does the delivery.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{
    error::MessagePushError,
    outbound::OutboundMessage,
    value_object::{ConnectionId, UserId},
};

/// Bounded outbound queue of one connection, carrying encoded frames. The
/// receiving half is drained by the connection's push loop.
pub type PusherChannel = mpsc::Sender<String>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// Register (or replace) the outbound queue of a participant.
    ///
    /// Replacing drops the previous queue, which closes that connection.
    async fn register_client(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        sender: PusherChannel,
    );

    /// Drop a participant's queue. With `Some(connection_id)` the queue is
    /// only dropped if it still belongs to that connection.
    async fn unregister_client(&self, user_id: &UserId, connection_id: Option<ConnectionId>);

    /// Push to a single participant.
    async fn push_to(
        &self,
        user_id: &UserId,
        message: &OutboundMessage,
    ) -> Result<(), MessagePushError>;

    /// Push to every target, encoding the message once. Delivery failures
    /// are logged and skipped.
    async fn broadcast(&self, targets: Vec<UserId>, message: &OutboundMessage);

    /// Drop every queue.
    async fn close_all(&self);
}
