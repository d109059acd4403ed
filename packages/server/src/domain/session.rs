//! Mailbox protocol of a room session.
//!
//! Each live room is owned by exactly one session task. Everything else
//! talks to it through a [`RoomHandle`], which wraps the bounded command
//! mailbox and turns request/response commands into `async fn`s.

use tokio::sync::{mpsc, oneshot};

use super::{
    action::Action,
    directory::Binding,
    entity::Participant,
    error::RoomError,
    message_pusher::PusherChannel,
    room::RoomSnapshot,
    value_object::{ConnectionId, RoomId, RoomTitle, Timestamp, UserId, Username},
};

/// Lightweight description of a room for listings.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSummary {
    pub id: RoomId,
    pub title: RoomTitle,
    pub host_id: Option<UserId>,
    pub participant_count: usize,
    pub max_participants: u32,
    pub created_at: Timestamp,
    pub is_live: bool,
}

/// A transport connection asking to be bound to a participant.
#[derive(Debug)]
pub struct ConnectRequest {
    pub user_id: UserId,
    pub username: Username,
    pub connection_id: ConnectionId,
    pub channel: PusherChannel,
}

/// Successful connection binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOutcome {
    pub participant: Participant,
    pub binding: Binding,
}

/// Commands accepted by a room session.
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        user_id: UserId,
        username: Username,
        reply: oneshot::Sender<Result<Participant, RoomError>>,
    },
    Leave {
        user_id: UserId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    End {
        user_id: UserId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Connect {
        request: ConnectRequest,
        reply: oneshot::Sender<Result<ConnectOutcome, RoomError>>,
    },
    Disconnect {
        user_id: UserId,
        connection_id: ConnectionId,
    },
    Dispatch {
        user_id: UserId,
        connection_id: ConnectionId,
        action: Action,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Summary {
        reply: oneshot::Sender<RoomSummary>,
    },
}

/// Cloneable address of a room session.
///
/// Once the session has ended every call fails with `RoomNotFound`.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    commands: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn new(room_id: RoomId, commands: mpsc::Sender<RoomCommand>) -> Self {
        Self { room_id, commands }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Whether the session has stopped accepting commands.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn gone(&self) -> RoomError {
        RoomError::RoomNotFound(self.room_id.as_str().to_string())
    }

    async fn send(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.commands.send(command).await.map_err(|_| self.gone())
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply)).await?;
        response.await.map_err(|_| self.gone())
    }

    pub async fn join(&self, user_id: UserId, username: Username) -> Result<Participant, RoomError> {
        self.request(|reply| RoomCommand::Join {
            user_id,
            username,
            reply,
        })
        .await?
    }

    pub async fn leave(&self, user_id: UserId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { user_id, reply })
            .await?
    }

    pub async fn end(&self, user_id: UserId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::End { user_id, reply })
            .await?
    }

    pub async fn connect(&self, request: ConnectRequest) -> Result<ConnectOutcome, RoomError> {
        self.request(|reply| RoomCommand::Connect { request, reply })
            .await?
    }

    /// Report a closed transport. A room that is already gone has nothing to update.
    pub async fn disconnect(&self, user_id: UserId, connection_id: ConnectionId) {
        let command = RoomCommand::Disconnect {
            user_id,
            connection_id,
        };
        if self.send(command).await.is_err() {
            tracing::debug!("Room '{}' already closed; disconnect ignored", self.room_id);
        }
    }

    pub async fn dispatch(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        action: Action,
    ) -> Result<(), RoomError> {
        self.send(RoomCommand::Dispatch {
            user_id,
            connection_id,
            action,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    pub async fn summary(&self) -> Result<RoomSummary, RoomError> {
        self.request(|reply| RoomCommand::Summary { reply }).await
    }
}
