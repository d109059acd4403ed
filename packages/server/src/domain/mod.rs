//! Domain layer: room state, its invariants, and the interfaces the
//! use cases depend on.

pub mod action;
pub mod annotation;
pub mod chat_log;
pub mod control;
pub mod directory;
pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod outbound;
pub mod repository;
pub mod room;
pub mod session;
pub mod ticker;
pub mod value_object;

pub use action::{Action, ActionKind};
pub use annotation::AnnotationStore;
pub use chat_log::{ChatLog, ChatRateLimit};
pub use control::ControlAction;
pub use directory::{Binding, LivenessPolicy, ParticipantDirectory};
pub use entity::{
    ChatMessage, ConnectionState, Participant, Point, Role, Stroke, StrokeDraft, TickerSnapshot,
    Tool,
};
pub use error::{MessagePushError, RepositoryError, RoomError, ValueObjectError};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use outbound::{Ack, OutboundMessage};
pub use repository::RoomRepository;
pub use room::{LeaveReason, Room, RoomEvent, RoomSettings, RoomSnapshot};
pub use session::{ConnectOutcome, ConnectRequest, RoomCommand, RoomHandle, RoomSummary};
pub use ticker::{TickerBoard, TickerFeed};
pub use value_object::{
    Capacity, ChatText, Color, ConnectionId, RoomId, RoomIdFactory, RoomTitle, SequenceNumber,
    StrokeId, Timestamp, UserId, Username,
};

#[cfg(test)]
pub use message_pusher::MockMessagePusher;
#[cfg(test)]
pub use repository::MockRoomRepository;
#[cfg(test)]
pub use ticker::MockTickerFeed;
