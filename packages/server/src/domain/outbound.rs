//! Messages a room sends to its participants, in domain terms.
//!
//! The room session decides what to say and to whom; the `MessagePusher`
//! implementation owns the wire encoding.

use serde_json::Value;

use super::{
    action::ActionKind,
    entity::{ChatMessage, Stroke, TickerSnapshot},
    error::RoomError,
    room::{RoomEvent, RoomSnapshot},
    value_object::{RoomId, SequenceNumber, StrokeId, Timestamp, UserId},
};

/// Confirmation of the sender's own action.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    pub action: ActionKind,
    pub stroke: Option<(StrokeId, SequenceNumber)>,
    pub message_id: Option<String>,
    pub timestamp: Option<Timestamp>,
}

impl Ack {
    pub fn of(action: ActionKind) -> Self {
        Self {
            action,
            stroke: None,
            message_id: None,
            timestamp: None,
        }
    }

    /// Ack carrying the id and server time of a stored chat message.
    pub fn chat(message: &ChatMessage) -> Self {
        Self {
            message_id: Some(message.id.clone()),
            timestamp: Some(message.timestamp),
            ..Self::of(ActionKind::Chat)
        }
    }

    /// Ack carrying the stroke an add or undo applied to.
    pub fn stroke(action: ActionKind, stroke: &Stroke) -> Self {
        Self {
            stroke: Some((stroke.id.clone(), stroke.sequence_number)),
            ..Self::of(action)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// Full snapshot addressed to `you`
    RoomState {
        snapshot: Box<RoomSnapshot>,
        you: UserId,
        heartbeat_interval_ms: u64,
    },
    Ack(Ack),
    Error(RoomError),
    Event {
        room_id: RoomId,
        event: RoomEvent,
    },
    Chat(ChatMessage),
    StrokeAdded(Stroke),
    StrokeUndone {
        stroke_id: StrokeId,
        sequence_number: SequenceNumber,
        by: UserId,
    },
    CanvasCleared {
        by: UserId,
        removed: usize,
    },
    MuteChanged {
        user_id: UserId,
        is_muted: bool,
        by: UserId,
    },
    SpeakingChanged {
        user_id: UserId,
        is_speaking: bool,
    },
    Kicked {
        user_id: UserId,
        by: UserId,
    },
    Tickers(Vec<TickerSnapshot>),
    Signal {
        from: UserId,
        data: Value,
    },
    Heartbeat {
        server_time: Timestamp,
        client_time: Option<i64>,
    },
}

impl OutboundMessage {
    pub fn room_state(snapshot: RoomSnapshot, you: UserId, heartbeat_interval_ms: u64) -> Self {
        Self::RoomState {
            snapshot: Box::new(snapshot),
            you,
            heartbeat_interval_ms,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomState { .. } => "room_state",
            Self::Ack(_) => "ack",
            Self::Error(_) => "error",
            Self::Event { .. } => "event",
            Self::Chat(_) => "chat",
            Self::StrokeAdded(_) => "stroke_add",
            Self::StrokeUndone { .. } => "stroke_undo",
            Self::CanvasCleared { .. } => "canvas_clear",
            Self::MuteChanged { .. } => "mute_toggle",
            Self::SpeakingChanged { .. } => "speaking",
            Self::Kicked { .. } => "kick",
            Self::Tickers(_) => "ticker_update",
            Self::Signal { .. } => "signal",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entity::{Point, Tool},
        value_object::{ChatText, Color},
    };

    #[test]
    fn test_chat_ack_carries_message_id_and_time() {
        // テスト項目: チャットの ack にはメッセージ ID とサーバー受信時刻が入る
        // given (前提条件):
        let message = ChatMessage::new(
            UserId::new("alice".to_string()).unwrap(),
            ChatText::new("hello".to_string()).unwrap(),
            Timestamp::new(1_234),
        );

        // when (操作):
        let ack = Ack::chat(&message);

        // then (期待する結果):
        assert_eq!(ack.action, ActionKind::Chat);
        assert_eq!(ack.message_id.as_deref(), Some(message.id.as_str()));
        assert_eq!(ack.timestamp, Some(Timestamp::new(1_234)));
        assert_eq!(ack.stroke, None);
    }

    #[test]
    fn test_stroke_ack_carries_sequence_number() {
        // テスト項目: ストロークの ack には対象のストローク ID とシーケンス番号が入る
        // given (前提条件):
        let stroke = Stroke {
            id: StrokeId::new("s-9".to_string()).unwrap(),
            sequence_number: SequenceNumber::new(9),
            author: UserId::new("host".to_string()).unwrap(),
            points: vec![Point {
                x: 1.0,
                y: 2.0,
                pressure: None,
            }],
            color: Color::new("red".to_string()).unwrap(),
            width: 1.0,
            tool: Tool::Pen,
        };

        // when (操作):
        let ack = Ack::stroke(ActionKind::StrokeUndo, &stroke);

        // then (期待する結果):
        assert_eq!(ack.action, ActionKind::StrokeUndo);
        assert_eq!(
            ack.stroke,
            Some((stroke.id.clone(), SequenceNumber::new(9)))
        );
    }
}
