//! Conversion logic between DTOs and domain types.

use butai_shared::time::timestamp_to_jst_rfc3339;

use crate::domain::{
    Ack, Action, ActionKind, ChatMessage, ChatText, Color, LeaveReason, OutboundMessage,
    Participant, RoomError, RoomEvent, RoomId, RoomSnapshot, RoomSummary, Stroke, StrokeDraft,
    StrokeId, TickerSnapshot, UserId, Username,
};
use crate::infrastructure::dto::{http, websocket as dto};

// ========================================
// DTO → Domain
// ========================================

fn user_id(value: String) -> Result<UserId, dto::ProtocolError> {
    Ok(UserId::new(value)?)
}

impl TryFrom<dto::ClientMessage> for Action {
    type Error = dto::ProtocolError;

    fn try_from(message: dto::ClientMessage) -> Result<Self, Self::Error> {
        let action = match message {
            dto::ClientMessage::Join(payload) => Action::Join {
                username: payload.username.map(Username::new).transpose()?,
            },
            dto::ClientMessage::Leave => Action::Leave,
            dto::ClientMessage::Chat(payload) => Action::Chat(ChatText::new(payload.text)?),
            dto::ClientMessage::StrokeAdd(payload) => Action::StrokeAdd(StrokeDraft::new(
                StrokeId::new(payload.id)?,
                payload.points,
                Color::new(payload.color)?,
                payload.width,
                payload.tool,
            )?),
            dto::ClientMessage::StrokeUndo => Action::StrokeUndo,
            dto::ClientMessage::CanvasClear => Action::CanvasClear,
            dto::ClientMessage::MuteToggle(payload) => Action::MuteToggle {
                target: user_id(payload.target_id)?,
            },
            dto::ClientMessage::Promote(payload) => Action::Promote {
                target: user_id(payload.target_id)?,
            },
            dto::ClientMessage::Kick(payload) => Action::Kick {
                target: user_id(payload.target_id)?,
            },
            dto::ClientMessage::Heartbeat(payload) => Action::Heartbeat {
                client_time: payload.client_time,
            },
            dto::ClientMessage::Speaking(payload) => Action::Speaking {
                is_speaking: payload.is_speaking,
            },
            dto::ClientMessage::Signal(payload) => Action::Signal {
                to: user_id(payload.to)?,
                data: payload.data,
            },
        };
        Ok(action)
    }
}

// ========================================
// Domain → WebSocket DTO
// ========================================

impl From<&Participant> for dto::ParticipantInfo {
    fn from(model: &Participant) -> Self {
        Self {
            user_id: model.id.as_str().to_string(),
            username: model.username.as_str().to_string(),
            role: model.role,
            joined_at: model.joined_at.value(),
            connection_state: model.connection_state,
            is_speaking: model.is_speaking,
            is_muted: model.is_muted,
        }
    }
}

impl From<&Stroke> for dto::StrokeInfo {
    fn from(model: &Stroke) -> Self {
        Self {
            id: model.id.as_str().to_string(),
            sequence_number: model.sequence_number.value(),
            author_id: model.author.as_str().to_string(),
            points: model.points.clone(),
            color: model.color.as_str().to_string(),
            width: model.width,
            tool: model.tool,
        }
    }
}

impl From<&ChatMessage> for dto::ChatInfo {
    fn from(model: &ChatMessage) -> Self {
        Self {
            id: model.id.clone(),
            sender_id: model.sender_id.as_str().to_string(),
            text: model.text.clone(),
            timestamp: model.timestamp.value(),
            is_system: model.is_system,
        }
    }
}

impl From<&TickerSnapshot> for dto::TickerInfo {
    fn from(model: &TickerSnapshot) -> Self {
        Self {
            symbol: model.symbol.clone(),
            price: model.price,
            change: model.change,
            change_percent: model.change_percent,
            volume: model.volume,
            as_of: model.as_of.value(),
        }
    }
}

impl From<LeaveReason> for dto::LeaveReasonInfo {
    fn from(reason: LeaveReason) -> Self {
        match reason {
            LeaveReason::Left => Self::Left,
            LeaveReason::TimedOut => Self::TimedOut,
            LeaveReason::Kicked => Self::Kicked,
        }
    }
}

impl From<&RoomError> for dto::ErrorCode {
    fn from(error: &RoomError) -> Self {
        match error {
            RoomError::RoomNotFound(_) => Self::RoomNotFound,
            RoomError::RoomFull { .. } => Self::RoomFull,
            RoomError::AlreadyJoined(_) => Self::AlreadyJoined,
            RoomError::InvalidCapacity(_) => Self::InvalidCapacity,
            RoomError::Unauthorized(_) => Self::Unauthorized,
            RoomError::ParticipantNotFound(_) => Self::ParticipantNotFound,
            RoomError::RateLimited(_) => Self::RateLimited,
            RoomError::RoomClosed(_) => Self::RoomClosed,
            RoomError::RoomAlreadyExists(_) => Self::RoomAlreadyExists,
            RoomError::InvalidValue(_) => Self::InvalidValue,
        }
    }
}

impl From<&RoomError> for dto::ErrorPayload {
    fn from(error: &RoomError) -> Self {
        Self {
            code: error.into(),
            message: error.to_string(),
        }
    }
}

impl From<&dto::ProtocolError> for dto::ErrorPayload {
    fn from(error: &dto::ProtocolError) -> Self {
        Self {
            code: dto::ErrorCode::MalformedMessage,
            message: error.to_string(),
        }
    }
}

/// Snapshot addressed to `you`.
fn room_state(
    snapshot: &RoomSnapshot,
    you: &UserId,
    heartbeat_interval_ms: u64,
) -> dto::RoomStatePayload {
    dto::RoomStatePayload {
        room: dto::RoomInfo {
            id: snapshot.id.as_str().to_string(),
            title: snapshot.title.as_str().to_string(),
            host_id: snapshot.host_id.as_ref().map(|id| id.as_str().to_string()),
            max_participants: snapshot.max_participants,
            created_at: snapshot.created_at.value(),
            is_live: snapshot.is_live,
            sequence_counter: snapshot.sequence_counter,
        },
        you: you.as_str().to_string(),
        participants: snapshot.participants.iter().map(Into::into).collect(),
        strokes: snapshot.strokes.iter().map(Into::into).collect(),
        chat: snapshot.chat.iter().map(Into::into).collect(),
        tickers: snapshot.tickers.iter().map(Into::into).collect(),
        heartbeat_interval_ms,
    }
}

/// Wire message announcing a room event.
fn event_message(room_id: &RoomId, event: &RoomEvent) -> dto::ServerMessage {
    match event {
        RoomEvent::ParticipantJoined(participant) => dto::ServerMessage::Join(participant.into()),
        RoomEvent::PresenceChanged { user_id, state } => {
            dto::ServerMessage::Presence(dto::PresenceInfo {
                user_id: user_id.as_str().to_string(),
                connection_state: *state,
            })
        }
        RoomEvent::ParticipantLeft { user_id, reason } => {
            dto::ServerMessage::Leave(dto::LeaveInfo {
                user_id: user_id.as_str().to_string(),
                reason: (*reason).into(),
            })
        }
        RoomEvent::HostChanged {
            host_id,
            previous_host,
        } => dto::ServerMessage::Promote(dto::PromoteInfo {
            host_id: host_id.as_str().to_string(),
            previous_host_id: previous_host.as_ref().map(|id| id.as_str().to_string()),
        }),
        RoomEvent::SystemMessage(message) => dto::ServerMessage::Chat(message.into()),
        RoomEvent::RoomEnded { by } => dto::ServerMessage::RoomEnded(dto::RoomEndedInfo {
            room_id: room_id.as_str().to_string(),
            by: by.as_ref().map(|id| id.as_str().to_string()),
        }),
    }
}

impl From<ActionKind> for dto::MessageType {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Join => Self::Join,
            ActionKind::Leave => Self::Leave,
            ActionKind::Chat => Self::Chat,
            ActionKind::StrokeAdd => Self::StrokeAdd,
            ActionKind::StrokeUndo => Self::StrokeUndo,
            ActionKind::CanvasClear => Self::CanvasClear,
            ActionKind::MuteToggle => Self::MuteToggle,
            ActionKind::Promote => Self::Promote,
            ActionKind::Kick => Self::Kick,
            ActionKind::Speaking => Self::Speaking,
            ActionKind::Signal => Self::Signal,
            ActionKind::Heartbeat => Self::Heartbeat,
        }
    }
}

impl From<&Ack> for dto::AckPayload {
    fn from(ack: &Ack) -> Self {
        Self {
            action: ack.action.into(),
            sequence_number: ack.stroke.as_ref().map(|(_, seq)| seq.value()),
            stroke_id: ack.stroke.as_ref().map(|(id, _)| id.as_str().to_string()),
            message_id: ack.message_id.clone(),
            timestamp: ack.timestamp.map(|t| t.value()),
        }
    }
}

impl From<&OutboundMessage> for dto::ServerMessage {
    fn from(message: &OutboundMessage) -> Self {
        match message {
            OutboundMessage::RoomState {
                snapshot,
                you,
                heartbeat_interval_ms,
            } => Self::RoomState(room_state(snapshot, you, *heartbeat_interval_ms)),
            OutboundMessage::Ack(ack) => Self::Ack(ack.into()),
            OutboundMessage::Error(error) => Self::Error(error.into()),
            OutboundMessage::Event { room_id, event } => event_message(room_id, event),
            OutboundMessage::Chat(chat) => Self::Chat(chat.into()),
            OutboundMessage::StrokeAdded(stroke) => Self::StrokeAdd(stroke.into()),
            OutboundMessage::StrokeUndone {
                stroke_id,
                sequence_number,
                by,
            } => Self::StrokeUndo(dto::StrokeUndoInfo {
                stroke_id: stroke_id.as_str().to_string(),
                sequence_number: sequence_number.value(),
                by: by.as_str().to_string(),
            }),
            OutboundMessage::CanvasCleared { by, removed } => {
                Self::CanvasClear(dto::CanvasClearInfo {
                    by: by.as_str().to_string(),
                    removed: *removed,
                })
            }
            OutboundMessage::MuteChanged {
                user_id,
                is_muted,
                by,
            } => Self::MuteToggle(dto::MuteInfo {
                user_id: user_id.as_str().to_string(),
                is_muted: *is_muted,
                by: by.as_str().to_string(),
            }),
            OutboundMessage::SpeakingChanged {
                user_id,
                is_speaking,
            } => Self::Speaking(dto::SpeakingInfo {
                user_id: user_id.as_str().to_string(),
                is_speaking: *is_speaking,
            }),
            OutboundMessage::Kicked { user_id, by } => Self::Kick(dto::KickInfo {
                user_id: user_id.as_str().to_string(),
                by: by.as_str().to_string(),
            }),
            OutboundMessage::Tickers(snapshots) => Self::TickerUpdate(dto::TickerUpdateInfo {
                snapshots: snapshots.iter().map(Into::into).collect(),
            }),
            OutboundMessage::Signal { from, data } => Self::Signal(dto::SignalRelayInfo {
                from: from.as_str().to_string(),
                data: data.clone(),
            }),
            OutboundMessage::Heartbeat {
                server_time,
                client_time,
            } => Self::Heartbeat(dto::HeartbeatAckInfo {
                server_time: server_time.value(),
                client_time: *client_time,
            }),
        }
    }
}

// ========================================
// Domain → HTTP DTO
// ========================================

impl From<&RoomSummary> for http::RoomSummaryResponse {
    fn from(summary: &RoomSummary) -> Self {
        Self {
            id: summary.id.as_str().to_string(),
            title: summary.title.as_str().to_string(),
            host_id: summary.host_id.as_ref().map(|id| id.as_str().to_string()),
            participant_count: summary.participant_count,
            max_participants: summary.max_participants,
            is_live: summary.is_live,
            created_at: timestamp_to_jst_rfc3339(summary.created_at.value()),
        }
    }
}

impl From<&Participant> for http::ParticipantResponse {
    fn from(model: &Participant) -> Self {
        Self {
            user_id: model.id.as_str().to_string(),
            username: model.username.as_str().to_string(),
            role: model.role,
            connection_state: model.connection_state,
            is_muted: model.is_muted,
            joined_at: timestamp_to_jst_rfc3339(model.joined_at.value()),
        }
    }
}

impl From<&RoomSnapshot> for http::RoomDetailResponse {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            id: snapshot.id.as_str().to_string(),
            title: snapshot.title.as_str().to_string(),
            host_id: snapshot.host_id.as_ref().map(|id| id.as_str().to_string()),
            max_participants: snapshot.max_participants,
            is_live: snapshot.is_live,
            created_at: timestamp_to_jst_rfc3339(snapshot.created_at.value()),
            sequence_counter: snapshot.sequence_counter,
            stroke_count: snapshot.strokes.len(),
            chat_count: snapshot.chat.len(),
            participants: snapshot.participants.iter().map(Into::into).collect(),
        }
    }
}

impl From<&RoomError> for http::ErrorResponse {
    fn from(error: &RoomError) -> Self {
        Self {
            code: error.into(),
            message: error.to_string(),
        }
    }
}
