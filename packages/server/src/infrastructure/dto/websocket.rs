//! Signaling channel wire format.
//!
//! Every frame is a JSON envelope `{"type": <message type>, "payload": {...}}`.
//! Client frames are parsed in two steps: the envelope first, then the
//! payload for its type, so an unknown or server-only type is rejected
//! before its payload is looked at.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{ConnectionState, Point, Role, Tool, ValueObjectError};

/// Every message type that may appear on the channel, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Join,
    Leave,
    Chat,
    StrokeAdd,
    StrokeUndo,
    CanvasClear,
    MuteToggle,
    Promote,
    Kick,
    Heartbeat,
    Speaking,
    Signal,
    TickerUpdate,
    RoomState,
    Ack,
    Error,
    Presence,
    RoomEnded,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Chat => "chat",
            Self::StrokeAdd => "stroke_add",
            Self::StrokeUndo => "stroke_undo",
            Self::CanvasClear => "canvas_clear",
            Self::MuteToggle => "mute_toggle",
            Self::Promote => "promote",
            Self::Kick => "kick",
            Self::Heartbeat => "heartbeat",
            Self::Speaking => "speaking",
            Self::Signal => "signal",
            Self::TickerUpdate => "ticker_update",
            Self::RoomState => "room_state",
            Self::Ack => "ack",
            Self::Error => "error",
            Self::Presence => "presence",
            Self::RoomEnded => "room_ended",
        }
    }
}

/// Raw envelope as received from a client.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub r#type: MessageType,
    #[serde(default)]
    pub payload: Value,
}

/// Reasons a client frame is rejected as malformed.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("message type '{}' cannot be sent by clients", .0.as_str())]
    UnsupportedType(MessageType),

    #[error("invalid payload for '{}': {reason}", .message_type.as_str())]
    InvalidPayload {
        message_type: MessageType,
        reason: String,
    },

    #[error("non-text frame")]
    NonTextFrame,

    #[error(transparent)]
    InvalidValue(#[from] ValueObjectError),
}

// ========================================
// Client → Server
// ========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub text: String,
}

/// Stroke as submitted; any sequence number sent by the client is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeAddPayload {
    pub id: String,
    pub points: Vec<Point>,
    pub color: String,
    pub width: f64,
    pub tool: Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPayload {
    pub target_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakingPayload {
    pub is_speaking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPayload {
    pub to: String,
    pub data: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_time: Option<i64>,
}

/// Messages a client may send.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    Join(JoinPayload),
    Leave,
    Chat(ChatPayload),
    StrokeAdd(StrokeAddPayload),
    StrokeUndo,
    CanvasClear,
    MuteToggle(TargetPayload),
    Promote(TargetPayload),
    Kick(TargetPayload),
    Heartbeat(HeartbeatPayload),
    Speaking(SpeakingPayload),
    Signal(SignalPayload),
}

impl ClientMessage {
    /// Parse a text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| ProtocolError::InvalidEnvelope(e.to_string()))?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Self, ProtocolError> {
        let Envelope { r#type, payload } = envelope;
        let message = match r#type {
            MessageType::Join => Self::Join(payload_or_default(r#type, payload)?),
            MessageType::Leave => Self::Leave,
            MessageType::Chat => Self::Chat(payload_of(r#type, payload)?),
            MessageType::StrokeAdd => Self::StrokeAdd(payload_of(r#type, payload)?),
            MessageType::StrokeUndo => Self::StrokeUndo,
            MessageType::CanvasClear => Self::CanvasClear,
            MessageType::MuteToggle => Self::MuteToggle(payload_of(r#type, payload)?),
            MessageType::Promote => Self::Promote(payload_of(r#type, payload)?),
            MessageType::Kick => Self::Kick(payload_of(r#type, payload)?),
            MessageType::Heartbeat => Self::Heartbeat(payload_or_default(r#type, payload)?),
            MessageType::Speaking => Self::Speaking(payload_of(r#type, payload)?),
            MessageType::Signal => Self::Signal(payload_of(r#type, payload)?),
            other => return Err(ProtocolError::UnsupportedType(other)),
        };
        Ok(message)
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Join(_) => MessageType::Join,
            Self::Leave => MessageType::Leave,
            Self::Chat(_) => MessageType::Chat,
            Self::StrokeAdd(_) => MessageType::StrokeAdd,
            Self::StrokeUndo => MessageType::StrokeUndo,
            Self::CanvasClear => MessageType::CanvasClear,
            Self::MuteToggle(_) => MessageType::MuteToggle,
            Self::Promote(_) => MessageType::Promote,
            Self::Kick(_) => MessageType::Kick,
            Self::Heartbeat(_) => MessageType::Heartbeat,
            Self::Speaking(_) => MessageType::Speaking,
            Self::Signal(_) => MessageType::Signal,
        }
    }
}

fn payload_of<T: serde::de::DeserializeOwned>(
    message_type: MessageType,
    payload: Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(payload).map_err(|e| ProtocolError::InvalidPayload {
        message_type,
        reason: e.to_string(),
    })
}

fn payload_or_default<T: serde::de::DeserializeOwned + Default>(
    message_type: MessageType,
    payload: Value,
) -> Result<T, ProtocolError> {
    if payload.is_null() {
        return Ok(T::default());
    }
    payload_of(message_type, payload)
}

// ========================================
// Server → Client
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub id: String,
    pub title: String,
    pub host_id: Option<String>,
    pub max_participants: u32,
    pub created_at: i64,
    pub is_live: bool,
    pub sequence_counter: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub user_id: String,
    pub username: String,
    pub role: Role,
    pub joined_at: i64,
    pub connection_state: ConnectionState,
    pub is_speaking: bool,
    pub is_muted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeInfo {
    pub id: String,
    pub sequence_number: u64,
    pub author_id: String,
    pub points: Vec<Point>,
    pub color: String,
    pub width: f64,
    pub tool: Tool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatInfo {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: i64,
    pub is_system: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerInfo {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub as_of: i64,
}

/// Full snapshot sent to a participant when it joins or reconnects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatePayload {
    pub room: RoomInfo,
    /// The receiving participant's own id
    pub you: String,
    pub participants: Vec<ParticipantInfo>,
    pub strokes: Vec<StrokeInfo>,
    pub chat: Vec<ChatInfo>,
    pub tickers: Vec<TickerInfo>,
    pub heartbeat_interval_ms: u64,
}

/// Direct confirmation of the sender's own action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AckPayload {
    pub action: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl AckPayload {
    pub fn of(action: MessageType) -> Self {
        Self {
            action,
            sequence_number: None,
            stroke_id: None,
            message_id: None,
            timestamp: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    RoomNotFound,
    RoomFull,
    AlreadyJoined,
    InvalidCapacity,
    Unauthorized,
    ParticipantNotFound,
    RateLimited,
    RoomClosed,
    RoomAlreadyExists,
    InvalidValue,
    MalformedMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveReasonInfo {
    Left,
    TimedOut,
    Kicked,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveInfo {
    pub user_id: String,
    pub reason: LeaveReasonInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceInfo {
    pub user_id: String,
    pub connection_state: ConnectionState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeUndoInfo {
    pub stroke_id: String,
    pub sequence_number: u64,
    pub by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasClearInfo {
    pub by: String,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MuteInfo {
    pub user_id: String,
    pub is_muted: bool,
    pub by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakingInfo {
    pub user_id: String,
    pub is_speaking: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoteInfo {
    pub host_id: String,
    pub previous_host_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickInfo {
    pub user_id: String,
    pub by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerUpdateInfo {
    pub snapshots: Vec<TickerInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRelayInfo {
    pub from: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAckInfo {
    pub server_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEndedInfo {
    pub room_id: String,
    pub by: Option<String>,
}

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomState(RoomStatePayload),
    Ack(AckPayload),
    Error(ErrorPayload),
    Join(ParticipantInfo),
    Leave(LeaveInfo),
    Presence(PresenceInfo),
    Chat(ChatInfo),
    StrokeAdd(StrokeInfo),
    StrokeUndo(StrokeUndoInfo),
    CanvasClear(CanvasClearInfo),
    MuteToggle(MuteInfo),
    Speaking(SpeakingInfo),
    Promote(PromoteInfo),
    Kick(KickInfo),
    TickerUpdate(TickerUpdateInfo),
    Signal(SignalRelayInfo),
    Heartbeat(HeartbeatAckInfo),
    RoomEnded(RoomEndedInfo),
}

impl ServerMessage {
    /// Serialize to a text frame. Failures are logged and yield `None`.
    pub fn to_json(&self) -> Option<String> {
        match serde_json::to_string(self) {
            Ok(json) => Some(json),
            Err(e) => {
                tracing::error!("Failed to serialize server message: {}", e);
                None
            }
        }
    }
}
