//! Domain entities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    error::ValueObjectError,
    value_object::{ChatText, Color, ConnectionId, SequenceNumber, StrokeId, Timestamp, UserId, Username},
};

/// Participant role within a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Host,
    Viewer,
}

/// Connection lifecycle of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Admitted, transport not open yet
    Connecting,
    Connected,
    /// Transport lost; the participant keeps its slot until the grace period ends
    Disconnected,
    /// Part of the wire vocabulary. Rooms bind a returning connection in one
    /// step, so participants go from `Disconnected` straight to `Connected`.
    Reconnecting,
}

/// A member of a room
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub id: UserId,
    pub username: Username,
    pub role: Role,
    pub joined_at: Timestamp,
    pub connection_state: ConnectionState,
    pub is_speaking: bool,
    pub is_muted: bool,
    /// Last inbound message, heartbeat or state change
    pub last_seen_at: Timestamp,
    pub disconnected_at: Option<Timestamp>,
    #[serde(skip)]
    pub connection_id: Option<ConnectionId>,
}

impl Participant {
    pub fn new(id: UserId, username: Username, role: Role, joined_at: Timestamp) -> Self {
        Self {
            id,
            username,
            role,
            joined_at,
            connection_state: ConnectionState::Connecting,
            is_speaking: false,
            is_muted: false,
            last_seen_at: joined_at,
            disconnected_at: None,
            connection_id: None,
        }
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }
}

/// Drawing tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    Pen,
    Highlighter,
    Eraser,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

/// Maximum number of points in a single stroke
pub const MAX_STROKE_POINTS: usize = 10_000;
/// Maximum stroke width in canvas units
pub const MAX_STROKE_WIDTH: f64 = 200.0;

/// A stroke as submitted by a client, before the room orders it.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeDraft {
    pub id: StrokeId,
    pub points: Vec<Point>,
    pub color: Color,
    pub width: f64,
    pub tool: Tool,
}

impl StrokeDraft {
    pub fn new(
        id: StrokeId,
        points: Vec<Point>,
        color: Color,
        width: f64,
        tool: Tool,
    ) -> Result<Self, ValueObjectError> {
        if points.is_empty() {
            return Err(ValueObjectError::Empty("points"));
        }
        if points.len() > MAX_STROKE_POINTS {
            return Err(ValueObjectError::TooLong {
                field: "points",
                max: MAX_STROKE_POINTS,
            });
        }
        let finite = points.iter().all(|p| {
            p.x.is_finite() && p.y.is_finite() && p.pressure.is_none_or(|v| (0.0..=1.0).contains(&v))
        });
        if !finite {
            return Err(ValueObjectError::OutOfRange("points"));
        }
        if !(width.is_finite() && width > 0.0 && width <= MAX_STROKE_WIDTH) {
            return Err(ValueObjectError::OutOfRange("width"));
        }
        Ok(Self {
            id,
            points,
            color,
            width,
            tool,
        })
    }
}

/// A stroke stored in a room's annotation store
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    pub id: StrokeId,
    pub sequence_number: SequenceNumber,
    pub author: UserId,
    pub points: Vec<Point>,
    pub color: Color,
    pub width: f64,
    pub tool: Tool,
}

impl Stroke {
    pub fn from_draft(draft: StrokeDraft, author: UserId, sequence_number: SequenceNumber) -> Self {
        Self {
            id: draft.id,
            sequence_number,
            author,
            points: draft.points,
            color: draft.color,
            width: draft.width,
            tool: draft.tool,
        }
    }
}

/// A chat log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: UserId,
    pub text: String,
    /// Server receipt time
    pub timestamp: Timestamp,
    pub is_system: bool,
}

impl ChatMessage {
    pub fn new(sender_id: UserId, text: ChatText, timestamp: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id,
            text: text.into_string(),
            timestamp,
            is_system: false,
        }
    }

    /// A notice generated by the room itself, attributed to `subject`.
    pub fn system(subject: UserId, text: String, timestamp: Timestamp) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender_id: subject,
            text,
            timestamp,
            is_system: true,
        }
    }
}

/// Market data for one symbol at one instant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerSnapshot {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub as_of: Timestamp,
}
