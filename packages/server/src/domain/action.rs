//! Participant actions delivered over the signaling channel.

use serde_json::Value;

use super::{
    entity::StrokeDraft,
    value_object::{ChatText, UserId, Username},
};

/// A validated inbound action, ready to be applied by the owning room.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Re-announce presence; the sender gets a fresh room snapshot
    Join { username: Option<Username> },
    Leave,
    Chat(ChatText),
    StrokeAdd(StrokeDraft),
    StrokeUndo,
    CanvasClear,
    MuteToggle { target: UserId },
    Promote { target: UserId },
    Kick { target: UserId },
    Speaking { is_speaking: bool },
    /// Opaque WebRTC signaling relayed to a single peer
    Signal { to: UserId, data: Value },
    Heartbeat { client_time: Option<i64> },
}

/// Kind of an inbound action, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Join,
    Leave,
    Chat,
    StrokeAdd,
    StrokeUndo,
    CanvasClear,
    MuteToggle,
    Promote,
    Kick,
    Speaking,
    Signal,
    Heartbeat,
}

impl ActionKind {
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
            Self::Speaking => "speaking",
            Self::Signal => "signal",
            Self::Heartbeat => "heartbeat",
        }
    }
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Join { .. } => ActionKind::Join,
            Self::Leave => ActionKind::Leave,
            Self::Chat(_) => ActionKind::Chat,
            Self::StrokeAdd(_) => ActionKind::StrokeAdd,
            Self::StrokeUndo => ActionKind::StrokeUndo,
            Self::CanvasClear => ActionKind::CanvasClear,
            Self::MuteToggle { .. } => ActionKind::MuteToggle,
            Self::Promote { .. } => ActionKind::Promote,
            Self::Kick { .. } => ActionKind::Kick,
            Self::Speaking { .. } => ActionKind::Speaking,
            Self::Signal { .. } => ActionKind::Signal,
            Self::Heartbeat { .. } => ActionKind::Heartbeat,
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}
