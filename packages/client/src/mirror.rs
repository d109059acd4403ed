//! Local mirror of the room state.
//!
//! Seeded by `room_state` and kept current by applying every broadcast in
//! arrival order. The server stays authoritative; a reconnect replaces the
//! mirror with a fresh snapshot.

use std::{collections::BTreeMap, time::Duration};

use butai_server::{
    domain::{ConnectionState, Role},
    infrastructure::dto::websocket::{
        ChatInfo, ParticipantInfo, RoomInfo, ServerMessage, StrokeInfo, TickerInfo,
    },
};

/// Chat messages kept for display
const CHAT_HISTORY: usize = 200;

#[derive(Debug, Default, Clone)]
pub struct RoomMirror {
    you: String,
    room: Option<RoomInfo>,
    participants: BTreeMap<String, ParticipantInfo>,
    strokes: Vec<StrokeInfo>,
    chat: Vec<ChatInfo>,
    tickers: BTreeMap<String, TickerInfo>,
    heartbeat_interval_ms: u64,
}

impl RoomMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one server message.
    pub fn apply(&mut self, message: &ServerMessage) {
        match message {
            ServerMessage::RoomState(state) => {
                self.you = state.you.clone();
                self.room = Some(state.room.clone());
                self.participants = state
                    .participants
                    .iter()
                    .map(|p| (p.user_id.clone(), p.clone()))
                    .collect();
                self.strokes = state.strokes.clone();
                self.chat = state.chat.clone();
                self.tickers = state
                    .tickers
                    .iter()
                    .map(|t| (t.symbol.clone(), t.clone()))
                    .collect();
                self.heartbeat_interval_ms = state.heartbeat_interval_ms;
            }
            ServerMessage::Join(participant) => {
                self.participants
                    .insert(participant.user_id.clone(), participant.clone());
            }
            ServerMessage::Leave(leave) => {
                self.participants.remove(&leave.user_id);
            }
            ServerMessage::Kick(kick) => {
                self.participants.remove(&kick.user_id);
            }
            ServerMessage::Presence(presence) => {
                if let Some(p) = self.participants.get_mut(&presence.user_id) {
                    p.connection_state = presence.connection_state;
                }
            }
            ServerMessage::Chat(chat) => {
                self.chat.push(chat.clone());
                if self.chat.len() > CHAT_HISTORY {
                    let excess = self.chat.len() - CHAT_HISTORY;
                    self.chat.drain(..excess);
                }
            }
            ServerMessage::StrokeAdd(stroke) => self.insert_stroke(stroke.clone()),
            ServerMessage::StrokeUndo(undo) => {
                self.strokes.retain(|s| s.id != undo.stroke_id);
            }
            ServerMessage::CanvasClear(_) => self.strokes.clear(),
            ServerMessage::MuteToggle(mute) => {
                if let Some(p) = self.participants.get_mut(&mute.user_id) {
                    p.is_muted = mute.is_muted;
                    if mute.is_muted {
                        p.is_speaking = false;
                    }
                }
            }
            ServerMessage::Speaking(speaking) => {
                if let Some(p) = self.participants.get_mut(&speaking.user_id) {
                    p.is_speaking = speaking.is_speaking;
                }
            }
            ServerMessage::Promote(promote) => {
                for p in self.participants.values_mut() {
                    p.role = if p.user_id == promote.host_id {
                        Role::Host
                    } else {
                        Role::Viewer
                    };
                }
                if let Some(room) = self.room.as_mut() {
                    room.host_id = Some(promote.host_id.clone());
                }
            }
            ServerMessage::TickerUpdate(update) => {
                for snapshot in &update.snapshots {
                    self.tickers.insert(snapshot.symbol.clone(), snapshot.clone());
                }
            }
            ServerMessage::RoomEnded(_) => {
                if let Some(room) = self.room.as_mut() {
                    room.is_live = false;
                }
            }
            ServerMessage::Ack(_)
            | ServerMessage::Error(_)
            | ServerMessage::Signal(_)
            | ServerMessage::Heartbeat(_) => {}
        }
    }

    /// Keep strokes ordered by sequence number.
    fn insert_stroke(&mut self, stroke: StrokeInfo) {
        let position = self
            .strokes
            .partition_point(|s| s.sequence_number < stroke.sequence_number);
        if let Some(room) = self.room.as_mut() {
            room.sequence_counter = room.sequence_counter.max(stroke.sequence_number);
        }
        self.strokes.insert(position, stroke);
    }

    pub fn you(&self) -> &str {
        &self.you
    }

    pub fn room(&self) -> Option<&RoomInfo> {
        self.room.as_ref()
    }

    pub fn host_id(&self) -> Option<&str> {
        self.room.as_ref().and_then(|r| r.host_id.as_deref())
    }

    pub fn is_host(&self) -> bool {
        self.host_id() == Some(self.you.as_str())
    }

    pub fn is_live(&self) -> bool {
        self.room.as_ref().is_some_and(|r| r.is_live)
    }

    pub fn participants(&self) -> impl Iterator<Item = &ParticipantInfo> {
        self.participants.values()
    }

    pub fn participant(&self, user_id: &str) -> Option<&ParticipantInfo> {
        self.participants.get(user_id)
    }

    pub fn connected_count(&self) -> usize {
        self.participants
            .values()
            .filter(|p| p.connection_state == ConnectionState::Connected)
            .count()
    }

    pub fn strokes(&self) -> &[StrokeInfo] {
        &self.strokes
    }

    pub fn chat(&self) -> &[ChatInfo] {
        &self.chat
    }

    pub fn tickers(&self) -> impl Iterator<Item = &TickerInfo> {
        self.tickers.values()
    }

    /// Interval advertised by the server, if a snapshot has arrived
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_ms > 0).then(|| Duration::from_millis(self.heartbeat_interval_ms))
    }
}
