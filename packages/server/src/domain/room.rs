//! Room aggregate.
//!
//! A `Room` owns its participant directory, annotation store, chat log and
//! ticker board. It is plain data: every mutation is a method call that
//! validates first and then changes state, returning the [`RoomEvent`]s that
//! other participants need to hear about. Serialization of those calls is
//! the job of the room session that owns the value.

use super::{
    annotation::AnnotationStore,
    chat_log::{ChatLog, ChatRateLimit},
    control::{self, ControlAction},
    directory::{Binding, LivenessPolicy, ParticipantDirectory},
    entity::{ChatMessage, ConnectionState, Participant, Role, Stroke, StrokeDraft, TickerSnapshot},
    error::RoomError,
    ticker::TickerBoard,
    value_object::{Capacity, ChatText, ConnectionId, RoomId, RoomTitle, Timestamp, UserId, Username},
};

/// Tunables that shape a room's behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSettings {
    pub liveness: LivenessPolicy,
    pub chat_retention: usize,
    pub chat_rate_limit: ChatRateLimit,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            liveness: LivenessPolicy {
                heartbeat_timeout_ms: 30_000,
                grace_period_ms: 30_000,
            },
            chat_retention: 500,
            chat_rate_limit: ChatRateLimit::default(),
        }
    }
}

/// Why a participant is no longer in the room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    Left,
    TimedOut,
    Kicked,
}

/// Something other participants should be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    ParticipantJoined(Participant),
    PresenceChanged {
        user_id: UserId,
        state: ConnectionState,
    },
    ParticipantLeft {
        user_id: UserId,
        reason: LeaveReason,
    },
    HostChanged {
        host_id: UserId,
        previous_host: Option<UserId>,
    },
    SystemMessage(ChatMessage),
    RoomEnded {
        by: Option<UserId>,
    },
}

/// Outcome of binding a transport connection to a participant.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub participant: Participant,
    pub binding: Binding,
    pub events: Vec<RoomEvent>,
}

/// Point-in-time copy of a room's state.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub title: RoomTitle,
    pub host_id: Option<UserId>,
    pub max_participants: u32,
    pub created_at: Timestamp,
    pub is_live: bool,
    pub sequence_counter: u64,
    pub participants: Vec<Participant>,
    pub strokes: Vec<Stroke>,
    pub chat: Vec<ChatMessage>,
    pub tickers: Vec<TickerSnapshot>,
}

#[derive(Debug, Clone)]
pub struct Room {
    id: RoomId,
    title: RoomTitle,
    max_participants: Capacity,
    created_at: Timestamp,
    is_live: bool,
    settings: RoomSettings,
    directory: ParticipantDirectory,
    annotations: AnnotationStore,
    chat: ChatLog,
    tickers: TickerBoard,
}

impl Room {
    /// Create a live room with `host_id` admitted as its host.
    pub fn create(
        id: RoomId,
        host_id: UserId,
        host_name: Username,
        title: RoomTitle,
        max_participants: i64,
        now: Timestamp,
        settings: RoomSettings,
    ) -> Result<Self, RoomError> {
        let capacity =
            Capacity::new(max_participants).ok_or(RoomError::InvalidCapacity(max_participants))?;
        let mut directory = ParticipantDirectory::new();
        directory.admit(
            Participant::new(host_id, host_name, Role::Host, now),
            capacity,
            id.as_str(),
        )?;

        Ok(Self {
            id,
            title,
            max_participants: capacity,
            created_at: now,
            is_live: true,
            settings,
            directory,
            annotations: AnnotationStore::new(),
            chat: ChatLog::new(settings.chat_retention, settings.chat_rate_limit),
            tickers: TickerBoard::new(),
        })
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn title(&self) -> &RoomTitle {
        &self.title
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn host_id(&self) -> Option<&UserId> {
        self.directory.host().map(|p| &p.id)
    }

    pub fn max_participants(&self) -> u32 {
        self.max_participants.value()
    }

    pub fn participant_count(&self) -> usize {
        self.directory.len()
    }

    pub fn participant(&self, user_id: &UserId) -> Option<&Participant> {
        self.directory.get(user_id)
    }

    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.directory.iter()
    }

    /// Connected participants, optionally excluding one.
    pub fn connected_ids(&self, exclude: Option<&UserId>) -> Vec<UserId> {
        self.directory.connected_ids(exclude)
    }

    pub fn sequence_counter(&self) -> u64 {
        self.annotations.sequence_counter()
    }

    pub fn strokes(&self) -> &[Stroke] {
        self.annotations.strokes()
    }

    pub fn chat_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.chat.messages()
    }

    fn ensure_live(&self) -> Result<(), RoomError> {
        if self.is_live {
            Ok(())
        } else {
            Err(RoomError::RoomClosed(self.id.as_str().to_string()))
        }
    }

    fn ensure_member(&self, user_id: &UserId) -> Result<(), RoomError> {
        self.ensure_live()?;
        self.directory.require(user_id).map(|_| ())
    }

    /// Admit a viewer ahead of its connection.
    pub fn join(
        &mut self,
        user_id: UserId,
        username: Username,
        now: Timestamp,
    ) -> Result<Participant, RoomError> {
        self.ensure_live()?;
        let participant = Participant::new(user_id, username, Role::Viewer, now);
        self.directory
            .admit(participant, self.max_participants, self.id.as_str())
            .cloned()
    }

    /// Bind a connection, admitting the user first if it has not joined yet.
    pub fn connect(
        &mut self,
        user_id: UserId,
        username: Username,
        connection_id: ConnectionId,
        now: Timestamp,
    ) -> Result<Connection, RoomError> {
        self.ensure_live()?;
        if !self.directory.contains(&user_id) {
            self.join(user_id.clone(), username, now)?;
        }

        let binding = self.directory.bind_connection(&user_id, connection_id, now)?;
        let participant = self.directory.require(&user_id)?.clone();

        let mut events = Vec::new();
        match binding {
            Binding::Fresh => {
                events.push(RoomEvent::ParticipantJoined(participant.clone()));
                let notice = format!("{} joined", participant.username);
                events.push(self.system_message(user_id, notice, now));
            }
            Binding::Reconnected => events.push(RoomEvent::PresenceChanged {
                user_id,
                state: ConnectionState::Connected,
            }),
            Binding::Superseded(_) => {}
        }

        Ok(Connection {
            participant,
            binding,
            events,
        })
    }

    /// Transport for `connection_id` is gone; the participant keeps its slot.
    pub fn disconnect(
        &mut self,
        user_id: &UserId,
        connection_id: ConnectionId,
        now: Timestamp,
    ) -> Vec<RoomEvent> {
        if self.directory.mark_disconnected(user_id, connection_id, now) {
            vec![RoomEvent::PresenceChanged {
                user_id: user_id.clone(),
                state: ConnectionState::Disconnected,
            }]
        } else {
            Vec::new()
        }
    }

    /// Record liveness (heartbeat or any other inbound message).
    pub fn touch(&mut self, user_id: &UserId, now: Timestamp) -> Result<(), RoomError> {
        self.directory.touch(user_id, now)
    }

    /// Confirmed leave.
    pub fn leave(&mut self, user_id: &UserId, now: Timestamp) -> Result<Vec<RoomEvent>, RoomError> {
        self.ensure_live()?;
        let removed = self
            .directory
            .remove(user_id)
            .ok_or_else(|| RoomError::ParticipantNotFound(user_id.as_str().to_string()))?;
        self.chat.forget_sender(user_id);

        let mut events = vec![RoomEvent::ParticipantLeft {
            user_id: user_id.clone(),
            reason: LeaveReason::Left,
        }];
        let notice = format!("{} left", removed.username);
        events.push(self.system_message(user_id.clone(), notice, now));
        self.settle_after_removal(removed.is_host(), now, &mut events);
        Ok(events)
    }

    /// End the room on behalf of its host.
    pub fn end(&mut self, acting: &UserId) -> Result<Vec<RoomEvent>, RoomError> {
        self.ensure_live()?;
        control::authorize(&self.directory, acting, ControlAction::EndRoom, None)?;
        self.is_live = false;
        Ok(vec![RoomEvent::RoomEnded {
            by: Some(acting.clone()),
        }])
    }

    /// Apply heartbeat timeouts and grace-period expiry.
    pub fn sweep(&mut self, now: Timestamp) -> Vec<RoomEvent> {
        if !self.is_live {
            return Vec::new();
        }
        let expiry = self.directory.expire(now, self.settings.liveness);

        let mut events: Vec<RoomEvent> = expiry
            .disconnected
            .into_iter()
            .map(|user_id| RoomEvent::PresenceChanged {
                user_id,
                state: ConnectionState::Disconnected,
            })
            .collect();

        let mut host_removed = false;
        for participant in expiry.removed.iter() {
            host_removed |= participant.is_host();
            self.chat.forget_sender(&participant.id);
            events.push(RoomEvent::ParticipantLeft {
                user_id: participant.id.clone(),
                reason: LeaveReason::TimedOut,
            });
            let notice = format!("{} timed out", participant.username);
            events.push(self.system_message(participant.id.clone(), notice, now));
        }
        if !expiry.removed.is_empty() {
            self.settle_after_removal(host_removed, now, &mut events);
        }
        events
    }

    /// Keep the single-host invariant after participants were removed.
    fn settle_after_removal(&mut self, host_removed: bool, now: Timestamp, events: &mut Vec<RoomEvent>) {
        if self.directory.is_empty() {
            self.is_live = false;
            events.push(RoomEvent::RoomEnded { by: None });
            return;
        }
        if !host_removed && self.directory.host_count() == 1 {
            return;
        }
        let Some(successor) = self.directory.longest_tenured().map(|p| p.id.clone()) else {
            return;
        };
        if self.directory.transfer_host(&successor).is_ok() {
            tracing::info!(
                "Room '{}': '{}' promoted to host after host left",
                self.id,
                successor
            );
            events.push(RoomEvent::HostChanged {
                host_id: successor.clone(),
                previous_host: None,
            });
            let notice = self.host_notice(&successor);
            events.push(self.system_message(successor, notice, now));
        }
    }

    fn host_notice(&self, host_id: &UserId) -> String {
        let name = self
            .directory
            .get(host_id)
            .map(|p| p.username.to_string())
            .unwrap_or_else(|| host_id.to_string());
        format!("{} is now the host", name)
    }

    fn system_message(&mut self, subject: UserId, text: String, now: Timestamp) -> RoomEvent {
        RoomEvent::SystemMessage(self.chat.append_system(subject, text, now).clone())
    }

    /// Order and store a stroke.
    pub fn add_stroke(&mut self, author: &UserId, draft: StrokeDraft) -> Result<Stroke, RoomError> {
        self.ensure_member(author)?;
        Ok(self.annotations.add(author.clone(), draft).clone())
    }

    /// Remove the highest-sequence stroke. `Ok(None)` when there is nothing to undo.
    pub fn undo_last(&mut self, actor: &UserId) -> Result<Option<Stroke>, RoomError> {
        self.ensure_member(actor)?;
        let Some(last) = self.annotations.last() else {
            return Ok(None);
        };
        control::authorize_undo(&self.directory, actor, &last.author)?;
        Ok(self.annotations.undo_last())
    }

    /// Remove every stroke. Returns how many were removed.
    pub fn clear_all(&mut self, actor: &UserId) -> Result<usize, RoomError> {
        self.ensure_live()?;
        control::authorize(&self.directory, actor, ControlAction::ClearCanvas, None)?;
        Ok(self.annotations.clear())
    }

    pub fn post_chat(
        &mut self,
        sender: &UserId,
        text: ChatText,
        now: Timestamp,
    ) -> Result<ChatMessage, RoomError> {
        self.ensure_member(sender)?;
        self.chat.append(sender.clone(), text, now).cloned()
    }

    /// Toggle the target's mute flag. Returns the new value.
    pub fn toggle_mute(&mut self, actor: &UserId, target: &UserId) -> Result<bool, RoomError> {
        self.ensure_live()?;
        control::authorize(&self.directory, actor, ControlAction::Mute, Some(target))?;
        let participant = self.directory.require_mut(target)?;
        participant.is_muted = !participant.is_muted;
        if participant.is_muted {
            participant.is_speaking = false;
        }
        Ok(participant.is_muted)
    }

    /// Hand the host role to `target`.
    pub fn promote(
        &mut self,
        actor: &UserId,
        target: &UserId,
        now: Timestamp,
    ) -> Result<Vec<RoomEvent>, RoomError> {
        self.ensure_live()?;
        control::authorize(&self.directory, actor, ControlAction::Promote, Some(target))?;
        let previous_host = self.directory.transfer_host(target)?;
        let notice = self.host_notice(target);
        Ok(vec![
            RoomEvent::HostChanged {
                host_id: target.clone(),
                previous_host,
            },
            self.system_message(target.clone(), notice, now),
        ])
    }

    /// Remove `target` from the room. Returns the removed participant.
    pub fn kick(
        &mut self,
        actor: &UserId,
        target: &UserId,
        now: Timestamp,
    ) -> Result<(Participant, Vec<RoomEvent>), RoomError> {
        self.ensure_live()?;
        control::authorize(&self.directory, actor, ControlAction::Kick, Some(target))?;
        let removed = self
            .directory
            .remove(target)
            .ok_or_else(|| RoomError::ParticipantNotFound(target.as_str().to_string()))?;
        self.chat.forget_sender(target);
        let notice = format!("{} was removed by the host", removed.username);
        let events = vec![
            RoomEvent::ParticipantLeft {
                user_id: target.clone(),
                reason: LeaveReason::Kicked,
            },
            self.system_message(target.clone(), notice, now),
        ];
        Ok((removed, events))
    }

    /// Update voice activity. Returns the new value when it changed.
    ///
    /// A muted participant never counts as speaking.
    pub fn set_speaking(&mut self, user_id: &UserId, speaking: bool) -> Result<Option<bool>, RoomError> {
        self.ensure_member(user_id)?;
        let participant = self.directory.require_mut(user_id)?;
        let speaking = speaking && !participant.is_muted;
        if participant.is_speaking == speaking {
            return Ok(None);
        }
        participant.is_speaking = speaking;
        Ok(Some(speaking))
    }

    pub fn rename(&mut self, user_id: &UserId, username: Username) -> Result<(), RoomError> {
        self.ensure_member(user_id)?;
        self.directory.require_mut(user_id)?.username = username;
        Ok(())
    }

    /// Store ticker snapshots; returns the ones that were newer than what was held.
    pub fn apply_tickers(&mut self, snapshots: Vec<TickerSnapshot>) -> Vec<TickerSnapshot> {
        self.tickers.apply(snapshots)
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id.clone(),
            title: self.title.clone(),
            host_id: self.host_id().cloned(),
            max_participants: self.max_participants.value(),
            created_at: self.created_at,
            is_live: self.is_live,
            sequence_counter: self.annotations.sequence_counter(),
            participants: self.directory.iter().cloned().collect(),
            strokes: self.annotations.strokes().to_vec(),
            chat: self.chat.messages().cloned().collect(),
            tickers: self.tickers.snapshots(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entity::{Point, Tool},
        value_object::{Color, StrokeId},
    };

    const GRACE: i64 = 30_000;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    fn name(id: &str) -> Username {
        Username::new(id.to_string()).unwrap()
    }

    fn room_with_capacity(capacity: i64) -> Room {
        Room::create(
            RoomId::new("room-1".to_string()).unwrap(),
            user("host"),
            name("host"),
            RoomTitle::new("Morning market".to_string()).unwrap(),
            capacity,
            Timestamp::new(0),
            RoomSettings::default(),
        )
        .unwrap()
    }

    /// Host plus viewers, all connected. Connection ids follow admission order.
    fn live_room(viewers: &[&str]) -> Room {
        let mut room = room_with_capacity(10);
        room.connect(user("host"), name("host"), ConnectionId::new(0), Timestamp::new(0))
            .unwrap();
        for (i, viewer) in viewers.iter().enumerate() {
            let at = Timestamp::new(10 * (i as i64 + 1));
            room.connect(user(viewer), name(viewer), ConnectionId::new(i as u64 + 1), at)
                .unwrap();
        }
        room
    }

    fn draft(id: &str) -> StrokeDraft {
        StrokeDraft::new(
            StrokeId::new(id.to_string()).unwrap(),
            vec![Point {
                x: 0.0,
                y: 0.0,
                pressure: None,
            }],
            Color::new("blue".to_string()).unwrap(),
            2.0,
            Tool::Highlighter,
        )
        .unwrap()
    }

    #[test]
    fn test_create_rejects_non_positive_capacity() {
        // テスト項目: 定員 0 以下のルーム作成は InvalidCapacity で失敗する
        // given (前提条件):
        let id = RoomId::new("r".to_string()).unwrap();

        // when (操作):
        let result = Room::create(
            id,
            user("host"),
            name("host"),
            RoomTitle::new("t".to_string()).unwrap(),
            0,
            Timestamp::new(0),
            RoomSettings::default(),
        );

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), RoomError::InvalidCapacity(0));
    }

    #[test]
    fn test_create_admits_host() {
        // テスト項目: 作成されたルームはライブで、ホストが唯一の参加者である
        // given (前提条件):

        // when (操作):
        let room = room_with_capacity(3);

        // then (期待する結果):
        assert!(room.is_live());
        assert_eq!(room.host_id(), Some(&user("host")));
        assert_eq!(room.participant_count(), 1);
    }

    #[test]
    fn test_join_beyond_capacity_is_room_full() {
        // テスト項目: 定員 2 のルームに 3 人目は参加できない
        // given (前提条件):
        let mut room = room_with_capacity(2);
        room.join(user("alice"), name("alice"), Timestamp::new(1))
            .unwrap();

        // when (操作):
        let result = room.join(user("bob"), name("bob"), Timestamp::new(2));

        // then (期待する結果):
        assert!(matches!(result, Err(RoomError::RoomFull { .. })));
        assert_eq!(room.participant_count(), 2);
    }

    #[test]
    fn test_connect_admits_and_announces_join() {
        // テスト項目: 未参加ユーザーの接続は参加として扱われ、join と system メッセージが発生する
        // given (前提条件):
        let mut room = room_with_capacity(5);

        // when (操作):
        let connection = room
            .connect(user("alice"), name("Alice"), ConnectionId::new(7), Timestamp::new(5))
            .unwrap();

        // then (期待する結果):
        assert_eq!(connection.binding, Binding::Fresh);
        assert_eq!(connection.participant.role, Role::Viewer);
        assert!(matches!(connection.events[0], RoomEvent::ParticipantJoined(_)));
        match &connection.events[1] {
            RoomEvent::SystemMessage(message) => {
                assert!(message.is_system);
                assert_eq!(message.text, "Alice joined");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_strokes_from_host_and_viewer_are_sequenced_in_receipt_order() {
        // テスト項目: ホストと視聴者のストロークは受信順に seq=1, seq=2 が割り当てられる
        // given (前提条件):
        let mut room = live_room(&["viewer"]);

        // when (操作):
        let first = room.add_stroke(&user("host"), draft("h1")).unwrap();
        let second = room.add_stroke(&user("viewer"), draft("v1")).unwrap();

        // then (期待する結果):
        assert_eq!(first.sequence_number.value(), 1);
        assert_eq!(second.sequence_number.value(), 2);
        assert_eq!(room.sequence_counter(), 2);
    }

    #[test]
    fn test_undo_on_empty_canvas_is_noop() {
        // テスト項目: 空のキャンバスでの undo はエラーにならず何も変わらない
        // given (前提条件):
        let mut room = live_room(&["viewer"]);

        // when (操作):
        let result = room.undo_last(&user("viewer"));

        // then (期待する結果):
        assert_eq!(result, Ok(None));
        assert!(room.strokes().is_empty());
    }

    #[test]
    fn test_undo_of_someone_elses_stroke_is_unauthorized() {
        // テスト項目: 他人の最新ストロークを視聴者が undo すると Unauthorized になり、状態は変わらない
        // given (前提条件):
        let mut room = live_room(&["alice", "bob"]);
        room.add_stroke(&user("alice"), draft("a1")).unwrap();

        // when (操作):
        let by_bob = room.undo_last(&user("bob"));
        let by_host = room.undo_last(&user("host"));

        // then (期待する結果):
        assert_eq!(by_bob, Err(RoomError::Unauthorized("bob".to_string())));
        assert_eq!(by_host.unwrap().unwrap().id.as_str(), "a1");
    }

    #[test]
    fn test_clear_all_is_host_only() {
        // テスト項目: キャンバスの全消去はホストのみ実行できる
        // given (前提条件):
        let mut room = live_room(&["alice"]);
        room.add_stroke(&user("alice"), draft("a1")).unwrap();

        // when (操作):
        let by_viewer = room.clear_all(&user("alice"));
        let by_host = room.clear_all(&user("host"));

        // then (期待する結果):
        assert!(by_viewer.is_err());
        assert_eq!(by_host, Ok(1));
        assert!(room.strokes().is_empty());
    }

    #[test]
    fn test_viewer_kick_is_unauthorized_and_directory_unchanged() {
        // テスト項目: 視聴者が他の視聴者を kick すると Unauthorized になり、参加者は変わらない
        // given (前提条件):
        let mut room = live_room(&["alice", "bob"]);
        let before = room.snapshot().participants;

        // when (操作):
        let result = room.kick(&user("alice"), &user("bob"), Timestamp::new(100));

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            RoomError::Unauthorized("alice".to_string())
        );
        assert_eq!(room.snapshot().participants, before);
    }

    #[test]
    fn test_host_kick_releases_capacity() {
        // テスト項目: ホストによる kick で対象が削除され、定員に空きができる
        // given (前提条件):
        let mut room = room_with_capacity(2);
        room.join(user("alice"), name("alice"), Timestamp::new(1))
            .unwrap();

        // when (操作):
        let (removed, events) = room
            .kick(&user("host"), &user("alice"), Timestamp::new(2))
            .unwrap();

        // then (期待する結果):
        assert_eq!(removed.id, user("alice"));
        assert!(events.contains(&RoomEvent::ParticipantLeft {
            user_id: user("alice"),
            reason: LeaveReason::Kicked
        }));
        assert!(room.join(user("bob"), name("bob"), Timestamp::new(3)).is_ok());
    }

    #[test]
    fn test_mute_toggle_rules() {
        // テスト項目: 自分のミュートは誰でも可能、他人のミュートはホストのみ可能
        // given (前提条件):
        let mut room = live_room(&["alice", "bob"]);
        room.set_speaking(&user("alice"), true).unwrap();

        // when (操作):
        let self_mute = room.toggle_mute(&user("alice"), &user("alice"));
        let viewer_mutes_other = room.toggle_mute(&user("alice"), &user("bob"));
        let host_mutes_bob = room.toggle_mute(&user("host"), &user("bob"));

        // then (期待する結果):
        assert_eq!(self_mute, Ok(true));
        assert!(!room.participant(&user("alice")).unwrap().is_speaking);
        assert_eq!(
            viewer_mutes_other,
            Err(RoomError::Unauthorized("alice".to_string()))
        );
        assert_eq!(host_mutes_bob, Ok(true));
        assert_eq!(room.set_speaking(&user("bob"), true), Ok(None));
    }

    #[test]
    fn test_promote_transfers_host_role() {
        // テスト項目: promote でホスト権限が移り、元ホストは視聴者になる
        // given (前提条件):
        let mut room = live_room(&["alice"]);

        // when (操作):
        let events = room
            .promote(&user("host"), &user("alice"), Timestamp::new(50))
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            events[0],
            RoomEvent::HostChanged {
                host_id: user("alice"),
                previous_host: Some(user("host"))
            }
        );
        assert_eq!(room.host_id(), Some(&user("alice")));
        assert_eq!(room.participant(&user("host")).unwrap().role, Role::Viewer);
        assert!(room.promote(&user("host"), &user("alice"), Timestamp::new(51)).is_err());
    }

    #[test]
    fn test_host_leave_promotes_longest_tenured_viewer() {
        // テスト項目: ホストが退出すると最古参の視聴者がホストになる
        // given (前提条件):
        let mut room = live_room(&["alice", "bob"]);

        // when (操作):
        let events = room.leave(&user("host"), Timestamp::new(100)).unwrap();

        // then (期待する結果):
        assert!(events.contains(&RoomEvent::HostChanged {
            host_id: user("alice"),
            previous_host: None
        }));
        assert_eq!(room.host_id(), Some(&user("alice")));
        assert!(room.is_live());
    }

    #[test]
    fn test_last_participant_leaving_ends_room() {
        // テスト項目: 最後の参加者が退出するとルームはライブでなくなる
        // given (前提条件):
        let mut room = live_room(&[]);

        // when (操作):
        let events = room.leave(&user("host"), Timestamp::new(10)).unwrap();

        // then (期待する結果):
        assert!(!room.is_live());
        assert_eq!(events.last(), Some(&RoomEvent::RoomEnded { by: None }));
        assert_eq!(
            room.join(user("late"), name("late"), Timestamp::new(11)),
            Err(RoomError::RoomClosed("room-1".to_string()))
        );
    }

    #[test]
    fn test_host_reconnect_within_grace_keeps_role() {
        // テスト項目: ホストが猶予期間内に再接続すると役割は維持され、昇格は起きない
        // given (前提条件):
        let mut room = live_room(&["alice"]);
        room.disconnect(&user("host"), ConnectionId::new(0), Timestamp::new(1_000));
        room.sweep(Timestamp::new(1_000 + GRACE - 1));

        // when (操作):
        let connection = room
            .connect(user("host"), name("host"), ConnectionId::new(9), Timestamp::new(1_000 + GRACE - 1))
            .unwrap();
        let events = room.sweep(Timestamp::new(1_000 + GRACE + 10));

        // then (期待する結果):
        assert_eq!(connection.binding, Binding::Reconnected);
        assert_eq!(connection.participant.role, Role::Host);
        assert_eq!(
            connection.participant.connection_state,
            ConnectionState::Connected
        );
        assert_eq!(
            connection.events,
            vec![RoomEvent::PresenceChanged {
                user_id: user("host"),
                state: ConnectionState::Connected,
            }]
        );
        assert!(events.iter().all(|e| !matches!(e, RoomEvent::HostChanged { .. })));
        assert_eq!(room.host_id(), Some(&user("host")));
    }

    #[test]
    fn test_host_grace_expiry_promotes_earliest_viewer() {
        // テスト項目: ホストの猶予期間が切れると、joinedAt が早い視聴者 A がホストになる
        // given (前提条件):
        let mut room = live_room(&["viewer-a", "viewer-b"]);
        room.disconnect(&user("host"), ConnectionId::new(0), Timestamp::new(100));
        for viewer in ["viewer-a", "viewer-b"] {
            room.touch(&user(viewer), Timestamp::new(100 + GRACE)).unwrap();
        }

        // when (操作):
        let events = room.sweep(Timestamp::new(100 + GRACE + 1));

        // then (期待する結果):
        assert!(events.contains(&RoomEvent::ParticipantLeft {
            user_id: user("host"),
            reason: LeaveReason::TimedOut
        }));
        assert_eq!(room.host_id(), Some(&user("viewer-a")));
        assert_eq!(room.participant_count(), 2);
        assert_eq!(room.participants().filter(|p| p.is_host()).count(), 1);
    }

    #[test]
    fn test_timed_out_participant_releases_capacity() {
        // テスト項目: 猶予期間内に戻らない参加者は削除され、参加者数が 1 減る
        // given (前提条件):
        let mut room = room_with_capacity(2);
        room.connect(user("host"), name("host"), ConnectionId::new(0), Timestamp::new(0))
            .unwrap();
        room.connect(user("alice"), name("alice"), ConnectionId::new(1), Timestamp::new(0))
            .unwrap();
        room.disconnect(&user("alice"), ConnectionId::new(1), Timestamp::new(10));
        room.touch(&user("host"), Timestamp::new(10 + GRACE)).unwrap();
        assert_eq!(room.participant_count(), 2);

        // when (操作):
        room.sweep(Timestamp::new(10 + GRACE + 1));

        // then (期待する結果):
        assert_eq!(room.participant_count(), 1);
        assert!(room.join(user("bob"), name("bob"), Timestamp::new(10 + GRACE + 2)).is_ok());
    }

    #[test]
    fn test_end_requires_host() {
        // テスト項目: ルームの終了はホストのみ可能
        // given (前提条件):
        let mut room = live_room(&["alice"]);

        // when (操作):
        let by_viewer = room.end(&user("alice"));
        let by_host = room.end(&user("host"));

        // then (期待する結果):
        assert_eq!(by_viewer, Err(RoomError::Unauthorized("alice".to_string())));
        assert_eq!(
            by_host,
            Ok(vec![RoomEvent::RoomEnded {
                by: Some(user("host"))
            }])
        );
        assert!(!room.is_live());
    }

    #[test]
    fn test_chat_requires_membership() {
        // テスト項目: 参加していないユーザーはチャットを投稿できない
        // given (前提条件):
        let mut room = live_room(&["alice"]);
        let text = ChatText::new("hello".to_string()).unwrap();

        // when (操作):
        let member = room.post_chat(&user("alice"), text.clone(), Timestamp::new(5));
        let stranger = room.post_chat(&user("mallory"), text, Timestamp::new(6));

        // then (期待する結果):
        assert_eq!(member.unwrap().text, "hello");
        assert_eq!(
            stranger,
            Err(RoomError::ParticipantNotFound("mallory".to_string()))
        );
    }
}
