//! Room session: the task that owns one room.
//!
//! Every mutation of a room happens inside its session loop, one command at
//! a time, so capacity checks, sequence numbers and host succession never
//! race. The same loop drives the ticker and the liveness sweep. Delivery
//! goes through the room's own `MessagePusher`, which never blocks the loop.

use std::{sync::Arc, time::Duration};

use butai_shared::time::Clock;
use tokio::{
    sync::mpsc,
    time::{Instant, Interval, MissedTickBehavior, interval_at},
};

use crate::domain::{
    Ack, Action, ActionKind, ConnectOutcome, ConnectRequest, MessagePusher, OutboundMessage,
    RepositoryError, Room, RoomCommand, RoomError, RoomEvent, RoomHandle, RoomRepository,
    RoomSummary, TickerFeed, Timestamp, UserId,
};

use super::config::SessionConfig;

/// Creates the outbound delivery for a new room.
pub type PusherFactory = Arc<dyn Fn() -> Arc<dyn MessagePusher> + Send + Sync>;

/// Creates the ticker feed for a new room.
pub type TickerFeedFactory = Arc<dyn Fn() -> Box<dyn TickerFeed> + Send + Sync>;

/// Starts room sessions and registers them in the room registry.
pub struct RoomSpawner {
    repository: Arc<dyn RoomRepository>,
    pusher_factory: PusherFactory,
    ticker_factory: TickerFeedFactory,
    clock: Arc<dyn Clock>,
    config: Arc<SessionConfig>,
}

impl RoomSpawner {
    pub fn new(
        repository: Arc<dyn RoomRepository>,
        pusher_factory: PusherFactory,
        ticker_factory: TickerFeedFactory,
        clock: Arc<dyn Clock>,
        config: Arc<SessionConfig>,
    ) -> Self {
        Self {
            repository,
            pusher_factory,
            ticker_factory,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// Register `room` and start its session.
    ///
    /// Fails without starting anything if a live room with the same id is
    /// already registered.
    pub async fn open(&self, room: Room) -> Result<RoomHandle, RepositoryError> {
        let (commands_tx, commands_rx) = mpsc::channel(self.config.mailbox_capacity);
        let handle = RoomHandle::new(room.id().clone(), commands_tx);
        self.repository.insert(handle.clone()).await?;

        let session = RoomSession {
            room,
            commands: commands_rx,
            pusher: (self.pusher_factory)(),
            ticker: (self.ticker_factory)(),
            repository: self.repository.clone(),
            clock: self.clock.clone(),
            config: self.config.clone(),
        };
        tracing::info!("Room '{}' opened", handle.room_id());
        tokio::spawn(session.run());
        Ok(handle)
    }
}

struct RoomSession {
    room: Room,
    commands: mpsc::Receiver<RoomCommand>,
    pusher: Arc<dyn MessagePusher>,
    ticker: Box<dyn TickerFeed>,
    repository: Arc<dyn RoomRepository>,
    clock: Arc<dyn Clock>,
    config: Arc<SessionConfig>,
}

fn periodic(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

impl RoomSession {
    async fn run(mut self) {
        let mut ticker = periodic(self.config.ticker_interval);
        let mut sweep = periodic(self.config.sweep_interval);

        while self.room.is_live() {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = ticker.tick() => self.publish_tickers().await,
                _ = sweep.tick() => self.sweep().await,
            }
        }

        self.teardown().await;
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    async fn teardown(&mut self) {
        // Deregister while the mailbox is still open so the id cannot be
        // re-registered by a new room before this one is gone.
        self.repository.remove(self.room.id()).await;
        self.pusher.close_all().await;
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            self.reject(command);
        }
        tracing::info!("Room '{}' closed", self.room.id());
    }

    /// Answer a command that arrived after the room stopped being live.
    fn reject(&self, command: RoomCommand) {
        let closed = || RoomError::RoomClosed(self.room.id().as_str().to_string());
        match command {
            RoomCommand::Join { reply, .. } => {
                let _ = reply.send(Err(closed()));
            }
            RoomCommand::Leave { reply, .. } | RoomCommand::End { reply, .. } => {
                let _ = reply.send(Err(closed()));
            }
            RoomCommand::Connect { reply, .. } => {
                let _ = reply.send(Err(closed()));
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
            }
            RoomCommand::Summary { reply } => {
                let _ = reply.send(self.summary());
            }
            RoomCommand::Disconnect { .. } | RoomCommand::Dispatch { .. } => {}
        }
    }

    fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.room.id().clone(),
            title: self.room.title().clone(),
            host_id: self.room.host_id().cloned(),
            participant_count: self.room.participant_count(),
            max_participants: self.room.max_participants(),
            created_at: self.room.created_at(),
            is_live: self.room.is_live(),
        }
    }

    async fn handle(&mut self, command: RoomCommand) {
        let now = self.now();
        match command {
            RoomCommand::Join {
                user_id,
                username,
                reply,
            } => {
                let result = self.room.join(user_id.clone(), username, now);
                match &result {
                    Ok(_) => tracing::info!("'{}' joined room '{}'", user_id, self.room.id()),
                    Err(e) => tracing::warn!("Join of '{}' rejected: {}", user_id, e),
                }
                let _ = reply.send(result);
            }
            RoomCommand::Leave { user_id, reply } => {
                let result = self.leave(&user_id, now).await;
                let _ = reply.send(result);
            }
            RoomCommand::End { user_id, reply } => {
                let result = self.end(&user_id).await;
                let _ = reply.send(result);
            }
            RoomCommand::Connect { request, reply } => {
                let result = self.connect(request, now).await;
                let _ = reply.send(result);
            }
            RoomCommand::Disconnect {
                user_id,
                connection_id,
            } => {
                self.pusher
                    .unregister_client(&user_id, Some(connection_id))
                    .await;
                let events = self.room.disconnect(&user_id, connection_id, now);
                if !events.is_empty() {
                    tracing::info!(
                        "'{}' disconnected from room '{}'; grace period started",
                        user_id,
                        self.room.id()
                    );
                }
                self.broadcast_events(&events, None).await;
            }
            RoomCommand::Dispatch {
                user_id,
                connection_id,
                action,
            } => {
                let current = self
                    .room
                    .participant(&user_id)
                    .and_then(|p| p.connection_id);
                if current != Some(connection_id) {
                    tracing::debug!(
                        "Dropping '{}' from stale connection {} of '{}'",
                        action.name(),
                        connection_id.value(),
                        user_id
                    );
                    return;
                }
                if let Err(e) = self.room.touch(&user_id, now) {
                    tracing::debug!("Touch failed for '{}': {}", user_id, e);
                }
                let name = action.name();
                if let Err(e) = self.apply(&user_id, action, now).await {
                    tracing::warn!("'{}' from '{}' rejected: {}", name, user_id, e);
                    self.send(&user_id, &OutboundMessage::Error(e)).await;
                }
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
            }
            RoomCommand::Summary { reply } => {
                let _ = reply.send(self.summary());
            }
        }
    }

    async fn connect(
        &mut self,
        request: ConnectRequest,
        now: Timestamp,
    ) -> Result<ConnectOutcome, RoomError> {
        let ConnectRequest {
            user_id,
            username,
            connection_id,
            channel,
        } = request;

        let connection = self
            .room
            .connect(user_id.clone(), username, connection_id, now)?;
        self.pusher
            .register_client(user_id.clone(), connection_id, channel)
            .await;
        tracing::info!(
            "'{}' connected to room '{}' ({:?})",
            user_id,
            self.room.id(),
            connection.binding
        );

        self.send_room_state(&user_id).await;
        self.broadcast_events(&connection.events, Some(&user_id))
            .await;

        Ok(ConnectOutcome {
            participant: connection.participant,
            binding: connection.binding,
        })
    }

    async fn leave(&mut self, user_id: &UserId, now: Timestamp) -> Result<(), RoomError> {
        let events = self.room.leave(user_id, now)?;
        self.pusher.unregister_client(user_id, None).await;
        tracing::info!("'{}' left room '{}'", user_id, self.room.id());
        self.broadcast_events(&events, None).await;
        Ok(())
    }

    async fn end(&mut self, user_id: &UserId) -> Result<(), RoomError> {
        let events = self.room.end(user_id)?;
        tracing::info!("Room '{}' ended by '{}'", self.room.id(), user_id);
        self.broadcast_events(&events, None).await;
        Ok(())
    }

    async fn apply(
        &mut self,
        actor: &UserId,
        action: Action,
        now: Timestamp,
    ) -> Result<(), RoomError> {
        match action {
            Action::Join { username } => {
                if let Some(username) = username {
                    self.room.rename(actor, username)?;
                }
                self.send_room_state(actor).await;
            }
            Action::Leave => {
                self.send(actor, &OutboundMessage::Ack(Ack::of(ActionKind::Leave)))
                    .await;
                self.leave(actor, now).await?;
            }
            Action::Chat(text) => {
                let message = self.room.post_chat(actor, text, now)?;
                self.send(actor, &OutboundMessage::Ack(Ack::chat(&message)))
                    .await;
                self.broadcast_others(actor, &OutboundMessage::Chat(message))
                    .await;
            }
            Action::StrokeAdd(draft) => {
                let stroke = self.room.add_stroke(actor, draft)?;
                let ack = Ack::stroke(ActionKind::StrokeAdd, &stroke);
                self.send(actor, &OutboundMessage::Ack(ack)).await;
                self.broadcast_others(actor, &OutboundMessage::StrokeAdded(stroke))
                    .await;
            }
            Action::StrokeUndo => {
                let ack = match self.room.undo_last(actor)? {
                    Some(stroke) => {
                        let undo = OutboundMessage::StrokeUndone {
                            stroke_id: stroke.id.clone(),
                            sequence_number: stroke.sequence_number,
                            by: actor.clone(),
                        };
                        self.broadcast_others(actor, &undo).await;
                        Ack::stroke(ActionKind::StrokeUndo, &stroke)
                    }
                    None => Ack::of(ActionKind::StrokeUndo),
                };
                self.send(actor, &OutboundMessage::Ack(ack)).await;
            }
            Action::CanvasClear => {
                let removed = self.room.clear_all(actor)?;
                self.send(actor, &OutboundMessage::Ack(Ack::of(ActionKind::CanvasClear)))
                    .await;
                let clear = OutboundMessage::CanvasCleared {
                    by: actor.clone(),
                    removed,
                };
                self.broadcast_others(actor, &clear).await;
            }
            Action::MuteToggle { target } => {
                let is_muted = self.room.toggle_mute(actor, &target)?;
                self.send(actor, &OutboundMessage::Ack(Ack::of(ActionKind::MuteToggle)))
                    .await;
                let mute = OutboundMessage::MuteChanged {
                    user_id: target,
                    is_muted,
                    by: actor.clone(),
                };
                self.broadcast_others(actor, &mute).await;
            }
            Action::Promote { target } => {
                let events = self.room.promote(actor, &target, now)?;
                tracing::info!(
                    "'{}' promoted '{}' in room '{}'",
                    actor,
                    target,
                    self.room.id()
                );
                self.send(actor, &OutboundMessage::Ack(Ack::of(ActionKind::Promote)))
                    .await;
                self.broadcast_events(&events, None).await;
            }
            Action::Kick { target } => {
                let (_, events) = self.room.kick(actor, &target, now)?;
                tracing::info!(
                    "'{}' kicked '{}' from room '{}'",
                    actor,
                    target,
                    self.room.id()
                );
                let kick = OutboundMessage::Kicked {
                    user_id: target.clone(),
                    by: actor.clone(),
                };
                self.send(&target, &kick).await;
                self.pusher.unregister_client(&target, None).await;

                self.send(actor, &OutboundMessage::Ack(Ack::of(ActionKind::Kick)))
                    .await;
                self.broadcast_others(actor, &kick).await;
                let events: Vec<RoomEvent> = events
                    .into_iter()
                    .filter(|e| !matches!(e, RoomEvent::ParticipantLeft { .. }))
                    .collect();
                self.broadcast_events(&events, None).await;
            }
            Action::Speaking { is_speaking } => {
                if let Some(is_speaking) = self.room.set_speaking(actor, is_speaking)? {
                    let speaking = OutboundMessage::SpeakingChanged {
                        user_id: actor.clone(),
                        is_speaking,
                    };
                    self.broadcast_others(actor, &speaking).await;
                }
            }
            Action::Signal { to, data } => {
                let reachable = self.room.participant(&to).is_some_and(|p| p.is_connected());
                if !reachable {
                    return Err(RoomError::ParticipantNotFound(to.as_str().to_string()));
                }
                let relay = OutboundMessage::Signal {
                    from: actor.clone(),
                    data,
                };
                self.send(&to, &relay).await;
            }
            Action::Heartbeat { client_time } => {
                let beat = OutboundMessage::Heartbeat {
                    server_time: now,
                    client_time,
                };
                self.send(actor, &beat).await;
            }
        }
        Ok(())
    }

    async fn publish_tickers(&mut self) {
        let now = self.now();
        let snapshots = self.ticker.next_snapshots(now);
        let accepted = self.room.apply_tickers(snapshots);
        if accepted.is_empty() {
            return;
        }
        let update = OutboundMessage::Tickers(accepted);
        let targets = self.room.connected_ids(None);
        self.broadcast(targets, &update).await;
    }

    async fn sweep(&mut self) {
        let now = self.now();
        let events = self.room.sweep(now);
        if events.is_empty() {
            return;
        }
        for event in events.iter() {
            match event {
                RoomEvent::PresenceChanged { user_id, .. } => {
                    tracing::info!("'{}' missed heartbeats; marked disconnected", user_id);
                    self.pusher.unregister_client(user_id, None).await;
                }
                RoomEvent::ParticipantLeft { user_id, .. } => {
                    tracing::info!("'{}' removed after grace period", user_id);
                }
                _ => {}
            }
        }
        self.broadcast_events(&events, None).await;
    }

    async fn send_room_state(&self, user_id: &UserId) {
        let state = OutboundMessage::room_state(
            self.room.snapshot(),
            user_id.clone(),
            self.config.heartbeat_interval_ms(),
        );
        self.send(user_id, &state).await;
    }

    async fn send(&self, user_id: &UserId, message: &OutboundMessage) {
        if let Err(e) = self.pusher.push_to(user_id, message).await {
            tracing::warn!("Push to '{}' failed: {}", user_id, e);
        }
    }

    async fn broadcast(&self, targets: Vec<UserId>, message: &OutboundMessage) {
        if targets.is_empty() {
            return;
        }
        self.pusher.broadcast(targets, message).await;
    }

    async fn broadcast_others(&self, sender: &UserId, message: &OutboundMessage) {
        let targets = self.room.connected_ids(Some(sender));
        self.broadcast(targets, message).await;
    }

    async fn broadcast_events(&self, events: &[RoomEvent], exclude: Option<&UserId>) {
        let targets = self.room.connected_ids(exclude);
        for event in events {
            let message = OutboundMessage::Event {
                room_id: self.room.id().clone(),
                event: event.clone(),
            };
            self.broadcast(targets.clone(), &message).await;
        }
    }
}
