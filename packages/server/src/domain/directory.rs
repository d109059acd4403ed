//! Participant directory: membership, roles and connection state of one room.

use super::{
    entity::{ConnectionState, Participant, Role},
    error::RoomError,
    value_object::{Capacity, ConnectionId, Timestamp, UserId},
};

/// Liveness timeouts applied by [`ParticipantDirectory::expire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessPolicy {
    /// Connected participants silent for longer than this are marked disconnected
    pub heartbeat_timeout_ms: i64,
    /// Disconnected (or never connected) participants are removed after this
    pub grace_period_ms: i64,
}

/// Result of a liveness sweep.
#[derive(Debug, Default, PartialEq)]
pub struct Expiry {
    /// Participants that just went from Connected to Disconnected
    pub disconnected: Vec<UserId>,
    /// Participants removed because their grace period ran out
    pub removed: Vec<Participant>,
}

/// How a connection was bound to a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// First connection after admission
    Fresh,
    /// Returned within the grace period
    Reconnected,
    /// Replaced a connection that was still considered live
    Superseded(ConnectionId),
}

/// Ordered set of participants.
///
/// Participants are kept in admission order, which doubles as tenure order
/// for host succession.
#[derive(Debug, Clone, Default)]
pub struct ParticipantDirectory {
    participants: Vec<Participant>,
}

impl ParticipantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a participant, checking capacity and duplicates in one step.
    pub fn admit(
        &mut self,
        participant: Participant,
        capacity: Capacity,
        room_id: &str,
    ) -> Result<&Participant, RoomError> {
        if self.contains(&participant.id) {
            return Err(RoomError::AlreadyJoined(participant.id.into_string()));
        }
        if !capacity.admits(self.participants.len()) {
            return Err(RoomError::RoomFull {
                room_id: room_id.to_string(),
                max_participants: capacity.value(),
            });
        }
        self.participants.push(participant);
        Ok(&self.participants[self.participants.len() - 1])
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.participants.iter().any(|p| &p.id == user_id)
    }

    pub fn get(&self, user_id: &UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == user_id)
    }

    pub fn get_mut(&mut self, user_id: &UserId) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| &p.id == user_id)
    }

    /// Look up a participant or fail with `ParticipantNotFound`.
    pub fn require(&self, user_id: &UserId) -> Result<&Participant, RoomError> {
        self.get(user_id)
            .ok_or_else(|| RoomError::ParticipantNotFound(user_id.as_str().to_string()))
    }

    pub fn require_mut(&mut self, user_id: &UserId) -> Result<&mut Participant, RoomError> {
        self.get_mut(user_id)
            .ok_or_else(|| RoomError::ParticipantNotFound(user_id.as_str().to_string()))
    }

    pub fn remove(&mut self, user_id: &UserId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| &p.id == user_id)?;
        Some(self.participants.remove(index))
    }

    pub fn host(&self) -> Option<&Participant> {
        self.participants.iter().find(|p| p.is_host())
    }

    pub fn host_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_host()).count()
    }

    /// Remaining participant with the earliest `joined_at`; admission order breaks ties.
    pub fn longest_tenured(&self) -> Option<&Participant> {
        self.participants
            .iter()
            .enumerate()
            .min_by_key(|(index, p)| (p.joined_at, *index))
            .map(|(_, p)| p)
    }

    /// Make `user_id` the only host. Returns the previous host, if any.
    pub fn transfer_host(&mut self, user_id: &UserId) -> Result<Option<UserId>, RoomError> {
        self.require(user_id)?;
        let mut previous = None;
        for participant in self.participants.iter_mut() {
            if &participant.id == user_id {
                participant.role = Role::Host;
            } else if participant.is_host() {
                participant.role = Role::Viewer;
                previous = Some(participant.id.clone());
            }
        }
        Ok(previous)
    }

    /// Bind a new transport connection to an admitted participant.
    ///
    /// The participant's role is left untouched, so a returning host is
    /// still the host. A returning participant moves from `Disconnected` to
    /// `Connected` within this call; `Reconnecting` is never stored.
    pub fn bind_connection(
        &mut self,
        user_id: &UserId,
        connection_id: ConnectionId,
        now: Timestamp,
    ) -> Result<Binding, RoomError> {
        let participant = self.require_mut(user_id)?;
        let binding = match participant.connection_state {
            ConnectionState::Connecting => Binding::Fresh,
            ConnectionState::Disconnected | ConnectionState::Reconnecting => Binding::Reconnected,
            ConnectionState::Connected => match participant.connection_id {
                Some(previous) => Binding::Superseded(previous),
                None => Binding::Fresh,
            },
        };
        participant.connection_state = ConnectionState::Connected;
        participant.connection_id = Some(connection_id);
        participant.disconnected_at = None;
        participant.last_seen_at = now;
        Ok(binding)
    }

    /// Mark a participant disconnected if `connection_id` is still its current one.
    ///
    /// Returns `false` for stale connections and for participants that were
    /// not connected.
    pub fn mark_disconnected(
        &mut self,
        user_id: &UserId,
        connection_id: ConnectionId,
        now: Timestamp,
    ) -> bool {
        let Some(participant) = self.get_mut(user_id) else {
            return false;
        };
        if participant.connection_id != Some(connection_id)
            || participant.connection_state != ConnectionState::Connected
        {
            return false;
        }
        Self::disconnect(participant, now);
        true
    }

    fn disconnect(participant: &mut Participant, now: Timestamp) {
        participant.connection_state = ConnectionState::Disconnected;
        participant.connection_id = None;
        participant.disconnected_at = Some(now);
        participant.is_speaking = false;
    }

    /// Record liveness for a participant.
    pub fn touch(&mut self, user_id: &UserId, now: Timestamp) -> Result<(), RoomError> {
        let participant = self.require_mut(user_id)?;
        participant.last_seen_at = now;
        Ok(())
    }

    /// Apply heartbeat timeouts and grace-period expiry.
    pub fn expire(&mut self, now: Timestamp, policy: LivenessPolicy) -> Expiry {
        let mut expiry = Expiry::default();

        for participant in self.participants.iter_mut() {
            if participant.is_connected()
                && now.millis_since(participant.last_seen_at) > policy.heartbeat_timeout_ms
            {
                Self::disconnect(participant, now);
                expiry.disconnected.push(participant.id.clone());
            }
        }

        let (expired, kept): (Vec<Participant>, Vec<Participant>) =
            std::mem::take(&mut self.participants)
                .into_iter()
                .partition(|p| match p.connection_state {
                    ConnectionState::Disconnected => p
                        .disconnected_at
                        .is_some_and(|at| now.millis_since(at) > policy.grace_period_ms),
                    ConnectionState::Connecting => {
                        now.millis_since(p.joined_at) > policy.grace_period_ms
                    }
                    _ => false,
                });
        self.participants = kept;
        expiry.removed = expired;
        expiry
    }

    /// Ids of connected participants, optionally excluding one.
    pub fn connected_ids(&self, exclude: Option<&UserId>) -> Vec<UserId> {
        self.participants
            .iter()
            .filter(|p| p.is_connected() && Some(&p.id) != exclude)
            .map(|p| p.id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }
}
