//! Chat log: append-only, server-timestamped messages of one room.

use std::collections::{HashMap, VecDeque};

use super::{
    entity::ChatMessage,
    error::RoomError,
    value_object::{ChatText, Timestamp, UserId},
};

/// Per-sender chat rate limit: at most `max_messages` within `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatRateLimit {
    pub max_messages: usize,
    pub window_ms: i64,
}

impl Default for ChatRateLimit {
    fn default() -> Self {
        Self {
            max_messages: 10,
            window_ms: 10_000,
        }
    }
}

/// Ordered chat messages of a room.
///
/// Messages are ordered by server receipt. Only the most recent
/// `retention` messages are kept for join snapshots.
#[derive(Debug, Clone)]
pub struct ChatLog {
    messages: VecDeque<ChatMessage>,
    retention: usize,
    rate_limit: ChatRateLimit,
    recent_sends: HashMap<UserId, VecDeque<Timestamp>>,
}

impl ChatLog {
    pub fn new(retention: usize, rate_limit: ChatRateLimit) -> Self {
        Self {
            messages: VecDeque::new(),
            retention: retention.max(1),
            rate_limit,
            recent_sends: HashMap::new(),
        }
    }

    /// Append a participant's message, enforcing the rate limit.
    pub fn append(
        &mut self,
        sender_id: UserId,
        text: ChatText,
        now: Timestamp,
    ) -> Result<&ChatMessage, RoomError> {
        let window = self.rate_limit.window_ms;
        let sends = self.recent_sends.entry(sender_id.clone()).or_default();
        while sends
            .front()
            .is_some_and(|sent| now.millis_since(*sent) >= window)
        {
            sends.pop_front();
        }
        if sends.len() >= self.rate_limit.max_messages {
            return Err(RoomError::RateLimited(sender_id.into_string()));
        }
        sends.push_back(now);

        Ok(self.push(ChatMessage::new(sender_id, text, now)))
    }

    /// Append a room notice. System messages bypass the rate limit.
    pub fn append_system(&mut self, subject: UserId, text: String, now: Timestamp) -> &ChatMessage {
        self.push(ChatMessage::system(subject, text, now))
    }

    fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        if self.messages.len() == self.retention {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Forget rate-limit bookkeeping for a participant that left.
    pub fn forget_sender(&mut self, sender_id: &UserId) {
        self.recent_sends.remove(sender_id);
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
