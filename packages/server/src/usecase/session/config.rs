//! Runtime tunables shared by every room session.

use std::time::Duration;

use crate::domain::{ChatRateLimit, LivenessPolicy, RoomSettings};

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Interval advertised to clients for their heartbeats
    pub heartbeat_interval: Duration,
    /// Connected participants silent for longer are marked disconnected
    pub heartbeat_timeout: Duration,
    /// How long a disconnected participant keeps its slot
    pub grace_period: Duration,
    /// How often the liveness sweep runs
    pub sweep_interval: Duration,
    pub ticker_interval: Duration,
    /// Capacity of each connection's outbound queue
    pub outbound_queue_capacity: usize,
    /// Capacity of each room's command mailbox
    pub mailbox_capacity: usize,
    /// Malformed frames tolerated before a connection is closed
    pub malformed_threshold: u32,
    /// Capacity used when a room is created without one
    pub default_max_participants: i64,
    pub chat_rate_limit: ChatRateLimit,
    pub chat_retention: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(15),
            heartbeat_timeout: Duration::from_secs(30),
            grace_period: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(1),
            ticker_interval: Duration::from_millis(2_000),
            outbound_queue_capacity: 256,
            mailbox_capacity: 1_024,
            malformed_threshold: 5,
            default_max_participants: 50,
            chat_rate_limit: ChatRateLimit::default(),
            chat_retention: 500,
        }
    }
}

impl SessionConfig {
    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            liveness: LivenessPolicy {
                heartbeat_timeout_ms: millis(self.heartbeat_timeout),
                grace_period_ms: millis(self.grace_period),
            },
            chat_retention: self.chat_retention,
            chat_rate_limit: self.chat_rate_limit,
        }
    }

    pub fn heartbeat_interval_ms(&self) -> u64 {
        u64::try_from(self.heartbeat_interval.as_millis()).unwrap_or(u64::MAX)
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
