//! Room sessions: one task per live room.

pub mod actor;
pub mod config;

pub use actor::{PusherFactory, RoomSpawner, TickerFeedFactory};
pub use config::SessionConfig;
