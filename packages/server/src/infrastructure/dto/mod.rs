//! Data Transfer Objects (DTOs) for the collaboration hub.
//!
//! DTOs are organized by protocol:
//! - `websocket`: signaling channel envelopes and payloads
//! - `http`: REST request and response bodies

pub mod conversion;
pub mod http;
pub mod websocket;
