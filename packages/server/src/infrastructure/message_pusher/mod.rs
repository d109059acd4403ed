//! Message delivery implementations.
//!
//! - `websocket`: bounded per-connection queues drained by WebSocket push loops

pub mod websocket;

pub use websocket::WebSocketMessagePusher;
