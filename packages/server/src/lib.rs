//! Butai live-session server library.
//!
//! Each room is owned by one session task. HTTP and WebSocket handlers in
//! the `ui` layer reach rooms through the `usecase` layer; the `domain`
//! layer holds the room rules and the `infrastructure` layer the wire
//! formats, delivery and storage.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
