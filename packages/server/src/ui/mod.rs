//! UI layer: HTTP and WebSocket entry points.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
