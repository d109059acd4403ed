//! Command-line participant for Butai live rooms.
//!
//! Connects to a room over WebSocket, mirrors its state locally and turns
//! typed commands into room actions. Lost connections are retried with
//! bounded exponential backoff.

pub mod command;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod mirror;
mod runner;
mod session;
mod ui;

pub use runner::{ClientConfig, run_client};
