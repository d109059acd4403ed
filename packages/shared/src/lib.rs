//! Utilities shared by the Butai server and client.

pub mod logger;
pub mod time;
