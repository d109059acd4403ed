//! Ticker feed implementations.

pub mod random_walk;

pub use random_walk::RandomWalkFeed;
