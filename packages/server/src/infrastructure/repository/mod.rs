//! Room registry storage implementations.

pub mod inmemory;

pub use inmemory::InMemoryRoomRepository;
