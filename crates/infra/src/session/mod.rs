//! Session adapters

pub mod memory;

pub use memory::{InMemorySession, SessionEvent};
