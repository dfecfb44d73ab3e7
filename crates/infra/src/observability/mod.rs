//! Observability infrastructure
//!
//! Structured logging for the request pipeline. Every component logs through
//! `tracing`; this module only installs the subscriber.

pub mod logging;

pub use logging::{init_tracing, LoggingError};
