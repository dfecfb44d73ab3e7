//! # Courier Infrastructure
//!
//! Infrastructure implementations of core pipeline ports.
//!
//! This crate contains:
//! - The reqwest-backed HTTP transport
//! - An in-memory session store with change notifications
//! - Configuration loading (environment, JSON, TOML)
//! - Logging subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `courier-core`
//! - Depends on `courier-domain` and `courier-core`
//! - Contains all "impure" code (sockets, files, environment)

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod session;

// Re-export commonly used items
pub use bootstrap::build_pipeline;
pub use errors::InfraError;
pub use http::{ReqwestTransport, ReqwestTransportBuilder};
pub use observability::init_tracing;
pub use session::{InMemorySession, SessionEvent};
