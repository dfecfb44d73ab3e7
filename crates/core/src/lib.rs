//! # Courier Core
//!
//! Request pipeline logic - no transport or storage dependencies.
//!
//! This crate contains:
//! - Request fingerprinting and in-flight deduplication
//! - Credential injection and response normalization
//! - The single-flight token refresh coordinator
//! - Port interfaces (transport, session, refresh operation)
//! - [`HttpPipeline`], the public `request` entry point
//!
//! ## Architecture Principles
//! - Only depends on `courier-domain`
//! - No sockets, TLS, or persisted storage
//! - All external collaborators via traits
//! - Fakes for every port make the pipeline testable in isolation

pub mod auth;
pub mod normalizer;
pub mod pipeline;
pub mod request;

// Re-export specific items to avoid ambiguity
pub use auth::ports::{RefreshOperation, SessionAccessor};
pub use auth::{CredentialInjector, RefreshCoordinator, RefreshPhase, TokenEndpointRefresh};
pub use normalizer::ResponseNormalizer;
pub use pipeline::ports::Transport;
pub use pipeline::{HttpPipeline, HttpPipelineBuilder, RefreshClient};
pub use request::{fingerprint, InFlightGuard, InFlightRegistry, RequestFingerprint};
