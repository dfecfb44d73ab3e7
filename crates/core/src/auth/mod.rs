//! Credentials for outgoing requests
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │     HttpPipeline     │
//! └──────────┬───────────┘
//!            │
//!            ├──► CredentialInjector   (bearer, tenant, security headers)
//!            └──► RefreshCoordinator   (single-flight refresh on 401)
//!                      │
//!                      ├──► RefreshOperation  (TokenEndpointRefresh by default)
//!                      └──► SessionAccessor   (token state + logout)
//! ```
//!
//! Only the coordinator writes to the session, and only after a refresh call
//! succeeds.

pub mod injector;
pub mod ports;
pub mod refresh;
pub mod token_endpoint;

pub use injector::CredentialInjector;
pub use ports::{RefreshOperation, SessionAccessor};
pub use refresh::{RefreshCoordinator, RefreshOutcome, RefreshPhase};
pub use token_endpoint::TokenEndpointRefresh;
