//! Port interface for the HTTP transport
//!
//! The pipeline never opens sockets itself. Adapters implement this trait on
//! top of a real HTTP client.

use async_trait::async_trait;
use courier_domain::{ApiResponse, RequestDescriptor, Result};

/// Sends a fully prepared request
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response for any HTTP status
    ///
    /// Only connection-level problems (timeouts, refused connections, broken
    /// bodies) are errors, reported as `TransportFailure`. Non-2xx statuses
    /// are returned as responses so the pipeline can route 401s.
    async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse>;
}
