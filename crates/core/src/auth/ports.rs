//! Port interfaces for session state and token refresh
//!
//! These traits define the boundaries between the pipeline and the
//! application code that owns the session.

use async_trait::async_trait;
use courier_domain::{RefreshedTokens, Result, SessionSnapshot, TokenState};

use crate::pipeline::RefreshClient;

/// Read/write view over the current session
#[async_trait]
pub trait SessionAccessor: Send + Sync {
    /// Current tokens and user identity
    async fn state(&self) -> SessionSnapshot;

    /// Replace the access token (and the refresh token when rotated)
    async fn store_tokens(&self, tokens: RefreshedTokens);

    /// Clear the session, revoke local credentials, and notify the application
    async fn logout(&self);
}

/// Application-supplied token refresh
#[async_trait]
pub trait RefreshOperation: Send + Sync {
    /// Obtain a new access token
    ///
    /// Requests must be sent through `client`, which marks them as the refresh
    /// call so that a 401 on them never starts a nested refresh cycle.
    async fn refresh(&self, client: RefreshClient<'_>, tokens: &TokenState)
        -> Result<RefreshedTokens>;
}
