//! Credential injection
//!
//! Attaches the bearer token, tenant scope, and fixed security headers to a
//! request right before it is handed to the transport.

use chrono::{DateTime, Utc};
use courier_domain::constants::{
    AUTHORIZATION_HEADER, BEARER_PREFIX, CONTENT_TYPE_OPTIONS_HEADER, CONTENT_TYPE_OPTIONS_VALUE,
    DEFAULT_TENANT_HEADER, REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE, REQUEST_ID_HEADER,
    TIMESTAMP_HEADER,
};
use courier_domain::{RequestDescriptor, TokenState};
use uuid::Uuid;

/// Writes credential and security headers onto requests
#[derive(Debug, Clone)]
pub struct CredentialInjector {
    tenant_header: String,
}

impl Default for CredentialInjector {
    fn default() -> Self {
        Self::new(DEFAULT_TENANT_HEADER)
    }
}

impl CredentialInjector {
    pub fn new(tenant_header: impl Into<String>) -> Self {
        Self { tenant_header: tenant_header.into() }
    }

    pub fn tenant_header(&self) -> &str {
        &self.tenant_header
    }

    pub fn inject(&self, tokens: &TokenState, request: &mut RequestDescriptor) {
        self.inject_at(tokens, request, Utc::now());
    }

    /// Inject headers using `now` for the freshness timestamp
    ///
    /// A missing access token is not an error: unauthenticated endpoints
    /// (login, password reset) go out without `Authorization`.
    pub fn inject_at(
        &self,
        tokens: &TokenState,
        request: &mut RequestDescriptor,
        now: DateTime<Utc>,
    ) {
        if let Some(access_token) = &tokens.access_token {
            request.set_header(AUTHORIZATION_HEADER, format!("{BEARER_PREFIX}{access_token}"));
        }
        if let Some(tenant_id) = &tokens.tenant_id {
            request.set_header(self.tenant_header.as_str(), tenant_id.as_str());
        }

        request.set_header(CONTENT_TYPE_OPTIONS_HEADER, CONTENT_TYPE_OPTIONS_VALUE);
        request.set_header(REQUESTED_WITH_HEADER, REQUESTED_WITH_VALUE);
        request.set_header(TIMESTAMP_HEADER, now.timestamp_millis().to_string());
        request.set_header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());

        request.context.injected_token = tokens.access_token.clone();
    }
}
