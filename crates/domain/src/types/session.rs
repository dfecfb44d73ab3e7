//! Session credentials and identity
//!
//! Owned by the application's session state. The pipeline reads
//! [`TokenState`] on every dispatch and replaces it only after a refresh call
//! succeeds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Current credentials
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl TokenState {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self { access_token: Some(access_token.into()), ..Self::default() }
    }

    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    #[must_use]
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Apply a refresh result
    ///
    /// The tenant is kept; the refresh token is only replaced when the server
    /// rotated it.
    pub fn apply(&mut self, refreshed: &RefreshedTokens) {
        self.access_token = Some(refreshed.access_token.clone());
        if let Some(rotated) = &refreshed.refresh_token {
            self.refresh_token = Some(rotated.clone());
        }
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Point-in-time view of the session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub tokens: TokenState,
    pub user: Option<UserIdentity>,
}

impl SessionSnapshot {
    pub fn new(tokens: TokenState, user: Option<UserIdentity>) -> Self {
        Self { tokens, user }
    }
}

/// Credentials returned by a successful refresh
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl RefreshedTokens {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token }
    }
}

impl fmt::Debug for RefreshedTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshedTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_keeps_tenant_and_unrotated_refresh_token() {
        let mut state = TokenState::new("old").with_refresh_token("r1").with_tenant("acme");
        state.apply(&RefreshedTokens::new("new", None));

        assert_eq!(state.access_token.as_deref(), Some("new"));
        assert_eq!(state.refresh_token.as_deref(), Some("r1"));
        assert_eq!(state.tenant_id.as_deref(), Some("acme"));
    }

    #[test]
    fn apply_rotates_refresh_token() {
        let mut state = TokenState::new("old").with_refresh_token("r1");
        state.apply(&RefreshedTokens::new("new", Some("r2".into())));
        assert_eq!(state.refresh_token.as_deref(), Some("r2"));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let state = TokenState::new("secret-access").with_refresh_token("secret-refresh");
        let rendered = format!("{state:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
