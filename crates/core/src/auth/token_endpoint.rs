//! Default refresh operation: POST the refresh token to the token endpoint

use async_trait::async_trait;
use courier_domain::constants::DEFAULT_REFRESH_PATH;
use courier_domain::{
    ApiResponse, NormalizedError, RefreshedTokens, RequestDescriptor, Result, TokenState,
};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::ports::RefreshOperation;
use crate::pipeline::RefreshClient;

/// Exchanges the refresh token for a new access token
///
/// Sends `{"refreshToken": "..."}` and accepts either camelCase or snake_case
/// token fields, optionally wrapped in a `data` envelope.
#[derive(Debug, Clone)]
pub struct TokenEndpointRefresh {
    path: String,
}

impl Default for TokenEndpointRefresh {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_PATH)
    }
}

impl TokenEndpointRefresh {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl RefreshOperation for TokenEndpointRefresh {
    #[instrument(skip_all, fields(path = %self.path))]
    async fn refresh(
        &self,
        client: RefreshClient<'_>,
        tokens: &TokenState,
    ) -> Result<RefreshedTokens> {
        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .ok_or_else(|| NormalizedError::auth_expired("no refresh token available"))?;

        let request = RequestDescriptor::post(self.path.as_str())
            .json_body(json!({ "refreshToken": refresh_token }));
        let response = client.send(request).await?;

        let refreshed = parse_refreshed_tokens(&response)?;
        debug!(rotated = refreshed.refresh_token.is_some(), "refresh endpoint issued new token");
        Ok(refreshed)
    }
}

fn parse_refreshed_tokens(response: &ApiResponse) -> Result<RefreshedTokens> {
    let body = response
        .body_json()
        .ok_or_else(|| NormalizedError::auth_expired("refresh response was not JSON"))?;
    let payload = body.get("data").filter(|data| data.is_object()).unwrap_or(&body);

    let access_token = string_field(payload, &["accessToken", "access_token"])
        .ok_or_else(|| NormalizedError::auth_expired("refresh response carried no access token"))?;
    let refresh_token = string_field(payload, &["refreshToken", "refresh_token"]);

    Ok(RefreshedTokens::new(access_token, refresh_token))
}

fn string_field(payload: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| payload.get(*name).and_then(Value::as_str))
        .find(|value| !value.is_empty())
        .map(str::to_string)
}
