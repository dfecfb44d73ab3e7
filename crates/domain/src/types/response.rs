//! Transport responses

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::NormalizedError;

/// Response returned by the transport for any HTTP status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, headers: BTreeMap::new(), body: body.into() }
    }

    /// Response with a serialized JSON body
    pub fn json_value(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string()).with_header("content-type", "application/json")
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Body parsed as JSON, or `None` for empty and non-JSON bodies
    pub fn body_json(&self) -> Option<Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Deserialize the body
    ///
    /// Empty bodies (204/205) are decoded from `null`, so `()` and `Option<T>`
    /// targets succeed.
    ///
    /// # Errors
    /// Returns a `TransportFailure` carrying the status when the body does not
    /// match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, NormalizedError> {
        let decoded = if self.body.is_empty() {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_slice(&self.body)
        };

        decoded.map_err(|e| {
            NormalizedError::http_status(self.status, format!("Failed to parse response: {e}"))
                .with_cause(e)
        })
    }
}
