//! Outgoing request descriptors
//!
//! A [`RequestDescriptor`] is created per call, mutated only by credential
//! injection, and discarded after dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::constants::MAX_RETRY_ATTEMPTS;

/// HTTP method of an outgoing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnsupportedMethod(pub String);

impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

/// Query parameters, kept sorted by key
pub type QueryParams = BTreeMap<String, Value>;

/// Opaque binary payload such as a file upload
///
/// The identity is assigned at creation and survives cloning, so two handles
/// to the same stream compare as the same logical body while two separate
/// uploads never do.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamBody {
    identity: Uuid,
    content_type: String,
    bytes: Vec<u8>,
}

impl StreamBody {
    pub fn new(content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { identity: Uuid::new_v4(), content_type: content_type.into(), bytes }
    }

    pub fn identity(&self) -> Uuid {
        self.identity
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for StreamBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBody")
            .field("identity", &self.identity)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Request payload
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Text(String),
    Form(BTreeMap<String, String>),
    Stream(StreamBody),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Per-call bookkeeping carried alongside the descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Number of replays already performed for this call
    pub attempt: u8,
    /// Set on the request issued by the refresh operation itself
    pub refresh_call: bool,
    /// Access token attached by credential injection, if any
    pub injected_token: Option<String>,
}

impl RequestContext {
    pub fn can_retry(&self) -> bool {
        self.attempt < MAX_RETRY_ATTEMPTS
    }
}

/// A request as handed to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub params: QueryParams,
    pub body: RequestBody,
    pub headers: BTreeMap<String, String>,
    pub context: RequestContext,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            params: QueryParams::new(),
            body: RequestBody::Empty,
            headers: BTreeMap::new(),
            context: RequestContext::default(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new(Method::Patch, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn json_body(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    /// Serialize `body` as the JSON payload
    ///
    /// # Errors
    /// Returns the serializer error if `body` cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(body)?;
        Ok(self.json_body(value))
    }

    #[must_use]
    pub fn text_body(mut self, body: impl Into<String>) -> Self {
        self.body = RequestBody::Text(body.into());
        self
    }

    #[must_use]
    pub fn form_body(mut self, fields: BTreeMap<String, String>) -> Self {
        self.body = RequestBody::Form(fields);
        self
    }

    #[must_use]
    pub fn stream_body(mut self, stream: StreamBody) -> Self {
        self.body = RequestBody::Stream(stream);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Insert or replace a header, matching existing names case-insensitively
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_refresh_call(&self) -> bool {
        self.context.refresh_call
    }

    /// Copy of this descriptor for a replay after refresh
    ///
    /// Credential headers are re-injected on dispatch, so the replay keeps the
    /// caller's headers and bumps the attempt counter.
    #[must_use]
    pub fn for_retry(&self) -> Self {
        let mut retry = self.clone();
        retry.context.attempt = self.context.attempt.saturating_add(1);
        retry.context.injected_token = None;
        retry
    }
}
