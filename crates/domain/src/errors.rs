//! Error types surfaced by the request pipeline
//!
//! Every failed call resolves to a [`NormalizedError`] whose [`ErrorKind`] is
//! one of four values. Callers branch on the kind, never on transport status
//! codes.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::impl_domain_enum_conversions;

/// The four failure kinds a pipeline call can end in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Refresh failed or was impossible; the session has been terminated.
    AuthExpired,
    /// The server answered 2xx but the payload reports a business failure.
    LogicalFailure,
    /// Network failure, timeout, or a non-401 HTTP error status.
    TransportFailure,
    /// An identical request is already in flight; nothing was sent.
    DuplicateSuppressed,
}

impl_domain_enum_conversions!(ErrorKind {
    AuthExpired => "auth_expired",
    LogicalFailure => "logical_failure",
    TransportFailure => "transport_failure",
    DuplicateSuppressed => "duplicate_suppressed",
});

/// Underlying cause kept for diagnostics
pub type ErrorCause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Field-level validation messages keyed by form field
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Structured pipeline failure
///
/// Cloneable so that a single refresh outcome can be handed to every request
/// waiting on it.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct NormalizedError {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    field_errors: FieldErrors,
    #[source]
    cause: Option<ErrorCause>,
}

impl NormalizedError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            field_errors: FieldErrors::new(),
            cause: None,
        }
    }

    /// Duplicate of an in-flight request
    pub fn duplicate(fingerprint: &str) -> Self {
        Self::new(
            ErrorKind::DuplicateSuppressed,
            format!("identical request already in flight: {fingerprint}"),
        )
    }

    /// Session terminated after a failed or impossible refresh
    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthExpired, message).with_status(401)
    }

    /// Business failure reported inside a successful response
    pub fn logical_failure(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LogicalFailure, message).with_status(status)
    }

    /// Connection-level failure with no HTTP status
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportFailure, message)
    }

    /// Non-2xx response, including a 401 on a request sent without credentials
    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransportFailure, message).with_status(status)
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_field_errors(mut self, field_errors: FieldErrors) -> Self {
        self.field_errors = field_errors;
        self
    }

    #[must_use]
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status that produced this error, if any
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }

    /// Duplicates usually mean "ignore, the first call will complete"
    pub fn is_duplicate(&self) -> bool {
        self.kind == ErrorKind::DuplicateSuppressed
    }

    /// True when the session is gone and the caller should stop retrying
    pub fn is_terminal(&self) -> bool {
        self.kind == ErrorKind::AuthExpired
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(String),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Failed to read config file: {0}")]
    Io(String),

    #[error("Invalid config format: {0}")]
    Parse(String),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, NormalizedError>;
