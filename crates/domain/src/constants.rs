//! Pipeline constants
//!
//! Header names, fixed header values and defaults used by the request
//! pipeline.

// Credential headers
pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const BEARER_PREFIX: &str = "Bearer ";
pub const DEFAULT_TENANT_HEADER: &str = "X-Tenant-Id";

// Security headers attached to every request
pub const CONTENT_TYPE_OPTIONS_HEADER: &str = "X-Content-Type-Options";
pub const CONTENT_TYPE_OPTIONS_VALUE: &str = "nosniff";
pub const REQUESTED_WITH_HEADER: &str = "X-Requested-With";
pub const REQUESTED_WITH_VALUE: &str = "XMLHttpRequest";
pub const TIMESTAMP_HEADER: &str = "X-Request-Timestamp";
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

// Retry and refresh
pub const MAX_RETRY_ATTEMPTS: u8 = 1;
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh";

// Transport
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

// Normalization
pub const LOGICAL_FAILURE_FALLBACK_MESSAGE: &str = "Request failed";
pub const STREAM_FINGERPRINT_PREFIX: &str = "stream:";
