//! Pipeline configuration structures

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_REFRESH_PATH, DEFAULT_TENANT_HEADER, DEFAULT_TIMEOUT_MS};
use crate::impl_domain_enum_conversions;

/// What the pipeline does when a request is rejected with 401
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnauthorizedPolicy {
    /// Single-flight refresh, then replay each rejected request once
    #[default]
    Refresh,
    /// Terminate the session immediately
    Logout,
}

impl_domain_enum_conversions!(UnauthorizedPolicy {
    Refresh => "refresh",
    Logout => "logout",
});

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `courier_core=debug`
    pub level: String,
    /// Emit JSON lines instead of compact text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// Request pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL that relative request URLs are resolved against
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Path of the token refresh endpoint, relative to `base_url`
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    #[serde(default = "default_tenant_header")]
    pub tenant_header: String,
    #[serde(default)]
    pub unauthorized_policy: UnauthorizedPolicy,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_tenant_header() -> String {
    DEFAULT_TENANT_HEADER.to_string()
}

impl PipelineConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            refresh_path: default_refresh_path(),
            tenant_header: default_tenant_header(),
            unauthorized_policy: UnauthorizedPolicy::default(),
            user_agent: None,
            logging: LoggingConfig::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Whether `url` addresses the refresh endpoint
    ///
    /// Accepts both the bare path and the path joined to `base_url`; any query
    /// string is ignored.
    pub fn is_refresh_url(&self, url: &str) -> bool {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        if path == self.refresh_path {
            return true;
        }
        path.strip_prefix(self.base_url.trim_end_matches('/'))
            .is_some_and(|rest| rest == self.refresh_path)
    }
}
