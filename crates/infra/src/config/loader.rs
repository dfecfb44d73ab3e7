//! Configuration loader
//!
//! Loads the pipeline configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. Reads a `.env` file into the environment if one exists
//! 2. Attempts to load from environment variables
//! 3. If `COURIER_BASE_URL` is not set, falls back to loading from file
//! 4. Probes multiple paths for config files (JSON and TOML)
//! 5. Validates the result before handing it out
//!
//! ## Environment Variables
//! - `COURIER_BASE_URL`: Base URL of the API (required)
//! - `COURIER_TIMEOUT_MS`: Per-request timeout in milliseconds
//! - `COURIER_REFRESH_PATH`: Path of the token refresh endpoint
//! - `COURIER_TENANT_HEADER`: Header carrying the tenant identifier
//! - `COURIER_UNAUTHORIZED_POLICY`: `refresh` or `logout`
//! - `COURIER_USER_AGENT`: User agent sent with every request
//! - `COURIER_LOG_LEVEL`: `EnvFilter` directive
//! - `COURIER_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./config.json` or `./config.toml` (current working directory)
//! 2. `./courier.json` or `./courier.toml` (current working directory)
//! 3. `../config.json` or `../config.toml` (parent directory)
//! 4. Relative to executable location

use std::path::{Path, PathBuf};

use courier_domain::{ConfigError, PipelineConfig, UnauthorizedPolicy};
use url::Url;

type Result<T> = std::result::Result<T, ConfigError>;

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `ConfigError` if:
/// - Configuration cannot be loaded from either source
/// - An environment variable or file holds an invalid value
/// - The loaded configuration fails [`validate`]
pub fn load() -> Result<PipelineConfig> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(e) => tracing::debug!(error = %e, "No .env file loaded"),
    }

    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(ConfigError::Missing(key)) => {
            tracing::debug!(%key, "Environment incomplete, trying file");
            load_from_file(None)
        }
        Err(e) => Err(e),
    }
}

/// Load configuration from environment variables
///
/// Only `COURIER_BASE_URL` is required; every other setting falls back to
/// its default.
///
/// # Errors
/// Returns `ConfigError::Missing` if `COURIER_BASE_URL` is unset, and
/// `ConfigError::Invalid` for unparseable values.
pub fn load_from_env() -> Result<PipelineConfig> {
    let mut config = PipelineConfig::new(env_var("COURIER_BASE_URL")?);

    if let Some(timeout) = env_opt("COURIER_TIMEOUT_MS") {
        config.timeout_ms = timeout
            .parse::<u64>()
            .map_err(|e| invalid("timeout_ms", format!("Invalid timeout: {e}")))?;
    }
    if let Some(path) = env_opt("COURIER_REFRESH_PATH") {
        config.refresh_path = path;
    }
    if let Some(header) = env_opt("COURIER_TENANT_HEADER") {
        config.tenant_header = header;
    }
    if let Some(policy) = env_opt("COURIER_UNAUTHORIZED_POLICY") {
        config.unauthorized_policy = policy
            .parse::<UnauthorizedPolicy>()
            .map_err(|e| invalid("unauthorized_policy", e))?;
    }
    config.user_agent = env_opt("COURIER_USER_AGENT");
    if let Some(level) = env_opt("COURIER_LOG_LEVEL") {
        config.logging.level = level;
    }
    config.logging.json = env_bool("COURIER_LOG_JSON", config.logging.json);

    validate(&config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ConfigError` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - The configuration fails [`validate`]
pub fn load_from_file(path: Option<PathBuf>) -> Result<PipelineConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::Io(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ConfigError::Missing(
                "config file (none found in any of the standard locations)".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::Io(e.to_string()))?;

    let config = parse_config(&contents, &config_path)?;
    validate(&config)?;
    Ok(config)
}

/// Check the settings the pipeline cannot run without
///
/// # Errors
/// Returns `ConfigError::Invalid` naming the first offending field.
pub fn validate(config: &PipelineConfig) -> Result<()> {
    let base_url = Url::parse(&config.base_url).map_err(|e| invalid("base_url", e.to_string()))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(invalid("base_url", format!("unsupported scheme '{}'", base_url.scheme())));
    }
    if base_url.host_str().is_none() {
        return Err(invalid("base_url", "missing host"));
    }
    if !config.refresh_path.starts_with('/') {
        return Err(invalid("refresh_path", "must start with '/'"));
    }
    if config.timeout_ms == 0 {
        return Err(invalid("timeout_ms", "must be greater than zero"));
    }
    if config.tenant_header.trim().is_empty() {
        return Err(invalid("tenant_header", "must not be empty"));
    }
    Ok(())
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<PipelineConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConfigError::Parse(format!("Invalid JSON format: {e}"))),
        _ => Err(ConfigError::Parse(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let names = ["config.json", "config.toml", "courier.json", "courier.toml"];
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(names.iter().map(|name| cwd.join(name)));
        candidates.extend(names.iter().take(2).map(|name| cwd.join("..").join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(names.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.to_string(), reason: reason.into() }
}

/// Get required environment variable
///
/// # Errors
/// Returns `ConfigError::Missing` if the variable is not set or blank.
fn env_var(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
