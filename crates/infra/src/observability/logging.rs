use courier_domain::LoggingConfig;
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Failure to install the global subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(String),
}

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` overrides `config.level` when set. An unparseable directive
/// falls back to `info`.
///
/// # Errors
/// Returns [`LoggingError::AlreadyInstalled`] when another subscriber was
/// installed first (common in tests); callers usually ignore it.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = if config.json {
        fmt().with_env_filter(filter).json().with_target(false).try_init()
    } else {
        fmt().with_env_filter(filter).with_target(false).compact().try_init()
    };

    installed.map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))
}
