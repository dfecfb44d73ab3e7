//! Pipeline assembly from configuration

use std::sync::Arc;

use courier_core::{HttpPipeline, SessionAccessor};
use courier_domain::{ConfigError, PipelineConfig};
use tracing::info;

use crate::config;
use crate::http::ReqwestTransport;

/// Build an [`HttpPipeline`] over a [`ReqwestTransport`]
///
/// Validates `config` first; the refresh operation defaults to the token
/// endpoint at `config.refresh_path`.
///
/// # Errors
/// Returns `ConfigError` if validation fails or the HTTP client cannot be
/// created.
pub fn build_pipeline(
    config: PipelineConfig,
    session: Arc<dyn SessionAccessor>,
) -> Result<HttpPipeline, ConfigError> {
    config::validate(&config)?;
    let transport = ReqwestTransport::from_config(&config)?;
    info!(
        base_url = %transport.base_url(),
        timeout_ms = config.timeout_ms,
        "reqwest transport ready"
    );

    HttpPipeline::builder().config(config).transport(Arc::new(transport)).session(session).build()
}
