//! HTTP pipeline with deduplication and refresh-then-replay
//!
//! Call flow for [`HttpPipeline::request`]:
//!
//! ```text
//! fingerprint ─► registry.enter ─► inject ─► transport.send
//!                     │                            │
//!                duplicate?                  401? ─┴─ other
//!                     │                       │         │
//!          DuplicateSuppressed      refresh coordinator  normalizer
//!                                          │
//!                                 replay once (attempt + 1)
//! ```

use std::sync::Arc;

use courier_domain::{
    ApiResponse, ConfigError, NormalizedError, PipelineConfig, RequestDescriptor, Result,
    UnauthorizedPolicy,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::ports::Transport;
use crate::auth::ports::{RefreshOperation, SessionAccessor};
use crate::auth::{CredentialInjector, RefreshCoordinator, RefreshPhase, TokenEndpointRefresh};
use crate::normalizer::ResponseNormalizer;
use crate::request::{fingerprint, InFlightRegistry};

struct PipelineInner {
    config: PipelineConfig,
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionAccessor>,
    refresher: Arc<dyn RefreshOperation>,
    registry: Arc<InFlightRegistry>,
    coordinator: Arc<RefreshCoordinator>,
    injector: CredentialInjector,
    normalizer: ResponseNormalizer,
    /// Access token whose rejection already ended the session
    ended_token: Mutex<Option<String>>,
}

/// Shared request pipeline
///
/// Cheap to clone; clones share the in-flight registry and the refresh
/// coordinator, so build one per session and hand out clones.
#[derive(Clone)]
pub struct HttpPipeline {
    inner: Arc<PipelineInner>,
}

impl HttpPipeline {
    /// Create a builder for fluent configuration
    pub fn builder() -> HttpPipelineBuilder {
        HttpPipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Number of requests currently registered in flight
    pub fn in_flight(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn refresh_phase(&self) -> RefreshPhase {
        self.inner.coordinator.phase()
    }

    /// Number of refresh cycles started by this pipeline
    pub fn refresh_cycles(&self) -> u64 {
        self.inner.coordinator.cycles_started()
    }

    /// Execute a request
    ///
    /// # Errors
    ///
    /// - `DuplicateSuppressed` when an identical request is still in flight
    /// - `LogicalFailure` for 2xx bodies flagged with `"success": false`
    /// - `TransportFailure` for connection failures and non-2xx statuses,
    ///   including a 401 on a request sent without credentials
    /// - `AuthExpired` when a 401 could not be recovered by a refresh
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn request(&self, request: RequestDescriptor) -> Result<ApiResponse> {
        let key = fingerprint(&request);
        let Some(_guard) = self.inner.registry.enter(&key) else {
            warn!(fingerprint = %key, "duplicate request suppressed");
            return Err(NormalizedError::duplicate(key.as_str()));
        };

        self.execute(request).await
    }

    /// GET `url` and deserialize the JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, url: impl Into<String>) -> Result<T> {
        self.request(RequestDescriptor::get(url)).await?.json()
    }

    /// POST `body` as JSON to `url` and deserialize the JSON response
    pub async fn post_json<B, T>(&self, url: impl Into<String>, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let request = RequestDescriptor::post(url).json(body).map_err(|e| {
            NormalizedError::transport(format!("Failed to serialize body: {e}")).with_cause(e)
        })?;
        self.request(request).await?.json()
    }

    async fn execute(&self, mut request: RequestDescriptor) -> Result<ApiResponse> {
        loop {
            let response = self.dispatch(&mut request).await?;
            if !response.is_unauthorized() {
                return self.inner.normalizer.normalize(response);
            }
            request = self.handle_unauthorized(&request, &response).await?;
        }
    }

    async fn dispatch(&self, request: &mut RequestDescriptor) -> Result<ApiResponse> {
        let snapshot = self.inner.session.state().await;
        self.inner.injector.inject(&snapshot.tokens, request);

        debug!(
            attempt = request.context.attempt,
            refresh_call = request.is_refresh_call(),
            "dispatching"
        );
        self.inner.transport.send(request).await
    }

    /// Decide what a 401 turns into: a replayable request or a terminal error
    ///
    /// Only a request that carried the session's current token may end the
    /// session, and each token ends it at most once.
    async fn handle_unauthorized(
        &self,
        sent: &RequestDescriptor,
        response: &ApiResponse,
    ) -> Result<RequestDescriptor> {
        let inner = &self.inner;

        if sent.is_refresh_call() {
            // Surfaced to the coordinator, which performs the logout.
            return Err(NormalizedError::auth_expired("refresh token rejected"));
        }

        let current = inner.session.state().await.tokens.access_token;
        let injected = sent.context.injected_token.as_deref();
        let token = match (current.as_deref(), injected) {
            (None, None) => {
                debug!(url = %sent.url, "401 on an unauthenticated request");
                return Err(inner.normalizer.status_error(response));
            }
            (None, Some(_)) => {
                debug!(url = %sent.url, "session ended while request was in flight");
                return Err(NormalizedError::auth_expired("session is no longer active"));
            }
            (Some(current), injected) if Some(current) != injected => {
                return self.replay_with_newer_token(sent);
            }
            (Some(current), _) => current,
        };

        if inner.config.unauthorized_policy == UnauthorizedPolicy::Logout {
            warn!(url = %sent.url, "401 received, terminating session");
            self.end_session(token).await;
            return Err(NormalizedError::auth_expired("session rejected by server"));
        }

        if inner.config.is_refresh_url(&sent.url) {
            warn!(url = %sent.url, "refresh endpoint rejected outside a refresh cycle");
            self.end_session(token).await;
            return Err(NormalizedError::auth_expired("refresh endpoint rejected the session"));
        }

        if !sent.context.can_retry() {
            warn!(url = %sent.url, attempt = sent.context.attempt, "401 after token refresh");
            self.end_session(token).await;
            return Err(NormalizedError::auth_expired("request rejected after token refresh"));
        }

        let pipeline = self.clone();
        inner
            .coordinator
            .refresh(move || async move {
                let snapshot = pipeline.inner.session.state().await;
                let client = RefreshClient::new(&pipeline);
                pipeline.inner.refresher.refresh(client, &snapshot.tokens).await
            })
            .await?;

        debug!(url = %sent.url, "replaying after refresh");
        Ok(sent.for_retry())
    }

    /// The session moved on since dispatch; the 401 belongs to an old token
    fn replay_with_newer_token(&self, sent: &RequestDescriptor) -> Result<RequestDescriptor> {
        if self.inner.config.unauthorized_policy == UnauthorizedPolicy::Logout
            || !sent.context.can_retry()
        {
            debug!(url = %sent.url, "401 for a superseded token");
            return Err(NormalizedError::auth_expired("request rejected with a superseded token"));
        }

        debug!(url = %sent.url, "token changed since dispatch, replaying");
        Ok(sent.for_retry())
    }

    /// Log out once per rejected token
    async fn end_session(&self, token: &str) {
        {
            let mut ended = self.inner.ended_token.lock();
            if ended.as_deref() == Some(token) {
                debug!("session already ended for this token");
                return;
            }
            *ended = Some(token.to_string());
        }
        self.inner.session.logout().await;
    }
}

/// Pipeline handle given to a [`RefreshOperation`]
///
/// Requests sent through it are marked as the refresh call: they still pass
/// through deduplication and credential injection, but a 401 on them fails the
/// refresh instead of starting a nested cycle.
#[derive(Clone, Copy)]
pub struct RefreshClient<'a> {
    pipeline: &'a HttpPipeline,
}

impl<'a> RefreshClient<'a> {
    pub(crate) fn new(pipeline: &'a HttpPipeline) -> Self {
        Self { pipeline }
    }

    pub fn config(&self) -> &PipelineConfig {
        self.pipeline.config()
    }

    pub async fn send(&self, mut request: RequestDescriptor) -> Result<ApiResponse> {
        request.context.refresh_call = true;
        self.pipeline.request(request).await
    }
}

/// Builder for [`HttpPipeline`]
#[derive(Default)]
pub struct HttpPipelineBuilder {
    config: Option<PipelineConfig>,
    transport: Option<Arc<dyn Transport>>,
    session: Option<Arc<dyn SessionAccessor>>,
    refresher: Option<Arc<dyn RefreshOperation>>,
}

impl HttpPipelineBuilder {
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn session(mut self, session: Arc<dyn SessionAccessor>) -> Self {
        self.session = Some(session);
        self
    }

    /// Override the refresh operation
    ///
    /// Defaults to [`TokenEndpointRefresh`] against `config.refresh_path`.
    pub fn refresh_operation(mut self, refresher: Arc<dyn RefreshOperation>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Build the pipeline
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if config, transport, or session were
    /// not provided.
    pub fn build(self) -> std::result::Result<HttpPipeline, ConfigError> {
        let config = self.config.ok_or_else(|| ConfigError::Missing("config".to_string()))?;
        let transport =
            self.transport.ok_or_else(|| ConfigError::Missing("transport".to_string()))?;
        let session = self.session.ok_or_else(|| ConfigError::Missing("session".to_string()))?;
        let refresher = self.refresher.unwrap_or_else(|| {
            Arc::new(TokenEndpointRefresh::new(config.refresh_path.clone()))
        });

        info!(
            base_url = %config.base_url,
            policy = %config.unauthorized_policy,
            refresh_path = %config.refresh_path,
            "request pipeline ready"
        );

        Ok(HttpPipeline {
            inner: Arc::new(PipelineInner {
                injector: CredentialInjector::new(config.tenant_header.clone()),
                coordinator: Arc::new(RefreshCoordinator::new(Arc::clone(&session))),
                registry: Arc::new(InFlightRegistry::new()),
                normalizer: ResponseNormalizer::new(),
                ended_token: Mutex::new(None),
                config,
                transport,
                session,
                refresher,
            }),
        })
    }
}
