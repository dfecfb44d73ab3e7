//! Shared test helpers for `courier-core` integration tests.
//!
//! Fakes for the transport and session ports so pipeline tests can script
//! server behaviour without sockets.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{HttpPipeline, SessionAccessor, Transport};
use courier_domain::{
    ApiResponse, PipelineConfig, RefreshedTokens, RequestDescriptor, Result as DomainResult,
    SessionSnapshot, TokenState,
};
use parking_lot::Mutex;
use serde_json::json;

type Responder = dyn Fn(&RequestDescriptor) -> DomainResult<ApiResponse> + Send + Sync;

/// Transport whose responses are produced by a closure.
///
/// Every call is recorded (with the headers the pipeline injected) before the
/// simulated network delay, so counts include calls still in progress.
pub struct ScriptedTransport {
    responder: Box<Responder>,
    log: Mutex<Vec<RequestDescriptor>>,
    delay: Duration,
}

impl ScriptedTransport {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> ApiResponse + Send + Sync + 'static,
    {
        Self::fallible(move |request| Ok(responder(request)))
    }

    pub fn fallible<F>(responder: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> DomainResult<ApiResponse> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            log: Mutex::new(Vec::new()),
            delay: Duration::from_millis(20),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.log.lock().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.log.lock().iter().filter(|request| request.url == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.log.lock().len()
    }

    /// Authorization headers sent to `url`, in dispatch order
    pub fn bearers_for(&self, url: &str) -> Vec<Option<String>> {
        self.log
            .lock()
            .iter()
            .filter(|request| request.url == url)
            .map(|request| request.header_value("Authorization").map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> DomainResult<ApiResponse> {
        self.log.lock().push(request.clone());
        tokio::time::sleep(self.delay).await;
        (self.responder)(request)
    }
}

/// Session fake that counts writes and logouts.
#[derive(Default)]
pub struct FakeSession {
    snapshot: Mutex<SessionSnapshot>,
    stores: AtomicUsize,
    logouts: AtomicUsize,
}

impl FakeSession {
    pub fn new(tokens: TokenState) -> Self {
        let session = Self::default();
        session.snapshot.lock().tokens = tokens;
        session
    }

    /// Session holding access token `old` and refresh token `r1`
    pub fn signed_in() -> Self {
        Self::new(TokenState::new("old").with_refresh_token("r1").with_tenant("acme"))
    }

    /// Replace the access token out of band, as another tab or task would
    pub fn set_access_token(&self, token: &str) {
        self.snapshot.lock().tokens.access_token = Some(token.to_string());
    }

    pub fn tokens(&self) -> TokenState {
        self.snapshot.lock().tokens.clone()
    }

    pub fn stores(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionAccessor for FakeSession {
    async fn state(&self) -> SessionSnapshot {
        self.snapshot.lock().clone()
    }

    async fn store_tokens(&self, tokens: RefreshedTokens) {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.snapshot.lock().tokens.apply(&tokens);
    }

    async fn logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        self.snapshot.lock().tokens = TokenState::default();
    }
}

pub const REFRESH_PATH: &str = "/auth/refresh";

/// Server accepting only `Bearer <valid>`; the refresh endpoint rotates
/// `valid` to `new`.
pub fn token_gated_server(valid: Arc<Mutex<String>>) -> ScriptedTransport {
    ScriptedTransport::new(move |request| {
        if request.url == REFRESH_PATH {
            *valid.lock() = "new".to_string();
            return ApiResponse::json_value(
                200,
                &json!({ "accessToken": "new", "refreshToken": "r2" }),
            );
        }

        let expected = format!("Bearer {}", valid.lock());
        if request.header_value("Authorization") == Some(expected.as_str()) {
            ApiResponse::json_value(200, &json!({ "success": true, "url": request.url }))
        } else {
            ApiResponse::json_value(401, &json!({ "message": "token expired" }))
        }
    })
}

pub fn pipeline_with(
    config: PipelineConfig,
    transport: Arc<ScriptedTransport>,
    session: Arc<FakeSession>,
) -> HttpPipeline {
    HttpPipeline::builder()
        .config(config)
        .transport(transport)
        .session(session)
        .build()
        .expect("pipeline builds")
}

pub fn pipeline(transport: Arc<ScriptedTransport>, session: Arc<FakeSession>) -> HttpPipeline {
    pipeline_with(PipelineConfig::new("https://api.example.com"), transport, session)
}
