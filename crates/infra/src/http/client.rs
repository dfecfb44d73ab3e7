use std::time::Duration;

use async_trait::async_trait;
use courier_core::Transport;
use courier_domain::constants::DEFAULT_TIMEOUT_MS;
use courier_domain::{
    ApiResponse, ConfigError, Method, NormalizedError, PipelineConfig, QueryParams, RequestBody,
    RequestDescriptor, Result,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client as ReqwestClient, RequestBuilder};
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::errors::InfraError;

/// [`Transport`] backed by a reqwest client.
///
/// Sends each request exactly once: retries and refresh are decided by the
/// pipeline, never by the transport.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    base_url: Url,
}

impl ReqwestTransport {
    /// Start building a transport for `base_url`.
    pub fn builder(base_url: impl Into<String>) -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new(base_url)
    }

    /// Transport configured from the pipeline settings.
    pub fn from_config(config: &PipelineConfig) -> std::result::Result<Self, ConfigError> {
        let mut builder = Self::builder(config.base_url.as_str()).timeout(config.timeout());
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        builder.build()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve `url` against the base URL unless it is already absolute.
    ///
    /// The base path is kept: `https://host/v1` + `/orders` gives
    /// `https://host/v1/orders`.
    pub fn resolve(&self, url: &str) -> std::result::Result<Url, InfraError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Ok(Url::parse(url)?);
        }
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = url.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    fn prepare(
        &self,
        request: &RequestDescriptor,
    ) -> std::result::Result<RequestBuilder, InfraError> {
        let url = self.resolve(&request.url)?;
        let mut builder = self.client.request(http_method(request.method), url);

        let query = query_pairs(&request.params);
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        Ok(match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Text(text) => {
                builder.header(CONTENT_TYPE, "text/plain; charset=utf-8").body(text.clone())
            }
            RequestBody::Form(fields) => builder.form(fields),
            RequestBody::Stream(stream) => builder
                .header(CONTENT_TYPE, stream.content_type())
                .body(stream.bytes().to_vec()),
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    async fn send(&self, request: &RequestDescriptor) -> Result<ApiResponse> {
        let builder = self.prepare(request).map_err(NormalizedError::from)?;

        let response =
            builder.send().await.map_err(|e| NormalizedError::from(InfraError::from(e)))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect::<Vec<_>>();

        let body =
            response.bytes().await.map_err(|e| NormalizedError::from(InfraError::from(e)))?;
        debug!(status, bytes = body.len(), "received HTTP response");

        Ok(headers
            .into_iter()
            .fold(ApiResponse::new(status, body.to_vec()), |response, (name, value)| {
                response.with_header(name, value)
            }))
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    base_url: String,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ReqwestTransportBuilder {
    fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            user_agent: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> std::result::Result<ReqwestTransport, ConfigError> {
        let base_url = Url::parse(&self.base_url).map_err(|e| ConfigError::Invalid {
            field: "base_url".to_string(),
            reason: e.to_string(),
        })?;

        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        let client = builder.build().map_err(|e| ConfigError::Invalid {
            field: "http_client".to_string(),
            reason: e.to_string(),
        })?;

        Ok(ReqwestTransport { client, base_url })
    }
}

fn http_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

/// Flatten query params; arrays repeat the key and nulls are dropped.
fn query_pairs(params: &QueryParams) -> Vec<(String, String)> {
    fn scalar(value: &Value) -> String {
        match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    params
        .iter()
        .flat_map(|(key, value)| match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| (key.clone(), scalar(item)))
                .collect(),
            other => vec![(key.clone(), scalar(other))],
        })
        .collect()
}
