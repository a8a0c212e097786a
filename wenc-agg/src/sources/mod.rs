//! Upstream source adapters
//!
//! One adapter per public API. Each adapter builds [`UpstreamRequest`]s,
//! sends them through a shared [`SourceClient`] (cache + transport) and
//! normalizes the JSON into the records in [`crate::types`].
//!
//! # Architecture
//! - [`HttpFetch`] is the only place network I/O happens. [`ReqwestFetcher`]
//!   is the production implementation; tests substitute scripted fakes.
//! - [`SourceClient`] applies the response cache at every call boundary.
//!   Only responses the adapter accepted are cached.
//! - Adapters never panic and never return anything but [`SourceError`];
//!   the orchestrator turns those into field-level soft failures.

pub mod countries;
pub mod encyclopedia;
pub mod knowledge_graph;
pub mod media;
pub mod weather;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use wenc_common::WencConfig;

use crate::cache::{CacheKey, ResponseCache};
use crate::types::{FailureKind, SoftFailure};

/// Upper bound on the connection phase of each request
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest error body kept in a [`SourceError::Status`]
const MAX_ERROR_BODY: usize = 200;

/// The five upstream APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Free-text encyclopedia (search, extracts, page HTML)
    Encyclopedia,
    /// Structured knowledge-graph query endpoint
    KnowledgeGraph,
    /// Country metadata service
    Countries,
    /// Current weather service
    Weather,
    /// Media repository
    Media,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Encyclopedia => "encyclopedia",
            SourceKind::KnowledgeGraph => "knowledge_graph",
            SourceKind::Countries => "countries",
            SourceKind::Weather => "weather",
            SourceKind::Media => "media",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A GET request against one upstream
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub source: SourceKind,
    pub url: String,
    pub params: Vec<(String, String)>,
    /// Accept header override (the knowledge graph needs SPARQL JSON)
    pub accept: Option<&'static str>,
}

impl UpstreamRequest {
    pub fn get(source: SourceKind, url: impl Into<String>) -> Self {
        Self {
            source,
            url: url.into(),
            params: Vec::new(),
            accept: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    pub fn accept(mut self, media_type: &'static str) -> Self {
        self.accept = Some(media_type);
        self
    }

    /// First value of query parameter `name`
    pub fn param_value(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Adapter-level failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// Connection, DNS or TLS failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the client timeout
    #[error("Request timed out")]
    Timeout,

    /// Upstream reports that the resource does not exist
    #[error("Not found")]
    NotFound,

    /// Upstream throttled us (HTTP 429/503)
    #[error("Rate limited by upstream")]
    RateLimited,

    /// Any other non-success status
    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Body was not the JSON shape we expected
    #[error("Parse error: {0}")]
    Parse(String),
}

impl SourceError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

impl From<SourceError> for SoftFailure {
    fn from(err: SourceError) -> Self {
        let kind = match err {
            SourceError::Network(_) => FailureKind::Network,
            SourceError::Timeout => FailureKind::Timeout,
            SourceError::NotFound | SourceError::Status { .. } => FailureKind::Upstream,
            SourceError::RateLimited => FailureKind::RateLimited,
            SourceError::Parse(_) => FailureKind::Malformed,
        };
        SoftFailure::new(kind, err.to_string())
    }
}

/// Deserialize an upstream JSON value into a typed response
pub(crate) fn decode<T: DeserializeOwned>(source: SourceKind, value: Value) -> Result<T, SourceError> {
    serde_json::from_value(value)
        .map_err(|e| SourceError::Parse(format!("unexpected {} response: {}", source, e)))
}

/// Await `call` for at most `limit`; an elapsed deadline is [`SourceError::Timeout`]
///
/// Dropping the timed-out future abandons the request, so nothing is cached.
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, SourceError>
where
    F: Future<Output = Result<T, SourceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout),
    }
}

/// Transport seam: every upstream call goes through this trait
#[async_trait]
pub trait HttpFetch: Send + Sync {
    /// Perform `request` and return the decoded JSON body
    async fn fetch_json(&self, request: &UpstreamRequest) -> Result<Value, SourceError>;
}

/// Production transport over reqwest
///
/// Sends the configured User-Agent (Wikimedia rejects anonymous clients),
/// enforces the per-call timeout and a process-wide politeness rate limit.
pub struct ReqwestFetcher {
    client: Client,
    rate_limiter: DefaultDirectRateLimiter,
}

impl ReqwestFetcher {
    pub fn new(config: &WencConfig) -> Result<Self, SourceError> {
        let timeout = config.request_timeout();
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to build HTTP client: {}", e)))?;

        let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(per_second));

        Ok(Self {
            client,
            rate_limiter,
        })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch_json(&self, request: &UpstreamRequest) -> Result<Value, SourceError> {
        self.rate_limiter.until_ready().await;

        debug!(source = %request.source, url = %request.url, "Querying upstream");

        let mut builder = self.client.get(&request.url).query(&request.params);
        if let Some(accept) = request.accept {
            builder = builder.header(reqwest::header::ACCEPT, accept);
        }

        let response = builder.send().await.map_err(SourceError::from_reqwest)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound);
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(SourceError::RateLimited);
        }
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SourceError::Parse(format!("{} returned invalid JSON: {}", request.source, e)))
    }
}

/// Cache-aware upstream client shared by all adapters
#[derive(Clone)]
pub struct SourceClient {
    transport: Arc<dyn HttpFetch>,
    cache: Arc<ResponseCache>,
    ttl_overrides: HashMap<SourceKind, Duration>,
}

impl SourceClient {
    pub fn new(transport: Arc<dyn HttpFetch>, cache: Arc<ResponseCache>) -> Self {
        Self {
            transport,
            cache,
            ttl_overrides: HashMap::new(),
        }
    }

    /// Cache responses from `source` for `ttl` instead of the cache default
    pub fn with_ttl(mut self, source: SourceKind, ttl: Duration) -> Self {
        self.ttl_overrides.insert(source, ttl);
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Serve `request` from the cache, or fetch it
    ///
    /// `accept` decodes and checks the body. A fresh body is cached only when
    /// `accept` takes it, so an error reported inside a 200 response is
    /// retried on the next call.
    pub async fn get_with<T, F>(&self, request: UpstreamRequest, accept: F) -> Result<T, SourceError>
    where
        F: FnOnce(Value) -> Result<T, SourceError>,
    {
        let key = CacheKey::for_request(&request);
        if let Some(value) = self.cache.get(&key) {
            debug!(source = %request.source, "Cache hit");
            return accept(value);
        }

        let value = match self.transport.fetch_json(&request).await {
            Ok(value) => value,
            Err(e) => {
                warn!(source = %request.source, error = %e, "Upstream request failed");
                return Err(e);
            }
        };
        match accept(value.clone()) {
            Ok(accepted) => {
                let ttl = self
                    .ttl_overrides
                    .get(&request.source)
                    .copied()
                    .unwrap_or_else(|| self.cache.default_ttl());
                self.cache.put_with_ttl(key, value, ttl);
                Ok(accepted)
            }
            Err(e) => {
                warn!(source = %request.source, error = %e, "Upstream response rejected");
                Err(e)
            }
        }
    }

    /// [`get_with`](Self::get_with) for bodies that only need to deserialize
    pub async fn get_decoded<T: DeserializeOwned>(&self, request: UpstreamRequest) -> Result<T, SourceError> {
        let source = request.source;
        self.get_with(request, |value| decode(source, value)).await
    }

    /// Fetch `request` without reading or writing the cache
    ///
    /// For answers that differ on every call, such as a random page.
    pub async fn get_fresh<T: DeserializeOwned>(&self, request: UpstreamRequest) -> Result<T, SourceError> {
        let value = self.transport.fetch_json(&request).await.map_err(|e| {
            warn!(source = %request.source, error = %e, "Upstream request failed");
            e
        })?;
        decode(request.source, value)
    }
}
