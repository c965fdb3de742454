//! Request forwarding to the analysis backend.
//!
//! One inbound request produces exactly one outbound call: no retries, no
//! fan-out. Transport failures are classified from the typed reqwest error.

use std::time::{Duration, Instant};

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use tracing::Instrument;

use super::correlation::CORRELATION_HEADER;
use super::normalize::{normalize, BackendResponse, NormalizedResponse};
use crate::config::BackendConfig;
use crate::error::ProxyError;
use crate::routes::RouteSpec;

/// Headers that should NOT be forwarded (hop-by-hop headers).
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "host",
    "connection",
    "transfer-encoding",
    "keep-alive",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
];

/// Opaque credential relayed only on routes that ask for it.
const CREDENTIAL_HEADER: &str = "x-api-key";

/// An inbound call, reduced to what the backend needs.
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    /// Path plus query string, e.g. `/api/stock-news/AAPL?limit=5`.
    pub path: String,
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Forwards table routes to the configured backend.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl Forwarder {
    pub fn new(client: reqwest::Client, backend: &BackendConfig) -> Self {
        Self {
            client,
            base_url: backend.base_url(),
        }
    }

    /// Build the shared client, applying the backend timeout if one is set.
    pub fn build_client(backend: &BackendConfig) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = backend.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Forward `request` for `route` and normalize the reply.
    ///
    /// Without a configured base URL this fails with
    /// [`ProxyError::ConfigurationMissing`] before any network activity.
    pub async fn forward(
        &self,
        route: &RouteSpec,
        request: ForwardRequest,
        correlation_id: &str,
    ) -> Result<NormalizedResponse, ProxyError> {
        let base_url = self.base_url.as_deref().ok_or_else(|| {
            tracing::error!(route = route.path, "Backend URL not configured, cannot forward");
            ProxyError::ConfigurationMissing
        })?;
        let url = format!("{base_url}{}", request.path);

        let span = stock_tracing::backend_forward_span!(correlation_id, request.method, url);
        let start = Instant::now();

        async {
            tracing::info!(method = %request.method, url = %url, "Forwarding to backend");

            let mut builder = self
                .client
                .request(request.method.clone(), &url)
                .header(CORRELATION_HEADER, correlation_id);

            for (name, value) in request.headers.iter() {
                if should_relay(name.as_str(), route.relay_credential) {
                    builder = builder.header(name, value);
                }
            }

            if request.method != Method::GET {
                if !request.headers.contains_key(CONTENT_TYPE) {
                    builder = builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                builder = builder.body(request.body);
            }

            let upstream = builder.send().await;
            let latency = start.elapsed().as_millis() as u64;
            tracing::Span::current().record("latency_ms", latency);

            let upstream = upstream.map_err(|e| {
                tracing::error!(
                    error = %e,
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    "Backend request failed"
                );
                ProxyError::transport(e)
            })?;

            let status = upstream.status();
            tracing::Span::current().record("status", status.as_u16());
            tracing::info!(status = status.as_u16(), latency_ms = latency, "Backend responded");

            let backend = BackendResponse::read(upstream).await?;
            normalize(route, backend)
        }
        .instrument(span)
        .await
    }
}

/// Whether an inbound header is relayed to the backend.
///
/// `content-length` is recomputed by reqwest and `accept-encoding` is dropped
/// because the client does not decompress.
fn should_relay(name: &str, relay_credential: bool) -> bool {
    let name = name.to_ascii_lowercase();
    if HOP_BY_HOP_HEADERS.contains(&name.as_str()) {
        return false;
    }
    match name.as_str() {
        "content-length" | "accept-encoding" | "origin" | CORRELATION_HEADER => false,
        CREDENTIAL_HEADER => relay_credential,
        _ => true,
    }
}
