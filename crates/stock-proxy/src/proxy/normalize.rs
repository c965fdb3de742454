//! Response normalization.
//!
//! The dashboard only understands three shapes: a JSON document, a binary
//! download, or an [`ErrorEnvelope`](crate::error::ErrorEnvelope). Whatever
//! the backend sends is classified into one of them here. The classification
//! works on a fully-read [`BackendResponse`] and never touches the network.

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::Value;

use super::correlation::CORRELATION_HEADER;
use crate::cors;
use crate::error::{truncate_chars, ProxyError, ERROR_DETAIL_LIMIT, PREVIEW_LIMIT};
use crate::routes::{ExpectedContent, RouteSpec, DEFAULT_ATTACHMENT};

/// A backend reply, read to completion. Consumed once by [`normalize`].
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    /// Raw `Content-Type`, empty when the backend sent none.
    pub content_type: String,
    pub content_disposition: Option<HeaderValue>,
    pub body: Bytes,
}

impl BackendResponse {
    /// Drain a reqwest response. A body that breaks off mid-read counts as a
    /// transport failure.
    pub async fn read(response: reqwest::Response) -> Result<Self, ProxyError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let content_disposition = response.headers().get(CONTENT_DISPOSITION).cloned();
        let body = response.bytes().await.map_err(ProxyError::transport)?;

        Ok(Self {
            status,
            content_type,
            content_disposition,
            body,
        })
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Body of a [`NormalizedResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedBody {
    Json(Value),
    Binary(Bytes),
}

/// The response handed back to the dashboard. Always carries a
/// `Content-Type` and `Access-Control-Allow-Origin: *`.
#[derive(Debug, Clone)]
pub struct NormalizedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: NormalizedBody,
}

impl NormalizedResponse {
    pub fn json(status: StatusCode, value: Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        cors::allow_any_origin(&mut headers);
        Self {
            status,
            headers,
            body: NormalizedBody::Json(value),
        }
    }

    pub fn binary(
        status: StatusCode,
        content_type: HeaderValue,
        disposition: Option<HeaderValue>,
        bytes: Bytes,
    ) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, content_type);
        if let Some(disposition) = disposition {
            headers.insert(CONTENT_DISPOSITION, disposition);
        }
        cors::allow_any_origin(&mut headers);
        Self {
            status,
            headers,
            body: NormalizedBody::Binary(bytes),
        }
    }

    /// Tag the response with the request's correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: &str) -> Self {
        let value = HeaderValue::from_str(correlation_id)
            .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
        self.headers
            .insert(HeaderName::from_static(CORRELATION_HEADER), value);
        self
    }
}

impl From<ProxyError> for NormalizedResponse {
    fn from(err: ProxyError) -> Self {
        let envelope = err.envelope();
        let value = serde_json::to_value(&envelope).unwrap_or_else(|_| {
            serde_json::json!({ "success": false, "error": envelope.error })
        });
        NormalizedResponse::json(err.status(), value)
    }
}

impl IntoResponse for NormalizedResponse {
    fn into_response(self) -> Response {
        let body = match self.body {
            NormalizedBody::Json(value) => match serde_json::to_vec(&value) {
                Ok(bytes) => Body::from(bytes),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize response body");
                    return (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response();
                }
            },
            NormalizedBody::Binary(bytes) => Body::from(bytes),
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Classify a backend reply for `route`.
///
/// - non-2xx: error envelope carrying the backend status and a bounded
///   preview of its body
/// - `application/pdf` / `application/octet-stream`: bytes passed through
/// - `application/json`: parsed and re-emitted with the backend status
/// - anything else: error envelope with status 500, even on a 2xx
pub fn normalize(route: &RouteSpec, backend: BackendResponse) -> Result<NormalizedResponse, ProxyError> {
    if !backend.status.is_success() {
        let text = backend.text();
        tracing::error!(
            status = backend.status.as_u16(),
            preview = %truncate_chars(&text, PREVIEW_LIMIT),
            "Backend returned an error status"
        );
        return Err(ProxyError::BackendHttp {
            status: backend.status,
            details: truncate_chars(&text, ERROR_DETAIL_LIMIT),
        });
    }

    let content_type = backend.content_type.to_ascii_lowercase();

    if content_type.contains("application/pdf") || content_type.contains("application/octet-stream") {
        let header = HeaderValue::from_str(&backend.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        let disposition = backend.content_disposition.or_else(|| {
            (route.expected == ExpectedContent::Binary)
                .then(|| HeaderValue::from_static(DEFAULT_ATTACHMENT))
        });
        return Ok(NormalizedResponse::binary(
            backend.status,
            header,
            disposition,
            backend.body,
        ));
    }

    if content_type.contains("application/json") {
        let value: Value = serde_json::from_slice(&backend.body).map_err(|source| {
            tracing::error!(error = %source, "Backend sent malformed JSON");
            ProxyError::BackendMalformed { source }
        })?;
        if route.expected == ExpectedContent::Binary {
            tracing::warn!(route = route.path, "Expected a binary download, backend sent JSON");
        }
        return Ok(NormalizedResponse::json(backend.status, value));
    }

    let preview = truncate_chars(&backend.text(), PREVIEW_LIMIT);
    tracing::error!(
        content_type = %backend.content_type,
        preview = %preview,
        "Backend returned an unexpected content type"
    );
    Err(ProxyError::UnexpectedContentType {
        content_type: backend.content_type,
        preview,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::ROUTES;
    use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;

    fn route(path: &str) -> &'static RouteSpec {
        ROUTES.iter().find(|r| r.path == path).unwrap()
    }

    fn backend(status: u16, content_type: &str, body: &[u8]) -> BackendResponse {
        BackendResponse {
            status: StatusCode::from_u16(status).unwrap(),
            content_type: content_type.to_string(),
            content_disposition: None,
            body: Bytes::copy_from_slice(body),
        }
    }

    #[test]
    fn test_json_passes_through() {
        let body = br#"{"success":true,"ticker":"AAPL","analysis":{"pe_ratio":28.5,"tags":[1,2]}}"#;
        let resp = normalize(
            route("/api/analyze"),
            backend(200, "application/json; charset=utf-8", body),
        )
        .unwrap();

        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.headers[CONTENT_TYPE], "application/json");
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let expected: Value = serde_json::from_slice(body).unwrap();
        assert_eq!(resp.body, NormalizedBody::Json(expected));
    }

    #[tokio::test]
    async fn test_json_key_order_survives_serialization() {
        let body = br#"{"success":true,"ticker":"AAPL","analysis":{"Total Revenue":1,"Gross Profit":2,"Cost Of Revenue":3}}"#;
        let resp = normalize(route("/api/analyze"), backend(200, "application/json", body)).unwrap();

        let bytes = axum::body::to_bytes(resp.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), body.as_slice());
    }

    #[test]
    fn test_json_keeps_backend_status() {
        let resp = normalize(
            route("/api/analyze"),
            backend(201, "application/json", br#"{"success":true}"#),
        )
        .unwrap();
        assert_eq!(resp.status, StatusCode::CREATED);
    }

    #[test]
    fn test_content_type_match_ignores_case() {
        let resp = normalize(
            route("/api/market-movers"),
            backend(200, "Application/JSON", br#"{"success":true,"gainers":[],"losers":[]}"#),
        )
        .unwrap();
        assert!(matches!(resp.body, NormalizedBody::Json(_)));
    }

    #[test]
    fn test_pdf_bytes_and_disposition_preserved() {
        let bytes = b"%PDF-1.4\n\x00\xff\x10binary";
        let mut reply = backend(200, "application/pdf", bytes);
        reply.content_disposition = Some(HeaderValue::from_static("attachment; filename=\"AAPL.pdf\""));

        let resp = normalize(route("/api/generate-pdf"), reply).unwrap();
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.headers[CONTENT_TYPE], "application/pdf");
        assert_eq!(resp.headers[CONTENT_DISPOSITION], "attachment; filename=\"AAPL.pdf\"");
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(resp.body, NormalizedBody::Binary(Bytes::copy_from_slice(bytes)));
    }

    #[test]
    fn test_pdf_route_gets_default_disposition() {
        let resp = normalize(route("/api/generate-pdf"), backend(200, "application/pdf", b"%PDF")).unwrap();
        assert_eq!(resp.headers[CONTENT_DISPOSITION], DEFAULT_ATTACHMENT);
    }

    #[test]
    fn test_octet_stream_on_json_route_has_no_disposition() {
        let resp = normalize(
            route("/api/analyze"),
            backend(200, "application/octet-stream", b"\x01\x02"),
        )
        .unwrap();
        assert_eq!(resp.headers[CONTENT_TYPE], "application/octet-stream");
        assert!(resp.headers.get(CONTENT_DISPOSITION).is_none());
    }

    #[test]
    fn test_http_error_truncates_details() {
        let long = "e".repeat(1000);
        let err = normalize(route("/api/analyze"), backend(404, "text/plain", long.as_bytes())).unwrap_err();
        match &err {
            ProxyError::BackendHttp { status, details } => {
                assert_eq!(*status, StatusCode::NOT_FOUND);
                assert_eq!(details.chars().count(), ERROR_DETAIL_LIMIT);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_http_error_wins_over_json_content_type() {
        let err = normalize(
            route("/api/analyze"),
            backend(400, "application/json", br#"{"success":false,"error":"Please provide a ticker symbol"}"#),
        )
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.envelope().details.unwrap().contains("Please provide a ticker symbol"));
    }

    #[test]
    fn test_html_on_success_is_an_error() {
        let html = format!("<html><body>{}</body></html>", "x".repeat(500));
        let err = normalize(route("/api/analyze"), backend(200, "text/html", html.as_bytes())).unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let env = err.envelope();
        assert!(!env.success);
        let preview = env.details.unwrap();
        assert!(preview.starts_with("<html><body>"));
        assert_eq!(preview.chars().count(), PREVIEW_LIMIT);
    }

    #[test]
    fn test_missing_content_type_is_an_error() {
        let err = normalize(route("/api/market-news"), backend(200, "", b"{}")).unwrap_err();
        assert!(matches!(err, ProxyError::UnexpectedContentType { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = normalize(route("/api/analyze"), backend(200, "application/json", b"{not json")).unwrap_err();
        assert!(matches!(err, ProxyError::BackendMalformed { .. }));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_conversion_attaches_cors() {
        let resp = NormalizedResponse::from(ProxyError::ConfigurationMissing)
            .with_correlation_id("abc-123");
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(resp.headers[CORRELATION_HEADER], "abc-123");
        match resp.body {
            NormalizedBody::Json(v) => {
                assert_eq!(v["success"], false);
                assert_eq!(v["error"], "Backend URL not configured");
                assert!(v["hint"].is_string());
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }
}
