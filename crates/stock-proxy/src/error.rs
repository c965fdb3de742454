//! Failure taxonomy for proxied calls and the JSON envelope clients receive.
//!
//! Every failure is scoped to one request: it is logged, turned into an
//! [`ErrorEnvelope`] and returned. Nothing is retried or escalated.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use serde::Serialize;

use crate::proxy::normalize::NormalizedResponse;

/// Characters of backend error text kept in `details`.
pub const ERROR_DETAIL_LIMIT: usize = 300;

/// Characters of unexpected backend output kept in previews and logs.
pub const PREVIEW_LIMIT: usize = 200;

/// Everything that can go wrong between the inbound request and the
/// normalized response.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No backend base URL is configured.
    #[error("Backend URL not configured")]
    ConfigurationMissing,

    /// The backend could not be reached, or the exchange broke off mid-way.
    #[error("Cannot connect to backend server")]
    BackendUnreachable {
        timed_out: bool,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with a non-2xx status.
    #[error("Backend server error ({})", .status.as_u16())]
    BackendHttp { status: StatusCode, details: String },

    /// The backend declared JSON but the body does not parse.
    #[error("Invalid JSON response from backend")]
    BackendMalformed {
        #[source]
        source: serde_json::Error,
    },

    /// The backend answered 2xx with something that is neither JSON nor binary.
    #[error("Backend returned unexpected response format")]
    UnexpectedContentType {
        content_type: String,
        preview: String,
    },

    /// No route in the table matches the request path.
    #[error("Unknown API route")]
    UnknownRoute { path: String },

    /// The inbound body exceeded `server.max_body_bytes`.
    #[error("Request body too large")]
    RequestBodyTooLarge {
        #[source]
        source: axum::Error,
    },

    /// The inbound body broke off or failed while being read.
    #[error("Request body could not be read")]
    RequestBodyUnreadable {
        #[source]
        source: axum::Error,
    },
}

/// The fixed JSON body returned on every failure path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ProxyError {
    /// Classify a transport failure from reqwest.
    pub fn transport(source: reqwest::Error) -> Self {
        ProxyError::BackendUnreachable {
            timed_out: source.is_timeout(),
            source,
        }
    }

    /// Classify a failure reading the inbound body: the length limit, or
    /// anything else (client abort, broken stream).
    pub fn request_body(source: axum::Error) -> Self {
        let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(&source);
        let mut over_limit = false;
        while let Some(err) = cause {
            if err.is::<LengthLimitError>() {
                over_limit = true;
                break;
            }
            cause = err.source();
        }

        if over_limit {
            ProxyError::RequestBodyTooLarge { source }
        } else {
            ProxyError::RequestBodyUnreadable { source }
        }
    }

    /// HTTP status of the envelope. Backend failures mirror the backend's
    /// status when it gave one and are 500 otherwise.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::BackendHttp { status, .. } => *status,
            ProxyError::UnknownRoute { .. } => StatusCode::NOT_FOUND,
            ProxyError::RequestBodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RequestBodyUnreadable { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let (details, hint) = match self {
            ProxyError::ConfigurationMissing => (
                Some(
                    "Set the BACKEND_URL environment variable (or backend.url in the config file) \
                     to the analysis backend origin, then restart the proxy."
                        .to_string(),
                ),
                Some("Example: BACKEND_URL=https://your-backend-url.com".to_string()),
            ),
            ProxyError::BackendUnreachable { timed_out, .. } => (
                None,
                Some(if *timed_out {
                    "The backend did not answer in time; it may be overloaded or down".to_string()
                } else {
                    "The backend might be down; check that it is running and reachable".to_string()
                }),
            ),
            ProxyError::BackendHttp { details, .. } => (Some(details.clone()), None),
            ProxyError::BackendMalformed { source } => (
                Some(source.to_string()),
                Some("The backend returned malformed data".to_string()),
            ),
            ProxyError::UnexpectedContentType {
                content_type,
                preview,
            } => (
                Some(preview.clone()),
                Some(format!("Expected application/json but got: {content_type}")),
            ),
            ProxyError::UnknownRoute { path } => (Some(path.clone()), None),
            ProxyError::RequestBodyTooLarge { source } | ProxyError::RequestBodyUnreadable { source } => {
                (Some(source.to_string()), None)
            }
        };

        ErrorEnvelope {
            success: false,
            error: self.to_string(),
            details,
            hint,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        NormalizedResponse::from(self).into_response()
    }
}

/// First `limit` characters of `text`, never splitting a UTF-8 sequence.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
