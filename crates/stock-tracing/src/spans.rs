//! Span builders shared by the proxy handlers.

/// Span for one inbound proxied request.
///
/// Usage: `proxy_request_span!(correlation_id, "/api/analyze")`
///
/// `status` is recorded once the normalized response is built.
#[macro_export]
macro_rules! proxy_request_span {
    ($correlation_id:expr, $route:expr) => {
        tracing::info_span!(
            "proxy_request",
            correlation_id = %$correlation_id,
            route = %$route,
            status = tracing::field::Empty,
        )
    };
}

/// Span for the single outbound call to the analysis backend.
#[macro_export]
macro_rules! backend_forward_span {
    ($correlation_id:expr, $method:expr, $url:expr) => {
        tracing::info_span!(
            "backend_forward",
            correlation_id = %$correlation_id,
            method = %$method,
            url = %$url,
            status = tracing::field::Empty,
            latency_ms = tracing::field::Empty,
        )
    };
}
