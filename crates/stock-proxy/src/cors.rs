//! Permissive cross-origin headers.
//!
//! The dashboard is served from a different origin than the proxy in some
//! deployments, so every response allows any origin.

use axum::body::Body;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;

use crate::routes::RouteSpec;

/// Attach `Access-Control-Allow-Origin: *`.
pub fn allow_any_origin(headers: &mut HeaderMap) {
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
}

/// Preflight answer for `route`: CORS headers only, empty body.
pub fn preflight(route: &RouteSpec) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    allow_any_origin(headers);
    if let Ok(methods) = HeaderValue::from_str(&route.allow_methods()) {
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods);
    }
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(route.allow_headers()),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::ROUTES;

    #[test]
    fn test_preflight_headers_for_every_route() {
        for route in ROUTES {
            let response = preflight(route);
            assert_eq!(response.status(), StatusCode::OK);
            let headers = response.headers();
            assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
            assert_eq!(
                headers[ACCESS_CONTROL_ALLOW_METHODS],
                route.allow_methods().as_str()
            );
            assert_eq!(headers[ACCESS_CONTROL_ALLOW_HEADERS], route.allow_headers());
        }
    }
}
