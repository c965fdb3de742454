//! Declarative table of the backend operations exposed under `/api`.
//!
//! Each entry differs only in path, verb, whether the opaque `X-API-Key`
//! credential is relayed, and the kind of body the backend is expected to
//! produce. The router and the forwarder are both driven from this table.

use http::Method;

/// Body kind a route's backend operation produces on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedContent {
    Json,
    Binary,
}

/// One proxied backend operation.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    /// axum route pattern, e.g. `/api/stock-news/{ticker}`.
    pub path: &'static str,
    pub method: Method,
    /// Relay the inbound `X-API-Key` header to the backend.
    pub relay_credential: bool,
    pub expected: ExpectedContent,
}

/// Disposition supplied for binary downloads when the backend sends none.
pub const DEFAULT_ATTACHMENT: &str = "attachment; filename=\"stock_analysis.pdf\"";

pub static ROUTES: &[RouteSpec] = &[
    RouteSpec {
        path: "/api/analyze",
        method: Method::POST,
        relay_credential: false,
        expected: ExpectedContent::Json,
    },
    RouteSpec {
        path: "/api/ai-insights",
        method: Method::POST,
        relay_credential: true,
        expected: ExpectedContent::Json,
    },
    RouteSpec {
        path: "/api/generate-pdf",
        method: Method::POST,
        relay_credential: false,
        expected: ExpectedContent::Binary,
    },
    RouteSpec {
        path: "/api/market-movers",
        method: Method::GET,
        relay_credential: false,
        expected: ExpectedContent::Json,
    },
    RouteSpec {
        path: "/api/compare",
        method: Method::POST,
        relay_credential: false,
        expected: ExpectedContent::Json,
    },
    RouteSpec {
        path: "/api/market-news",
        method: Method::GET,
        relay_credential: false,
        expected: ExpectedContent::Json,
    },
    RouteSpec {
        path: "/api/stock-news/{ticker}",
        method: Method::GET,
        relay_credential: false,
        expected: ExpectedContent::Json,
    },
];

impl RouteSpec {
    /// Value of `Access-Control-Allow-Methods` for this route's preflight.
    pub fn allow_methods(&self) -> String {
        format!("{}, OPTIONS", self.method)
    }

    /// Value of `Access-Control-Allow-Headers` for this route's preflight.
    pub fn allow_headers(&self) -> &'static str {
        if self.relay_credential {
            "Content-Type, X-API-Key"
        } else {
            "Content-Type"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_paths_are_unique_api_routes() {
        let mut seen = HashSet::new();
        for route in ROUTES {
            assert!(route.path.starts_with("/api/"), "{}", route.path);
            assert!(seen.insert(route.path), "duplicate route {}", route.path);
        }
    }

    #[test]
    fn test_only_ai_insights_relays_credential() {
        let relaying: Vec<_> = ROUTES
            .iter()
            .filter(|r| r.relay_credential)
            .map(|r| r.path)
            .collect();
        assert_eq!(relaying, vec!["/api/ai-insights"]);
    }

    #[test]
    fn test_preflight_values() {
        let pdf = ROUTES.iter().find(|r| r.path == "/api/generate-pdf").unwrap();
        assert_eq!(pdf.expected, ExpectedContent::Binary);
        assert_eq!(pdf.allow_methods(), "POST, OPTIONS");
        assert_eq!(pdf.allow_headers(), "Content-Type");

        let movers = ROUTES.iter().find(|r| r.path == "/api/market-movers").unwrap();
        assert_eq!(movers.allow_methods(), "GET, OPTIONS");

        let ai = ROUTES.iter().find(|r| r.path == "/api/ai-insights").unwrap();
        assert_eq!(ai.allow_headers(), "Content-Type, X-API-Key");
    }
}
