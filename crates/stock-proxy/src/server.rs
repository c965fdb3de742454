//! Axum HTTP server: router generated from the route table, listener,
//! graceful shutdown.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, on, MethodFilter};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::ProxyConfig;
use crate::cors;
use crate::error::ProxyError;
use crate::proxy::correlation;
use crate::proxy::forward::{ForwardRequest, Forwarder};
use crate::proxy::normalize::NormalizedResponse;
use crate::routes::{RouteSpec, ROUTES};

/// Shared application state. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub config: ProxyConfig,
    pub forwarder: Forwarder,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> anyhow::Result<Self> {
        let client = Forwarder::build_client(&config.backend)?;
        let forwarder = Forwarder::new(client, &config.backend);
        Ok(Self { config, forwarder })
    }
}

/// Build the router: one entry per table route (its verb plus `OPTIONS`),
/// `/health`, and a JSON 404 fallback.
pub fn router(state: AppState) -> Router {
    let mut app = Router::new();

    for route in ROUTES {
        let filter = match MethodFilter::try_from(route.method.clone()) {
            Ok(filter) => filter,
            Err(e) => {
                tracing::error!(route = route.path, error = %e, "Unsupported route method, skipping");
                continue;
            }
        };
        let method_router = on(filter, move |State(state): State<Arc<AppState>>, request: Request| {
            handle_proxy(state, route, request)
        })
        .options(move || async move { cors::preflight(route) });
        app = app.route(route.path, method_router);
    }

    app.route("/health", get(handle_health))
        .fallback(handle_fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Build and run the HTTP server.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.config.server.listen_address.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "stock-proxy listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("stock-proxy shut down gracefully");
    Ok(())
}

/// Forward one table route to the backend and normalize the outcome.
async fn handle_proxy(state: Arc<AppState>, route: &'static RouteSpec, request: Request) -> Response {
    let correlation_id = correlation::generate_id();
    let span = stock_tracing::proxy_request_span!(&correlation_id, route.path);

    async {
        let outcome = match read_request(request, state.config.server.max_body_bytes).await {
            Ok(forward) => state.forwarder.forward(route, forward, &correlation_id).await,
            Err(e) => Err(e),
        };

        let normalized = match outcome {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!(error = %e, status = e.status().as_u16(), "Returning error envelope");
                NormalizedResponse::from(e)
            }
        }
        .with_correlation_id(&correlation_id);

        tracing::Span::current().record("status", normalized.status.as_u16());
        normalized.into_response()
    }
    .instrument(span)
    .await
}

async fn read_request(request: Request, max_body_bytes: usize) -> Result<ForwardRequest, ProxyError> {
    let (parts, body) = request.into_parts();
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    let body = axum::body::to_bytes(body, max_body_bytes)
        .await
        .map_err(ProxyError::request_body)?;

    Ok(ForwardRequest {
        path,
        method: parts.method,
        headers: parts.headers,
        body,
    })
}

/// Anything outside the route table.
async fn handle_fallback(uri: Uri) -> Response {
    tracing::debug!(path = %uri.path(), "No route matched");
    ProxyError::UnknownRoute {
        path: uri.path().to_string(),
    }
    .into_response()
}

/// Health check endpoint.
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}
