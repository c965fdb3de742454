//! stock-proxy: edge proxy between the stock-analysis dashboard and its
//! analysis backend.

mod config;
mod cors;
mod error;
mod proxy;
mod routes;
mod server;

use config::ProxyConfig;
use server::AppState;

fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args: Vec<String> = std::env::args().collect();
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1).cloned())
        .or_else(|| args.get(1).filter(|a| !a.starts_with('-')).cloned())
        .or_else(|| std::env::var("STOCK_PROXY_CONFIG").ok())
        .unwrap_or_else(|| "stock-proxy.toml".to_string());

    let backend_url_override = flag_value(&args, "--backend-url");
    let listen_override = flag_value(&args, "--listen");

    let mut config = ProxyConfig::load(&config_path)?;

    // CLI overrides take precedence over TOML and env vars
    if let Some(url) = backend_url_override {
        config.backend.url = Some(url);
    }
    if let Some(addr) = listen_override {
        config.server.listen_address = addr;
    }

    // The tonic OTLP exporter needs a reactor, so tracing starts inside the runtime
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let tracing_guard = stock_tracing::init_tracing(&config.tracing);

        let state = AppState::new(config)?;
        let backend_configured = state.forwarder.base_url().is_some();

        tracing::info!(
            config_path = %config_path,
            listen_address = %state.config.server.listen_address,
            backend_configured,
            otlp_export = tracing_guard.exporting(),
            "Starting stock-proxy"
        );
        if !backend_configured {
            tracing::warn!(
                "No backend URL configured (set BACKEND_URL); /api routes will answer with a configuration error"
            );
        }

        server::run(state).await
    })
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1).cloned())
}
