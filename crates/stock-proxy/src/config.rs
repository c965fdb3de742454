//! Configuration types and loading logic.

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;
use stock_tracing::TracingConfig;

/// Top-level proxy configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub tracing: TracingConfig,
}

/// Server listen configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    /// Largest inbound request body accepted for forwarding.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Analysis backend the `/api/*` routes are forwarded to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    /// Backend origin, e.g. `https://analysis.example.com`.
    ///
    /// Optional on purpose: when unset the proxy still starts and every
    /// proxied route answers with a configuration error envelope.
    #[serde(default)]
    pub url: Option<String>,

    /// Per-request timeout. `None` leaves the HTTP client default in place.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:8788".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

impl BackendConfig {
    /// The configured base URL with whitespace and trailing slashes removed,
    /// or `None` when it is unset or blank.
    pub fn base_url(&self) -> Option<String> {
        self.url
            .as_deref()
            .map(|u| u.trim().trim_end_matches('/'))
            .filter(|u| !u.is_empty())
            .map(str::to_string)
    }
}

impl ProxyConfig {
    /// Load configuration from a TOML file and environment variables.
    ///
    /// Priority (highest to lowest):
    /// 1. `STOCK_` prefixed variables (`__` for nesting, e.g. `STOCK_BACKEND__URL`)
    /// 2. `BACKEND_URL`
    /// 3. TOML config file (may be absent)
    /// 4. Defaults
    pub fn load(config_path: &str) -> anyhow::Result<Self> {
        Ok(Self::figment(config_path).extract()?)
    }

    fn figment(config_path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(config_path))
            .merge(
                Env::raw()
                    .only(&["BACKEND_URL"])
                    .map(|_| "backend.url".into()),
            )
            .merge(Env::prefixed("STOCK_").split("__"))
    }
}
