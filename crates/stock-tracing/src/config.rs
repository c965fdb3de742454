//! Tracing configuration types.

use serde::Deserialize;

/// Configuration for logging and optional OpenTelemetry export.
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    /// The service name reported to the OTLP collector.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// OTLP collector endpoint (e.g. "http://localhost:4317").
    /// When `None`, only fmt logging to stderr is installed.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Transport protocol for OTLP export.
    #[serde(default)]
    pub protocol: OtlpProtocol,

    /// Log level filter (e.g. "info", "stock_proxy=debug,info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// OTLP transport protocol.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

fn default_service_name() -> String {
    "stock-proxy".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            otlp_endpoint: None,
            protocol: OtlpProtocol::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_uses_defaults() {
        let config: TracingConfig = toml::from_str("").unwrap();
        assert_eq!(config.service_name, "stock-proxy");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.protocol, OtlpProtocol::Grpc);
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_protocol_is_lowercase() {
        let config: TracingConfig = toml::from_str(
            r#"
            otlp_endpoint = "http://collector:4318"
            protocol = "http"
            "#,
        )
        .unwrap();
        assert_eq!(config.protocol, OtlpProtocol::Http);
        assert_eq!(config.otlp_endpoint.as_deref(), Some("http://collector:4318"));
    }
}
