//! Tracing setup for stock-proxy: fmt logging, optional OTLP export, span helpers.

pub mod config;
pub mod otlp;
pub mod spans;

pub use config::{OtlpProtocol, TracingConfig};
pub use otlp::{init_tracing, TracingGuard};
