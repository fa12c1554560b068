//! Typed configuration for Hermes.
//!
//! - TOML and JSON configuration files
//! - environment variable overrides (`PREFIX__SECTION__KEY`)
//! - `.env` files via `dotenvy`
//! - strict parsing: unknown fields are errors
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_secs = 30
//!
//! [service]
//! max_body_bytes = 1048576
//! max_multipart_bytes = 10485760
//! max_multipart_fields = 100
//! bypass_request_body = false
//! bypass_response_body = false
//!
//! [telemetry]
//! service_name = "hermes"
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [telemetry.metrics]
//! enabled = true
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `HERMES__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `HERMES__SERVICE__BYPASS_RESPONSE_BODY=true`
//! - `HERMES__TELEMETRY__LOGGING__LEVEL=debug`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::HermesConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{
    LogFormat, LoggingConfig, MetricsConfig, ServerConfig, ServiceConfig, TelemetrySection,
};
