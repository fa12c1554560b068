//! Configuration sections.

use serde::{Deserialize, Serialize};

/// HTTP server section.
///
/// # Example
///
/// ```
/// use hermes_config::ServerConfig;
///
/// let config = ServerConfig::default();
/// assert_eq!(config.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.shutdown_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address (e.g. "0.0.0.0:8080").
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// How long shutdown waits for in-flight requests, in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_http_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30
}

/// Service handler section: body limits and bypass defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Maximum JSON or urlencoded body size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Maximum multipart body size.
    #[serde(default = "default_max_multipart_bytes")]
    pub max_multipart_bytes: usize,

    /// Maximum number of multipart parts.
    #[serde(default = "default_max_multipart_fields")]
    pub max_multipart_fields: usize,

    /// Leave JSON request bodies to the methods.
    #[serde(default)]
    pub bypass_request_body: bool,

    /// Leave plain-value response bodies to the methods.
    #[serde(default)]
    pub bypass_response_body: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            max_multipart_bytes: default_max_multipart_bytes(),
            max_multipart_fields: default_max_multipart_fields(),
            bypass_request_body: false,
            bypass_response_body: false,
        }
    }
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_max_multipart_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_max_multipart_fields() -> usize {
    100
}

/// Log format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON formatted logs (production).
    #[default]
    Json,
    /// Human-readable pretty format (development).
    Pretty,
}

/// Logging section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error, or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Enable metrics collection and the `/metrics` route.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Histogram bucket boundaries for call duration, in seconds.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

fn default_histogram_buckets() -> Vec<f64> {
    hermes_telemetry::MetricsConfig::default().duration_buckets
}

/// Telemetry section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    /// Service name used in logs.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl TelemetrySection {
    /// Builds the runtime telemetry configuration.
    #[must_use]
    pub fn to_telemetry_config(&self) -> hermes_telemetry::TelemetryConfig {
        let base = match self.logging.format {
            LogFormat::Json => hermes_telemetry::LogConfig::production(),
            LogFormat::Pretty => hermes_telemetry::LogConfig::development(),
        };

        hermes_telemetry::TelemetryConfig {
            logging: hermes_telemetry::LogConfig {
                enabled: self.logging.enabled,
                level: self.logging.level.clone(),
                service_name: self.service_name.clone(),
                ..base
            },
            metrics: hermes_telemetry::MetricsConfig {
                enabled: self.metrics.enabled,
                duration_buckets: self.metrics.histogram_buckets.clone(),
            },
        }
    }
}

fn default_service_name() -> String {
    "hermes".to_string()
}

fn default_true() -> bool {
    true
}
