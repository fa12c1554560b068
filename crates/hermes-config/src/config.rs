//! Root configuration type.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, ServerConfig, ServiceConfig, TelemetrySection};

/// Complete Hermes configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to layer files and environment
/// variables over the defaults.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Service handler configuration.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Logging and metrics configuration.
    #[serde(default)]
    pub telemetry: TelemetrySection,
}

impl HermesConfig {
    /// Debug logs in pretty format.
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.telemetry.logging.level = "debug".to_string();
        config.telemetry.logging.format = LogFormat::Pretty;
        config
    }

    /// Info logs in JSON format.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Checks values that deserialize fine but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.request_timeout_secs",
                "must be greater than zero",
            ));
        }

        let limits = [
            ("service.max_body_bytes", self.service.max_body_bytes),
            ("service.max_multipart_bytes", self.service.max_multipart_bytes),
            ("service.max_multipart_fields", self.service.max_multipart_fields),
        ];
        for (field, value) in limits {
            if value == 0 {
                return Err(ConfigError::invalid_value(field, "must be greater than zero"));
            }
        }

        if self.telemetry.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.service_name",
                "must not be empty",
            ));
        }

        if self.telemetry.metrics.enabled && self.telemetry.metrics.histogram_buckets.is_empty() {
            return Err(ConfigError::invalid_value(
                "telemetry.metrics.histogram_buckets",
                "must not be empty when metrics are enabled",
            ));
        }

        Ok(())
    }
}
