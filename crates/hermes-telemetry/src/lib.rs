//! Observability for Hermes services.
//!
//! - **Logging**: `tracing` events rendered as JSON or pretty text
//! - **Metrics**: Prometheus counters and histograms via the `metrics` crate
//! - **Call recorders**: sinks for the per-call fields the service handler emits
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::builder()
//!     .service_name("users")
//!     .log_level("debug")
//!     .build();
//! init_telemetry(&config)?;
//! ```
//!
//! # Metrics Endpoint
//!
//! ```text
//! # TYPE hermes_calls_total counter
//! hermes_calls_total{service="users.get",outcome="ok"} 1234
//! hermes_calls_total{service="users.get",outcome="bad_request"} 7
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;
pub mod recorder;

pub use crate::error::TelemetryError;
pub use crate::logging::{init_logging, LogConfig};
pub use crate::metrics::{
    init_metrics, record_call, render_metrics, CallOutcome, InFlightGuard, MetricsConfig,
};
pub use crate::recorder::{MemoryRecorder, TracingRecorder};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Configuration for all telemetry subsystems.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl TelemetryConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }
}

/// Builder for [`TelemetryConfig`].
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    config: TelemetryConfig,
}

impl TelemetryConfigBuilder {
    /// Sets the service name used in logs.
    #[must_use]
    pub fn service_name(mut self, name: &str) -> Self {
        self.config.logging.service_name = name.to_string();
        self
    }

    /// Sets the log filter directive.
    #[must_use]
    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    /// Chooses JSON or pretty log output.
    #[must_use]
    pub fn json_logs(mut self, json: bool) -> Self {
        self.config.logging.json_format = json;
        self
    }

    /// Replaces the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LogConfig) -> Self {
        self.config.logging = logging;
        self
    }

    /// Replaces the metrics configuration.
    #[must_use]
    pub fn metrics(mut self, metrics: MetricsConfig) -> Self {
        self.config.metrics = metrics;
        self
    }

    /// Enables or disables metrics.
    #[must_use]
    pub fn metrics_enabled(mut self, enabled: bool) -> Self {
        self.config.metrics.enabled = enabled;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        self.config
    }
}

/// Initializes logging, then metrics.
///
/// # Errors
///
/// Returns the first [`TelemetryError`] raised by a subsystem.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
