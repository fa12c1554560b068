//! Prometheus metrics for Hermes.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_calls_total` | Counter | `service`, `outcome` | Handled calls |
//! | `hermes_call_duration_seconds` | Histogram | `service` | Method run time |
//! | `hermes_in_flight_calls` | Gauge | - | Calls currently running |
//!
//! Recording is always safe: without [`init_metrics`] the `metrics` facade
//! discards observations.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use std::time::Duration;

/// Counter of handled calls.
pub const CALLS_TOTAL: &str = "hermes_calls_total";

/// Histogram of method run time.
pub const CALL_DURATION_SECONDS: &str = "hermes_call_duration_seconds";

/// Gauge of calls currently running.
pub const IN_FLIGHT_CALLS: &str = "hermes_in_flight_calls";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Histogram buckets for call duration, in seconds.
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// How a call ended, as seen by the service handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallOutcome {
    /// The method returned a value.
    Ok,
    /// The method returned a formatted response (or nothing).
    Envelope,
    /// The argument could not be resolved; the method never ran.
    BadRequest,
    /// The method returned an error.
    Error,
    /// The method panicked.
    Panic,
}

impl CallOutcome {
    /// Label value for this outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Envelope => "envelope",
            Self::BadRequest => "bad_request",
            Self::Error => "error",
            Self::Panic => "panic",
        }
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Installs the global Prometheus recorder.
///
/// Metrics are exposed by rendering the handle, see [`render_metrics`]; the
/// HTTP server serves the rendered text on its own listener. Calling this
/// twice is an error because the `metrics` facade accepts one recorder.
///
/// # Errors
///
/// Returns [`TelemetryError::DurationBuckets`] for unusable buckets and
/// [`TelemetryError::RecorderInstalled`] if a recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(CALL_DURATION_SECONDS.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::DurationBuckets(e.to_string()))?
        .install_recorder()
        .map_err(|e| TelemetryError::RecorderInstalled(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(CALLS_TOTAL, "Total number of service calls handled");
    describe_histogram!(
        CALL_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Run time of service methods in seconds"
    );
    describe_gauge!(IN_FLIGHT_CALLS, "Number of service calls currently running");
}

/// Records a finished call.
///
/// `duration` is `None` for calls rejected before the method ran.
pub fn record_call(service: &str, outcome: CallOutcome, duration: Option<Duration>) {
    counter!(
        CALLS_TOTAL,
        "service" => service.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    if let Some(duration) = duration {
        histogram!(CALL_DURATION_SECONDS, "service" => service.to_string())
            .record(duration.as_secs_f64());
    }
}

/// Keeps [`IN_FLIGHT_CALLS`] raised while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the in-flight gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_CALLS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_CALLS).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.duration_buckets.len(), 12);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(CallOutcome::Ok.as_str(), "ok");
        assert_eq!(CallOutcome::BadRequest.to_string(), "bad_request");
        assert_eq!(CallOutcome::Panic.as_str(), "panic");
    }

    #[test]
    fn test_recording_without_recorder() {
        record_call("svc", CallOutcome::Ok, Some(Duration::from_millis(3)));
        record_call("svc", CallOutcome::BadRequest, None);
        let guard = InFlightGuard::new();
        drop(guard);
    }

    #[test]
    fn test_disabled_metrics() {
        let config = MetricsConfig {
            enabled: false,
            ..MetricsConfig::default()
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_empty_buckets_rejected() {
        let config = MetricsConfig {
            enabled: true,
            duration_buckets: Vec::new(),
        };
        let err = init_metrics(&config).unwrap_err();
        assert!(matches!(err, TelemetryError::DurationBuckets(_)));
    }
}
