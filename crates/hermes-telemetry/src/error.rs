//! Failures while installing the global log subscriber or metrics recorder.

use thiserror::Error;

/// Why telemetry could not be initialised.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log level is not a valid `EnvFilter` directive.
    #[error("invalid log filter `{directive}`: {reason}")]
    LogFilter {
        /// The directive as configured, e.g. `info,hermes=debug`.
        directive: String,
        /// Parser message.
        reason: String,
    },

    /// A global `tracing` subscriber was installed before Hermes's.
    #[error("tracing subscriber already installed: {0}")]
    SubscriberInstalled(String),

    /// Call duration buckets are empty or unusable.
    #[error("invalid call duration buckets: {0}")]
    DurationBuckets(String),

    /// A global `metrics` recorder was installed before Hermes's.
    #[error("metrics recorder already installed: {0}")]
    RecorderInstalled(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::LogFilter {
            directive: "hermes=loud".to_string(),
            reason: "invalid level".to_string(),
        };
        assert_eq!(err.to_string(), "invalid log filter `hermes=loud`: invalid level");

        let err = TelemetryError::DurationBuckets("empty".to_string());
        assert_eq!(err.to_string(), "invalid call duration buckets: empty");
    }
}
