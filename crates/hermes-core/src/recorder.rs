//! Sink for per-call telemetry fields.

/// Field holding the JSON encoding of the resolved argument.
pub const FIELD_ARGUMENT: &str = "methodCallArgument";

/// Field holding the JSON encoding of what was written, or `null`.
pub const FIELD_RESPONSE_DATA: &str = "methodCallResponseData";

/// Field holding the wall-clock time at which the call started.
pub const FIELD_BEGIN_TIME: &str = "methodCallBeginTime";

/// Field holding the call duration in seconds.
pub const FIELD_DURATION: &str = "methodCallDuration";

/// Receives named string fields after each successful resolution.
///
/// How the fields are stored is up to the implementation. Closures with the
/// matching signature implement the trait.
///
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use hermes_core::CallRecorder;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let sink = seen.clone();
/// let recorder = move |field: &str, value: &str| {
///     sink.lock().unwrap().push((field.to_string(), value.to_string()));
/// };
///
/// recorder.record("methodCallDuration", "0.25");
/// assert_eq!(seen.lock().unwrap().len(), 1);
/// ```
pub trait CallRecorder: Send + Sync {
    /// Records one field.
    fn record(&self, field: &str, value: &str);
}

impl<F> CallRecorder for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn record(&self, field: &str, value: &str) {
        self(field, value);
    }
}
