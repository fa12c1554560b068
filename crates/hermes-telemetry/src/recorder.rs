//! Ready-made [`CallRecorder`] sinks.
//!
//! [`TracingRecorder`] turns every recorded field into a log event.
//! [`MemoryRecorder`] keeps fields in memory so tests and diagnostics pages
//! can inspect the most recent calls.

use std::sync::Arc;

use hermes_core::CallRecorder;
use parking_lot::Mutex;

/// Emits each recorded field as an `info` event under `hermes::calls`.
#[derive(Debug, Clone, Default)]
pub struct TracingRecorder {
    service: Option<String>,
}

impl TracingRecorder {
    /// Recorder without a service name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorder that tags every event with `service`.
    #[must_use]
    pub fn for_service(service: impl Into<String>) -> Self {
        Self {
            service: Some(service.into()),
        }
    }
}

impl CallRecorder for TracingRecorder {
    fn record(&self, field: &str, value: &str) {
        match &self.service {
            Some(service) => tracing::info!(
                target: "hermes::calls",
                service = %service,
                field = field,
                value = value,
                "call field"
            ),
            None => tracing::info!(target: "hermes::calls", field = field, value = value, "call field"),
        }
    }
}

/// Stores recorded fields in insertion order.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecorder {
    fields: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every field recorded so far.
    #[must_use]
    pub fn fields(&self) -> Vec<(String, String)> {
        self.fields.lock().clone()
    }

    /// The last value recorded under `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<String> {
        self.fields
            .lock()
            .iter()
            .rev()
            .find(|(f, _)| f == field)
            .map(|(_, v)| v.clone())
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.lock().is_empty()
    }

    /// Drops every recorded field.
    pub fn clear(&self) {
        self.fields.lock().clear();
    }
}

impl CallRecorder for MemoryRecorder {
    fn record(&self, field: &str, value: &str) {
        self.fields.lock().push((field.to_string(), value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::recorder::{FIELD_ARGUMENT, FIELD_DURATION};

    #[test]
    fn test_memory_recorder_keeps_order() {
        let recorder = MemoryRecorder::new();
        recorder.record(FIELD_ARGUMENT, "{}");
        recorder.record(FIELD_DURATION, "0.5");
        recorder.record(FIELD_DURATION, "0.7");

        assert_eq!(recorder.fields().len(), 3);
        assert_eq!(recorder.fields()[0].0, FIELD_ARGUMENT);
        assert_eq!(recorder.get(FIELD_DURATION).as_deref(), Some("0.7"));
        assert!(recorder.get("missing").is_none());
    }

    #[test]
    fn test_memory_recorder_clones_share_storage() {
        let recorder = MemoryRecorder::new();
        let clone = recorder.clone();
        clone.record("a", "1");
        assert!(!recorder.is_empty());
        recorder.clear();
        assert!(clone.is_empty());
    }

    #[test]
    fn test_tracing_recorder_as_trait_object() {
        let recorders: Vec<Arc<dyn CallRecorder>> = vec![
            Arc::new(TracingRecorder::new()),
            Arc::new(TracingRecorder::for_service("users.get")),
        ];
        for recorder in recorders {
            recorder.record(FIELD_ARGUMENT, "null");
        }
    }
}
