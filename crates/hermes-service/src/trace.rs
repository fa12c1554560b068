//! Per-call trace.
//!
//! Every call runs inside a `hermes.service` span. The formatter leaves
//! free-text annotations on it and flags it when the response is an error.

use std::fmt::Display;

use hermes_extract::InboundRequest;
use tracing::{field, Span};

/// Name of the span wrapping each call.
pub const SPAN_NAME: &str = "hermes.service";

/// Handle to the span of one call.
#[derive(Debug, Clone)]
pub struct CallTrace {
    span: Span,
}

impl CallTrace {
    /// Opens the span for a request handled by `service`.
    pub fn new(service: &str, request: &InboundRequest) -> Self {
        let span = tracing::info_span!(
            "hermes.service",
            service = %service,
            path = %request.path(),
            method = %request.method(),
            error = field::Empty,
        );
        Self { span }
    }

    /// A trace that records nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            span: Span::none(),
        }
    }

    /// The underlying span.
    #[must_use]
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Leaves a free-text note on the trace.
    pub fn annotate(&self, note: impl Display) {
        tracing::debug!(parent: &self.span, "{}", note);
    }

    /// Marks the call as failed.
    pub fn set_error(&self) {
        self.span.record("error", true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_trace_accepts_calls() {
        let trace = CallTrace::disabled();
        trace.annotate("ok: null");
        trace.set_error();
        assert!(trace.span().is_disabled());
    }

    #[test]
    fn test_new_trace() {
        let request = InboundRequest::builder().uri("/users/7").build();
        let trace = CallTrace::new("users.get", &request);
        trace.annotate(format_args!("{}: {}", "ok", 1));
    }
}
