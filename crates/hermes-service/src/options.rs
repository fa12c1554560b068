//! Per-handler settings.

use std::fmt;
use std::sync::Arc;

use hermes_core::CallRecorder;
use hermes_extract::{MultipartConfig, ResolverConfig, DEFAULT_MAX_BODY_SIZE};

/// Settings fixed when a handler is bound.
///
/// # Example
///
/// ```rust
/// use hermes_service::ServiceOptions;
/// use hermes_telemetry::MemoryRecorder;
///
/// let options = ServiceOptions::new()
///     .recorder(MemoryRecorder::new())
///     .bypass_response_body(true);
///
/// assert!(options.has_recorder());
/// assert!(!options.bypass_request_body);
/// ```
#[derive(Clone)]
pub struct ServiceOptions {
    /// Receives the per-call fields after every resolved call.
    pub recorder: Option<Arc<dyn CallRecorder>>,
    /// Leave JSON request bodies to the method instead of decoding them.
    pub bypass_request_body: bool,
    /// Leave the response body to the method when it returns a plain value.
    pub bypass_response_body: bool,
    /// Maximum size of a JSON or urlencoded request body.
    pub max_body_size: usize,
    /// Multipart limits.
    pub multipart: MultipartConfig,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            recorder: None,
            bypass_request_body: false,
            bypass_response_body: false,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            multipart: MultipartConfig::default(),
        }
    }
}

impl ServiceOptions {
    /// Options with no recorder and both bypass flags off.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the call recorder.
    pub fn recorder(mut self, recorder: impl CallRecorder + 'static) -> Self {
        self.recorder = Some(Arc::new(recorder));
        self
    }

    /// Sets a shared call recorder.
    pub fn shared_recorder(mut self, recorder: Arc<dyn CallRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// Sets the request-body bypass flag.
    pub fn bypass_request_body(mut self, bypass: bool) -> Self {
        self.bypass_request_body = bypass;
        self
    }

    /// Sets the response-body bypass flag.
    pub fn bypass_response_body(mut self, bypass: bool) -> Self {
        self.bypass_response_body = bypass;
        self
    }

    /// Sets the maximum JSON or urlencoded body size.
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Sets the multipart limits.
    pub fn multipart(mut self, config: MultipartConfig) -> Self {
        self.multipart = config;
        self
    }

    /// Whether a recorder is configured.
    #[must_use]
    pub fn has_recorder(&self) -> bool {
        self.recorder.is_some()
    }

    pub(crate) fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            max_body_size: self.max_body_size,
            multipart: self.multipart.clone(),
            bypass_request_body: self.bypass_request_body,
        }
    }
}

impl fmt::Debug for ServiceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceOptions")
            .field("recorder", &self.recorder.as_ref().map(|_| "<recorder>"))
            .field("bypass_request_body", &self.bypass_request_body)
            .field("bypass_response_body", &self.bypass_response_body)
            .field("max_body_size", &self.max_body_size)
            .field("multipart", &self.multipart)
            .finish()
    }
}
