//! The `{code, msg, data}` wire envelope.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message used when argument resolution fails.
pub const MSG_PARSE_ARGUMENT_FAILED: &str = "parse argument failed";

/// Message used when the service method panics.
pub const MSG_METHOD_PANICKED: &str = "service method panicked";

/// Message used when the service method returns a failure value.
pub const MSG_METHOD_ERROR: &str = "service method error";

/// Message used when a raw return value cannot be encoded as JSON.
pub const MSG_ENCODE_FAILED: &str = "encode response failed";

/// Canonical response envelope.
///
/// A service method may return one of these directly to control the status
/// line and payload. Every return value that is not already an envelope and
/// describes a failure gets wrapped into one by the adapter.
///
/// ```json
/// {"code": 403, "msg": "forbidden", "data": null}
/// ```
///
/// # Example
///
/// ```rust
/// use hermes_core::FormattedResponse;
///
/// let resp = FormattedResponse::new(403, "forbidden", serde_json::Value::Null);
/// assert_eq!(resp.status(), http::StatusCode::FORBIDDEN);
/// assert!(resp.is_error());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedResponse {
    /// HTTP status code written on the status line.
    pub code: u16,
    /// Short human-readable message.
    pub msg: String,
    /// Arbitrary payload.
    pub data: Value,
}

impl FormattedResponse {
    /// Creates an envelope from its parts.
    #[must_use]
    pub fn new(code: u16, msg: impl Into<String>, data: Value) -> Self {
        Self {
            code,
            msg: msg.into(),
            data,
        }
    }

    /// Creates a `200 ok` envelope carrying `data`.
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self::new(200, "ok", data)
    }

    /// Creates an envelope whose payload is the JSON encoding of `data`.
    pub fn with_data<T: Serialize>(
        code: u16,
        msg: impl Into<String>,
        data: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(code, msg, serde_json::to_value(data)?))
    }

    /// Status line for this envelope.
    ///
    /// Codes outside the valid HTTP range fall back to 500.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Whether the status line reports a client or server error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status().as_u16() >= 400
    }

    /// Rewrites a code that is not a valid HTTP status to 500, so the body
    /// agrees with the status line that gets sent.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let status = self.status().as_u16();
        if status != self.code {
            tracing::warn!(code = self.code, msg = %self.msg, "envelope code is not an HTTP status, sending 500");
            self.code = status;
        }
        self
    }
}
