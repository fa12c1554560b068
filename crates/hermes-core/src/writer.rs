//! Outbound response sink shared between a service method and the adapter.
//!
//! A [`ResponseWriter`] is a cheap, cloneable handle. The adapter keeps one
//! clone to write the envelope, and the [`CallContext`](crate::CallContext)
//! carries another so that methods running in bypass mode can stream their own
//! body. The status line can be committed once; later attempts are ignored.

use std::io;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Response, StatusCode};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct WriterState {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

/// Shared handle to the response under construction.
///
/// # Example
///
/// ```rust
/// use hermes_core::ResponseWriter;
/// use http::StatusCode;
///
/// let writer = ResponseWriter::new();
/// writer.write_header(StatusCode::CREATED);
/// writer.write(b"{}");
///
/// let response = writer.take_response();
/// assert_eq!(response.status(), StatusCode::CREATED);
/// assert_eq!(response.body().as_ref(), b"{}");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseWriter {
    state: Arc<Mutex<WriterState>>,
}

impl ResponseWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the outbound headers.
    #[must_use]
    pub fn headers(&self) -> HeaderMap {
        self.state.lock().headers.clone()
    }

    /// Edits the outbound headers in place.
    ///
    /// The lock is not held while `f` runs, so `f` may use this writer (or
    /// any clone) freely. Headers set through other calls while `f` runs win
    /// over the edited map.
    ///
    /// Headers changed after the status line is committed are still part of
    /// the final response, since nothing reaches the transport before
    /// [`take_response`](Self::take_response).
    pub fn with_headers<R>(&self, f: impl FnOnce(&mut HeaderMap) -> R) -> R {
        let mut headers = std::mem::take(&mut self.state.lock().headers);
        let result = f(&mut headers);

        let mut state = self.state.lock();
        let concurrent = std::mem::replace(&mut state.headers, headers);
        state.headers.extend(concurrent);
        result
    }

    /// Sets a single header, replacing previous values.
    pub fn set_header(&self, name: HeaderName, value: HeaderValue) {
        self.state.lock().headers.insert(name, value);
    }

    /// Commits the status line.
    ///
    /// Returns `false` (and leaves the response untouched) if a status was
    /// already committed.
    pub fn write_header(&self, status: StatusCode) -> bool {
        let mut state = self.state.lock();
        if let Some(existing) = state.status {
            tracing::warn!(
                existing = existing.as_u16(),
                ignored = status.as_u16(),
                "superfluous write_header call"
            );
            return false;
        }
        state.status = Some(status);
        true
    }

    /// Appends bytes to the body, committing `200 OK` if no status was set.
    pub fn write(&self, data: &[u8]) {
        let mut state = self.state.lock();
        state.status.get_or_insert(StatusCode::OK);
        state.body.extend_from_slice(data);
    }

    /// Status committed so far, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.state.lock().status
    }

    /// Whether a status line or any body byte has been written.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.state.lock().status.is_some()
    }

    /// Number of body bytes written so far.
    #[must_use]
    pub fn body_len(&self) -> usize {
        self.state.lock().body.len()
    }

    /// Drains the writer into an HTTP response.
    ///
    /// An untouched writer yields an empty `200 OK`. Other clones of this
    /// handle observe an empty writer afterwards.
    #[must_use]
    pub fn take_response(&self) -> Response<Bytes> {
        let state = std::mem::take(&mut *self.state.lock());
        let mut response = Response::new(state.body.freeze());
        *response.status_mut() = state.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = state.headers;
        response
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ResponseWriter::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Write for &ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ResponseWriter::write(self, buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;
    use std::io::Write as _;

    #[test]
    fn test_untouched_writer_is_empty_ok() {
        let writer = ResponseWriter::new();
        assert!(!writer.is_committed());

        let response = writer.take_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.body().is_empty());
    }

    #[test]
    fn test_first_status_wins() {
        let writer = ResponseWriter::new();
        assert!(writer.write_header(StatusCode::FORBIDDEN));
        assert!(!writer.write_header(StatusCode::OK));
        assert_eq!(writer.status(), Some(StatusCode::FORBIDDEN));
    }

    #[test]
    fn test_write_commits_ok() {
        let writer = ResponseWriter::new();
        writer.write(b"abc");
        assert_eq!(writer.status(), Some(StatusCode::OK));
        assert_eq!(writer.body_len(), 3);
    }

    #[test]
    fn test_clones_share_state() {
        let writer = ResponseWriter::new();
        let method_side = writer.clone();

        method_side.set_header(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
        let mut sink = &method_side;
        sink.write_all(b"a,b\n").unwrap();

        let response = writer.take_response();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/csv");
        assert_eq!(response.body().as_ref(), b"a,b\n");
    }

    #[test]
    fn test_with_headers_allows_writes_inside() {
        let writer = ResponseWriter::new();
        let method_side = writer.clone();

        let len = writer.with_headers(|headers| {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            method_side.write(b"inside");
            method_side.set_header(
                HeaderName::from_static("x-trace"),
                HeaderValue::from_static("1"),
            );
            headers.len()
        });
        assert_eq!(len, 1);

        let response = writer.take_response();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(response.headers()["x-trace"], "1");
        assert_eq!(response.body().as_ref(), b"inside");
    }

    #[test]
    fn test_concurrent_set_header_wins_over_edit() {
        let writer = ResponseWriter::new();
        writer.with_headers(|headers| {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
            writer.set_header(CONTENT_TYPE, HeaderValue::from_static("text/csv"));
        });
        assert_eq!(writer.headers()[CONTENT_TYPE], "text/csv");
    }

    #[test]
    fn test_headers_is_a_snapshot() {
        let writer = ResponseWriter::new();
        let mut copy = writer.headers();
        copy.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        writer.write(b"x");
        assert!(writer.headers().is_empty());
    }

    #[test]
    fn test_json_encoder_into_writer() {
        let mut writer = ResponseWriter::new();
        serde_json::to_writer(&mut writer, &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(writer.take_response().body().as_ref(), br#"{"a":1}"#);
    }
}
