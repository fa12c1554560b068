//! Per-call context handed to every service method.

use std::net::SocketAddr;

use bytes::Bytes;
use http::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::writer::ResponseWriter;

/// Everything a service method may need to know about the call besides its
/// argument.
///
/// The context is built by the adapter for a single call and dropped when the
/// call ends. Cloning is cheap: the response writer and the cancellation token
/// are shared handles, the inbound body is reference counted.
///
/// # Example
///
/// ```rust
/// use hermes_core::{CallContext, ResponseWriter};
/// use tokio_util::sync::CancellationToken;
///
/// let ctx = CallContext::builder()
///     .remote_addr("127.0.0.1:9000".parse().unwrap())
///     .build();
///
/// assert!(!ctx.is_cancelled());
/// assert_eq!(ctx.remote_addr().unwrap().port(), 9000);
/// ```
#[derive(Debug, Clone)]
pub struct CallContext {
    cancellation: CancellationToken,
    remote_addr: Option<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
    writer: ResponseWriter,
}

impl CallContext {
    /// Starts building a context.
    #[must_use]
    pub fn builder() -> CallContextBuilder {
        CallContextBuilder::default()
    }

    /// Cancellation signal of the inbound request.
    ///
    /// The token is cancelled when the client goes away or the server starts
    /// shutting down. Long-running methods should select on
    /// [`CancellationToken::cancelled`].
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Shorthand for `self.cancellation().is_cancelled()`.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Address of the peer, when the transport knows it.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Inbound request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw inbound body.
    ///
    /// With request bypass enabled this is the only place the method finds
    /// JSON payloads, since the adapter leaves them undecoded.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Outbound response sink, shared with the adapter.
    #[must_use]
    pub fn writer(&self) -> &ResponseWriter {
        &self.writer
    }
}

/// Builder for [`CallContext`].
#[derive(Debug, Default)]
pub struct CallContextBuilder {
    cancellation: Option<CancellationToken>,
    remote_addr: Option<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
    writer: Option<ResponseWriter>,
}

impl CallContextBuilder {
    /// Sets the cancellation token. A fresh token is used otherwise.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Sets the inbound headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the inbound body.
    #[must_use]
    pub fn body(mut self, body: Bytes) -> Self {
        self.body = body;
        self
    }

    /// Sets the response writer. A fresh writer is used otherwise.
    #[must_use]
    pub fn writer(mut self, writer: ResponseWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    /// Builds the context.
    #[must_use]
    pub fn build(self) -> CallContext {
        CallContext {
            cancellation: self.cancellation.unwrap_or_default(),
            remote_addr: self.remote_addr,
            headers: self.headers,
            body: self.body,
            writer: self.writer.unwrap_or_default(),
        }
    }
}
