//! Inbound request as seen by the argument resolver.
//!
//! The [`InboundRequest`] is transport independent: the server (or a test)
//! hands over an already collected body together with the peer address and a
//! cancellation token.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{header, HeaderMap, Method, Uri};
use tokio_util::sync::CancellationToken;

/// An HTTP request with a fully buffered body.
///
/// # Example
///
/// ```rust
/// use hermes_extract::InboundRequest;
/// use http::Method;
///
/// let req = InboundRequest::builder()
///     .method(Method::POST)
///     .uri("/users?active=true")
///     .header("content-type", "application/json; charset=utf-8")
///     .body(r#"{"name": "Alice"}"#)
///     .build();
///
/// assert!(req.is_body_bearing());
/// assert!(req.is_json());
/// assert_eq!(req.query_string(), Some("active=true"));
/// ```
#[derive(Debug, Clone)]
pub struct InboundRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    cancellation: CancellationToken,
}

impl InboundRequest {
    /// Creates a request from its parts.
    #[must_use]
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            uri,
            headers,
            body,
            remote_addr: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Starts building a request.
    #[must_use]
    pub fn builder() -> InboundRequestBuilder {
        InboundRequestBuilder::default()
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path portion of the URI.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Returns the query string if present.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the peer address, if known.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the cancellation token of this request.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Whether the method carries a body that may contribute to the argument.
    ///
    /// Only POST, PUT and PATCH qualify.
    #[must_use]
    pub fn is_body_bearing(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH
    }

    /// Whether the Content-Type starts with `application/json`, ignoring
    /// ASCII case.
    #[must_use]
    pub fn is_json(&self) -> bool {
        let prefix = mime::APPLICATION_JSON.essence_str();
        self.content_type().is_some_and(|ct| {
            ct.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
    }

    /// Whether the Content-Type is `multipart/form-data`.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.essence() == Some(mime::MULTIPART_FORM_DATA.essence_str().to_string())
    }

    /// Whether the Content-Type is `application/x-www-form-urlencoded`.
    #[must_use]
    pub fn is_form_urlencoded(&self) -> bool {
        self.essence() == Some(mime::APPLICATION_WWW_FORM_URLENCODED.essence_str().to_string())
    }

    fn essence(&self) -> Option<String> {
        self.content_type()
            .and_then(|ct| ct.parse::<mime::Mime>().ok())
            .map(|m| m.essence_str().to_ascii_lowercase())
    }
}

impl From<http::Request<Bytes>> for InboundRequest {
    fn from(request: http::Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        let mut inbound = Self::new(parts.method, parts.uri, parts.headers, body);
        inbound.remote_addr = parts.extensions.get::<SocketAddr>().copied();
        if let Some(token) = parts.extensions.get::<CancellationToken>() {
            inbound.cancellation = token.clone();
        }
        inbound
    }
}

/// Builder for [`InboundRequest`].
#[derive(Debug, Default)]
pub struct InboundRequestBuilder {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    cancellation: Option<CancellationToken>,
}

impl InboundRequestBuilder {
    /// Sets the HTTP method. Defaults to GET.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the URI. Unparsable URIs leave the previous value in place.
    #[must_use]
    pub fn uri(mut self, uri: &str) -> Self {
        if let Ok(uri) = uri.parse() {
            self.uri = uri;
        }
        self
    }

    /// Sets all headers.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Adds a single header. Invalid values are skipped.
    #[must_use]
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = value.parse() {
            self.headers.insert(name, value);
        }
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Sets the cancellation token.
    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Builds the request.
    #[must_use]
    pub fn build(self) -> InboundRequest {
        InboundRequest {
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            body: self.body,
            remote_addr: self.remote_addr,
            cancellation: self.cancellation.unwrap_or_default(),
        }
    }
}
