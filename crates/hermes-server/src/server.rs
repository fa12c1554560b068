//! HTTP server implementation.
//!
//! The server consists of:
//!
//! - a TCP listener bound to the configured address
//! - one Tokio task per connection, served by hyper's HTTP/1 implementation
//! - request routing via the [`Router`]
//! - graceful shutdown driven by a [`ShutdownSignal`]
//!
//! Each request body is collected up to `max_body_bytes` before the endpoint
//! runs. The endpoint receives an [`InboundRequest`] carrying the peer
//! address and a cancellation token that fires when the request finishes,
//! when its connection goes away or when shutdown begins.
//!
//! # Example
//!
//! ```rust,no_run
//! use hermes_core::CallContext;
//! use hermes_server::{Router, Server, ServerConfig};
//! use hermes_service::{ServiceHandler, ServiceOptions};
//! use http::Method;
//! use std::collections::HashMap;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! async fn echo(_ctx: CallContext, args: HashMap<String, String>) -> HashMap<String, String> {
//!     args
//! }
//!
//! let mut router = Router::new();
//! router.add(Method::POST, "/echo", ServiceHandler::bind(echo, ServiceOptions::default())?)?;
//!
//! let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
//! Server::new(config, router).run().await?;
//! # Ok(())
//! # }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use hermes_core::{FormattedResponse, ResponseWriter};
use hermes_extract::InboundRequest;
use hermes_service::{format, CallTrace};
use http::{header, HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::{ServerConfig, ServerConfigBuilder};
use crate::error::ServerError;
use crate::router::{Lookup, Router};
use crate::shutdown::ShutdownSignal;

/// Type alias for HTTP response body.
pub type ResponseBody = Full<Bytes>;

/// Type alias for the HTTP response.
pub type HttpResponse = Response<ResponseBody>;

/// `msg` of the envelope for unmatched paths.
pub const MSG_NOT_FOUND: &str = "not found";

/// `msg` of the envelope for a path registered under other methods.
pub const MSG_METHOD_NOT_ALLOWED: &str = "method not allowed";

/// `msg` of the envelope for bodies over the configured limit.
pub const MSG_BODY_TOO_LARGE: &str = "request body too large";

/// `msg` of the envelope for bodies that could not be read.
pub const MSG_READ_BODY_FAILED: &str = "read request body failed";

/// `msg` of the envelope for bodies that did not arrive in time.
pub const MSG_REQUEST_TIMEOUT: &str = "request timeout";

/// `msg` of the envelope for endpoints that did not finish in time.
pub const MSG_CALL_TIMEOUT: &str = "service method timed out";

/// The Hermes HTTP server.
pub struct Server {
    config: ServerConfig,
    router: Router,
}

impl Server {
    /// Creates a server serving `router` with `config`.
    #[must_use]
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self { config, router }
    }

    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Runs the server until SIGINT or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address is invalid or cannot be
    /// bound.
    pub async fn run(self) -> Result<(), ServerError> {
        let shutdown = ShutdownSignal::with_os_signals();
        self.run_with_shutdown(shutdown).await
    }

    /// Binds the configured address and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address is invalid or cannot be
    /// bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = self
            .config
            .socket_addr()
            .map_err(|e| ServerError::InvalidAddress {
                addr: self.config.http_addr().to_string(),
                reason: e.to_string(),
            })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        self.serve(listener, shutdown).await
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// fires, then waits up to the shutdown timeout for open connections.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener's local address cannot be read.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, routes = self.router.len(), "Server listening");

        let server = Arc::new(self);
        let connections = TaskTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            let server = Arc::clone(&server);
                            let shutdown = shutdown.clone();

                            connections.spawn(async move {
                                if let Err(e) = server.handle_connection(stream, remote_addr, shutdown).await {
                                    tracing::debug!(remote = %remote_addr, error = %e, "Connection error");
                                }
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to accept connection");
                        }
                    }
                }

                () = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        drop(listener);
        connections.close();

        let shutdown_timeout = server.config.shutdown_timeout();
        tracing::info!(
            timeout = ?shutdown_timeout,
            active = connections.len(),
            "Waiting for open connections"
        );

        tokio::select! {
            () = connections.wait() => {
                tracing::info!("All connections closed");
            }
            () = tokio::time::sleep(shutdown_timeout) => {
                tracing::warn!(
                    active = connections.len(),
                    "Shutdown timeout reached with connections still open"
                );
            }
        }

        tracing::info!("Server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let connection = shutdown.child_token();
        let _cancel_on_close = connection.clone().drop_guard();

        let io = TokioIo::new(stream);
        let server = Arc::clone(&self);
        let service = service_fn(move |req: Request<Incoming>| {
            let server = Arc::clone(&server);
            let cancellation = connection.child_token();
            async move {
                Ok::<_, Infallible>(server.handle_request(req, remote_addr, cancellation).await)
            }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => return result,
            () = shutdown.recv() => {
                tracing::debug!(remote = %remote_addr, "Closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
            }
        }

        conn.await
    }

    async fn handle_request(
        &self,
        req: Request<Incoming>,
        remote_addr: SocketAddr,
        cancellation: CancellationToken,
    ) -> HttpResponse {
        let _cancel_when_done = cancellation.clone().drop_guard();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        tracing::debug!(%method, %path, remote = %remote_addr, "Request received");

        if method == Method::GET && self.config.metrics_path() == Some(path.as_str()) {
            return metrics_response();
        }

        let found = match self.router.lookup(&method, &path) {
            Lookup::Found(found) => found,
            Lookup::MethodNotAllowed(allowed) => {
                let mut response = envelope(StatusCode::METHOD_NOT_ALLOWED, MSG_METHOD_NOT_ALLOWED);
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
                return response;
            }
            Lookup::NotFound => return envelope(StatusCode::NOT_FOUND, MSG_NOT_FOUND),
        };
        let endpoint = Arc::clone(found.endpoint());
        let params = found.into_params();

        let (parts, body) = req.into_parts();
        let limit = self.config.max_body_bytes();
        let collected =
            tokio::time::timeout(self.config.request_timeout(), Limited::new(body, limit).collect())
                .await;

        let body = match collected {
            Ok(Ok(collected)) => collected.to_bytes(),
            Ok(Err(e)) if e.downcast_ref::<LengthLimitError>().is_some() => {
                tracing::warn!(%method, %path, limit, "Request body too large");
                return envelope_with(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    MSG_BODY_TOO_LARGE,
                    Value::String(format!("request body exceeds {limit} bytes")),
                );
            }
            Ok(Err(e)) => {
                tracing::warn!(%method, %path, error = %e, "Failed to read request body");
                return envelope_with(
                    StatusCode::BAD_REQUEST,
                    MSG_READ_BODY_FAILED,
                    Value::String(e.to_string()),
                );
            }
            Err(_) => {
                tracing::warn!(%method, %path, "Request body collection timed out");
                return envelope(StatusCode::REQUEST_TIMEOUT, MSG_REQUEST_TIMEOUT);
            }
        };

        let mut request = Request::from_parts(parts, body);
        request.extensions_mut().insert(remote_addr);
        request.extensions_mut().insert(cancellation);
        let inbound = InboundRequest::from(request);

        match tokio::time::timeout(self.config.request_timeout(), endpoint.call(inbound, params))
            .await
        {
            Ok(response) => response.map(Full::new),
            Err(_) => {
                tracing::warn!(
                    %method,
                    %path,
                    endpoint = endpoint.name(),
                    "Service method timed out"
                );
                envelope(StatusCode::GATEWAY_TIMEOUT, MSG_CALL_TIMEOUT)
            }
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("router", &self.router)
            .finish()
    }
}

fn envelope(status: StatusCode, msg: &str) -> HttpResponse {
    envelope_with(status, msg, Value::Null)
}

fn envelope_with(status: StatusCode, msg: &str, data: Value) -> HttpResponse {
    let writer = ResponseWriter::new();
    let response = FormattedResponse::new(status.as_u16(), msg, data);
    format::write_envelope(&writer, &CallTrace::disabled(), &response);
    writer.take_response().map(Full::new)
}

fn metrics_response() -> HttpResponse {
    match hermes_telemetry::render_metrics() {
        Some(text) => Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Full::new(Bytes::from(text)))
            .unwrap_or_else(|_| Response::new(Full::default())),
        None => envelope(StatusCode::NOT_FOUND, MSG_NOT_FOUND),
    }
}

/// Builder for configuring and creating a [`Server`].
///
/// # Example
///
/// ```rust
/// use hermes_server::{Router, Server};
/// use std::time::Duration;
///
/// let server = Server::builder()
///     .http_addr("127.0.0.1:0")
///     .shutdown_timeout(Duration::from_secs(5))
///     .router(Router::new())
///     .build();
///
/// assert_eq!(server.config().http_addr(), "127.0.0.1:0");
/// ```
#[derive(Debug, Default)]
pub struct ServerBuilder {
    config_builder: ServerConfigBuilder,
    router: Router,
}

impl ServerBuilder {
    /// Creates a new server builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: &ServerConfig) -> Self {
        let mut builder = ServerConfigBuilder::new()
            .http_addr(config.http_addr())
            .shutdown_timeout(config.shutdown_timeout())
            .request_timeout(config.request_timeout())
            .max_body_bytes(config.max_body_bytes());
        if let Some(path) = config.metrics_path() {
            builder = builder.metrics_path(path);
        }
        self.config_builder = builder;
        self
    }

    /// Sets the router.
    #[must_use]
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Sets the HTTP bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.http_addr(addr);
        self
    }

    /// Sets the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.shutdown_timeout(timeout);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.request_timeout(timeout);
        self
    }

    /// Sets the request body limit in bytes.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config_builder = self.config_builder.max_body_bytes(limit);
        self
    }

    /// Serves the Prometheus exposition on `GET path`.
    #[must_use]
    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.metrics_path(path);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server::new(self.config_builder.build(), self.router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_new() {
        let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
        let server = Server::new(config, Router::new());
        assert_eq!(server.config().http_addr(), "127.0.0.1:8080");
        assert!(server.router().is_empty());
    }

    #[test]
    fn test_builder_config_copies_every_field() {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:1")
            .shutdown_timeout(Duration::from_secs(1))
            .request_timeout(Duration::from_secs(2))
            .max_body_bytes(3)
            .metrics_path("/m")
            .build();
        let server = Server::builder().config(&config).build();
        assert_eq!(server.config(), &config);
    }

    #[test]
    fn test_not_found_envelope() {
        let response = envelope(StatusCode::NOT_FOUND, MSG_NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_envelope_body() {
        let response = envelope_with(
            StatusCode::PAYLOAD_TOO_LARGE,
            MSG_BODY_TOO_LARGE,
            Value::String("too big".to_string()),
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(
            body.as_ref(),
            b"{\"code\":413,\"msg\":\"request body too large\",\"data\":\"too big\"}\n"
        );
    }

    #[tokio::test]
    async fn test_run_with_invalid_address() {
        let server = Server::builder().http_addr("nonsense").build();
        let err = server
            .run_with_shutdown(ShutdownSignal::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress { .. }));
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let server = Server::builder().shutdown_timeout(Duration::from_secs(1)).build();
        tokio::time::timeout(Duration::from_secs(2), server.serve(listener, shutdown))
            .await
            .expect("serve returns after shutdown")
            .unwrap();
    }
}
