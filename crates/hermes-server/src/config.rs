//! Server configuration types.
//!
//! # Example
//!
//! ```rust
//! use hermes_server::ServerConfig;
//! use std::time::Duration;
//!
//! let config = ServerConfig::builder()
//!     .http_addr("127.0.0.1:3000")
//!     .shutdown_timeout(Duration::from_secs(10))
//!     .max_body_bytes(64 * 1024)
//!     .build();
//!
//! assert_eq!(config.http_addr(), "127.0.0.1:3000");
//! assert_eq!(config.max_body_bytes(), 64 * 1024);
//! ```

use std::net::SocketAddr;
use std::time::Duration;

/// Default HTTP bind address.
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:8080";

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default limit for collected request bodies (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Server configuration.
///
/// Use [`ServerConfig::builder()`] to construct instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// HTTP bind address
    http_addr: String,

    /// How long to wait for open connections once shutdown begins
    shutdown_timeout: Duration,

    /// Upper bound for reading the body and for running the endpoint
    request_timeout: Duration,

    /// Largest body the server collects before answering 413
    max_body_bytes: usize,

    /// Path serving the Prometheus exposition, if any
    metrics_path: Option<String>,
}

impl ServerConfig {
    /// Creates a new server configuration builder.
    #[must_use]
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Returns the HTTP bind address.
    #[must_use]
    pub fn http_addr(&self) -> &str {
        &self.http_addr
    }

    /// Parses the HTTP address as a `SocketAddr`.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.http_addr.parse()
    }

    /// Returns the graceful shutdown timeout.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        self.shutdown_timeout
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Returns the request body limit in bytes.
    #[must_use]
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Returns the metrics path, if metrics are exposed.
    #[must_use]
    pub fn metrics_path(&self) -> Option<&str> {
        self.metrics_path.as_deref()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Clone)]
pub struct ServerConfigBuilder {
    http_addr: String,
    shutdown_timeout: Duration,
    request_timeout: Duration,
    max_body_bytes: usize,
    metrics_path: Option<String>,
}

impl ServerConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            metrics_path: None,
        }
    }

    /// Sets the HTTP bind address (e.g. "0.0.0.0:8080", "127.0.0.1:0").
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        self.http_addr = addr.into();
        self
    }

    /// Sets the graceful shutdown timeout.
    ///
    /// This is the maximum time the server waits for open connections to
    /// finish once shutdown has been triggered.
    #[must_use]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    ///
    /// Applies separately to body collection (408 on expiry) and to the
    /// endpoint call (504 on expiry).
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the request body limit in bytes.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Serves the Prometheus exposition on `GET path`.
    #[must_use]
    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> ServerConfig {
        ServerConfig {
            http_addr: self.http_addr,
            shutdown_timeout: self.shutdown_timeout,
            request_timeout: self.request_timeout,
            max_body_bytes: self.max_body_bytes,
            metrics_path: self.metrics_path,
        }
    }
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr(), DEFAULT_HTTP_ADDR);
        assert_eq!(
            config.shutdown_timeout(),
            Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS)
        );
        assert_eq!(
            config.request_timeout(),
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
        );
        assert_eq!(config.max_body_bytes(), DEFAULT_MAX_BODY_BYTES);
        assert!(config.metrics_path().is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ServerConfig::builder()
            .http_addr("127.0.0.1:9000")
            .shutdown_timeout(Duration::from_secs(5))
            .request_timeout(Duration::from_millis(250))
            .max_body_bytes(16)
            .metrics_path("/metrics")
            .build();

        assert_eq!(config.http_addr(), "127.0.0.1:9000");
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.request_timeout(), Duration::from_millis(250));
        assert_eq!(config.max_body_bytes(), 16);
        assert_eq!(config.metrics_path(), Some("/metrics"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig::builder().http_addr("127.0.0.1:8080").build();
        assert_eq!(config.socket_addr().unwrap().port(), 8080);

        let config = ServerConfig::builder().http_addr("not an address").build();
        assert!(config.socket_addr().is_err());
    }
}
