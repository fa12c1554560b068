//! Server error types.

use http::Method;
use thiserror::Error;

/// Errors raised while registering routes or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address is not a socket address.
    #[error("invalid address '{addr}': {reason}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Why it did not parse.
        reason: String,
    },

    /// The listener could not be bound.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// The address that was tried.
        addr: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A route pattern is malformed.
    #[error("invalid route '{pattern}': {reason}")]
    InvalidRoute {
        /// The rejected pattern.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The same method and pattern were registered twice.
    #[error("duplicate route {method} {pattern}")]
    DuplicateRoute {
        /// The HTTP method.
        method: Method,
        /// The path pattern.
        pattern: String,
    },

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub(crate) fn invalid_route(pattern: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRoute {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerError::DuplicateRoute {
            method: Method::GET,
            pattern: "/users/{id}".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate route GET /users/{id}");

        let err = ServerError::invalid_route("/files/*rest/x", "catch-all must be last");
        assert_eq!(
            err.to_string(),
            "invalid route '/files/*rest/x': catch-all must be last"
        );
    }

    #[test]
    fn test_io_error_from() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let err = ServerError::from(io);
        assert!(matches!(err, ServerError::Io(_)));
    }
}
