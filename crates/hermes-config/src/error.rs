//! Errors raised while assembling a [`HermesConfig`](crate::HermesConfig).

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// [`ConfigLoader::with_file`](crate::ConfigLoader::with_file) was given a
    /// path that does not exist.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path as given.
        path: PathBuf,
    },

    /// The file exists but reading it failed.
    #[error("cannot read {path}")]
    Read {
        /// The file.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The format (or file extension) is neither `toml` nor `json`.
    #[error("unsupported configuration file format `{format}`, expected toml or json")]
    UnsupportedFormat {
        /// The format as given, lowercased.
        format: String,
    },

    /// Malformed TOML, or a `[section]` key the schema does not know.
    #[error("bad TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON, or a key the schema does not know.
    #[error("bad JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// A loaded value Hermes cannot run with, such as a zero body limit or
    /// an empty service name. `field` is the dotted path, e.g.
    /// `server.http_addr`.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Dotted path of the field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A `PREFIX__SECTION__KEY` override that does not parse or names no
    /// known key.
    #[error("environment override {var}: {reason}")]
    EnvOverride {
        /// The variable name, prefix included.
        var: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn env_override(var: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvOverride {
            var: var.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_culprit() {
        let err = ConfigError::file_not_found("/etc/hermes/hermes.toml");
        assert!(err.to_string().contains("/etc/hermes/hermes.toml"));

        let err = ConfigError::invalid_value("server.http_addr", "not a socket address");
        assert_eq!(
            err.to_string(),
            "invalid value for server.http_addr: not a socket address"
        );

        let err = ConfigError::env_override("HERMES__SERVICE__MAX_BODY_BYTES", "expected integer");
        assert_eq!(
            err.to_string(),
            "environment override HERMES__SERVICE__MAX_BODY_BYTES: expected integer"
        );
    }

    #[test]
    fn test_read_error_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ConfigError::read("hermes.toml", io);
        assert_eq!(err.to_string(), "cannot read hermes.toml");
        assert!(err.source().is_some());
    }
}
