//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::{ConfigError, HermesConfig, LogFormat};

/// Configuration loader.
///
/// Layers, later ones overriding earlier ones:
/// 1. defaults
/// 2. a configuration file (TOML or JSON, chosen by extension); sections and
///    fields missing from the file keep their default values
/// 3. environment variables `PREFIX__SECTION__KEY`
///
/// # Example
///
/// ```no_run
/// use hermes_config::ConfigLoader;
///
/// # fn main() -> Result<(), hermes_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()
///     .with_optional_file("hermes.toml")?
///     .with_env_prefix("HERMES")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: HermesConfig,
    env_prefix: Option<String>,
    env_vars: Option<Vec<(String, String)>>,
}

impl ConfigLoader {
    /// Creates a loader starting from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the development preset.
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = HermesConfig::development();
        self
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, malformed, has an
    /// unsupported extension or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read(path, e))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        self.config = parse(&content, &extension)?;
        Ok(self)
    }

    /// Loads a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Fails like [`with_file`](Self::with_file) when the file exists.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration text in the given format ("toml" or "json").
    ///
    /// ```
    /// use hermes_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nhttp_addr = \"127.0.0.1:3000\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// assert_eq!(config.service.max_body_bytes, 1024 * 1024);
    /// ```
    ///
    /// # Errors
    ///
    /// Fails on malformed text, unknown fields or an unknown format.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Reads overrides from environment variables starting with `PREFIX__`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Uses the given variables instead of the process environment.
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Loads `.env` into the process environment if present.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        let _ = dotenvy::dotenv();
        self
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Fails on unparsable environment values or an invalid result.
    pub fn load(mut self) -> Result<HermesConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars = self.env_vars.take().unwrap_or_else(|| env::vars().collect());
            let marker = format!("{prefix}__");
            for (key, value) in vars.iter().filter(|(k, _)| k.starts_with(&marker)) {
                self.apply_env_var(&key[marker.len()..], key, value)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> HermesConfig {
        self.config
    }

    fn apply_env_var(&mut self, path: &str, key: &str, value: &str) -> Result<(), ConfigError> {
        let parts: Vec<&str> = path.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => config.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_SECS"] => {
                config.server.request_timeout_secs = parse_number(key, value)?;
            }

            ["SERVICE", "MAX_BODY_BYTES"] => config.service.max_body_bytes = parse_number(key, value)?,
            ["SERVICE", "MAX_MULTIPART_BYTES"] => {
                config.service.max_multipart_bytes = parse_number(key, value)?;
            }
            ["SERVICE", "MAX_MULTIPART_FIELDS"] => {
                config.service.max_multipart_fields = parse_number(key, value)?;
            }
            ["SERVICE", "BYPASS_REQUEST_BODY"] => {
                config.service.bypass_request_body = parse_flag(key, value)?;
            }
            ["SERVICE", "BYPASS_RESPONSE_BODY"] => {
                config.service.bypass_response_body = parse_flag(key, value)?;
            }

            ["TELEMETRY", "SERVICE_NAME"] => config.telemetry.service_name = value.to_string(),
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                config.telemetry.logging.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => config.telemetry.logging.level = value.to_string(),
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                config.telemetry.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => return Err(ConfigError::env_override(key, "expected 'json' or 'pretty'")),
                };
            }
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                config.telemetry.metrics.enabled = parse_flag(key, value)?;
            }

            _ => {}
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<HermesConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        _ => Err(ConfigError::UnsupportedFormat {
            format: format.to_string(),
        }),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_override(key, "expected integer"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_override(key, "expected boolean")),
    }
}
