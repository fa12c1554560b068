//! Turning a loaded [`HermesConfig`] into runtime settings.

use std::time::Duration;

use hermes_config::HermesConfig;
use hermes_extract::MultipartConfig;
use hermes_server::ServerConfig;
use hermes_service::ServiceOptions;

/// Path of the Prometheus exposition when metrics are enabled.
pub const METRICS_PATH: &str = "/metrics";

/// Server settings for `config`.
///
/// The server collects bodies up to the larger of the JSON and multipart
/// limits; each handler then applies the limit for the body type it sees.
#[must_use]
pub fn server_config(config: &HermesConfig) -> ServerConfig {
    let max_body_bytes = config
        .service
        .max_body_bytes
        .max(config.service.max_multipart_bytes);

    let builder = ServerConfig::builder()
        .http_addr(config.server.http_addr.clone())
        .shutdown_timeout(Duration::from_secs(config.server.shutdown_timeout_secs))
        .request_timeout(Duration::from_secs(config.server.request_timeout_secs))
        .max_body_bytes(max_body_bytes);

    if config.telemetry.metrics.enabled {
        builder.metrics_path(METRICS_PATH).build()
    } else {
        builder.build()
    }
}

/// Handler options for `config`, without a recorder.
#[must_use]
pub fn service_options(config: &HermesConfig) -> ServiceOptions {
    let service = &config.service;
    ServiceOptions::new()
        .bypass_request_body(service.bypass_request_body)
        .bypass_response_body(service.bypass_response_body)
        .max_body_size(service.max_body_bytes)
        .multipart(
            MultipartConfig::new()
                .max_body_size(service.max_multipart_bytes)
                .max_fields(service.max_multipart_fields),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_from_defaults() {
        let config = HermesConfig::default();
        let server = server_config(&config);

        assert_eq!(server.http_addr(), "0.0.0.0:8080");
        assert_eq!(server.shutdown_timeout(), Duration::from_secs(30));
        assert_eq!(server.request_timeout(), Duration::from_secs(30));
        assert_eq!(server.max_body_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_metrics_path_follows_metrics_switch() {
        let mut config = HermesConfig::default();
        config.telemetry.metrics.enabled = true;
        assert_eq!(server_config(&config).metrics_path(), Some(METRICS_PATH));

        config.telemetry.metrics.enabled = false;
        assert_eq!(server_config(&config).metrics_path(), None);
    }

    #[test]
    fn test_service_options_copy_limits_and_flags() {
        let mut config = HermesConfig::default();
        config.service.max_body_bytes = 512;
        config.service.max_multipart_bytes = 2048;
        config.service.max_multipart_fields = 4;
        config.service.bypass_response_body = true;

        let options = service_options(&config);
        assert_eq!(options.max_body_size, 512);
        assert_eq!(options.multipart.max_body_size, 2048);
        assert_eq!(options.multipart.max_fields, 4);
        assert!(options.bypass_response_body);
        assert!(!options.bypass_request_body);
        assert!(!options.has_recorder());
    }
}
