//! Argument resolution errors.
//!
//! Every resolution failure ends up as a `400` envelope whose `data` is the
//! error text, so the error carries where the data came from and a readable
//! message rather than a status code of its own.

use std::fmt;

use validator::ValidationErrors;

/// Where the offending data was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// URL query string
    Query,
    /// `application/x-www-form-urlencoded` body
    Form,
    /// `multipart/form-data` body
    Multipart,
    /// JSON request body
    Body,
    /// Path parameters supplied by the router
    Path,
    /// The merged argument, after all sources were combined
    Argument,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Form => write!(f, "form"),
            Self::Multipart => write!(f, "multipart"),
            Self::Body => write!(f, "body"),
            Self::Path => write!(f, "path"),
            Self::Argument => write!(f, "argument"),
        }
    }
}

/// Error raised while resolving a service method argument.
///
/// # Example
///
/// ```rust
/// use hermes_extract::{ExtractionError, ExtractionSource};
///
/// let err = ExtractionError::malformed(ExtractionSource::Body, "expected value at line 1 column 2");
/// assert_eq!(err.extraction_source(), ExtractionSource::Body);
/// assert_eq!(err.error_code(), "MALFORMED_INPUT");
/// assert!(err.to_string().contains("line 1"));
/// ```
#[derive(Debug)]
pub struct ExtractionError {
    extraction_source: ExtractionSource,
    kind: ExtractionErrorKind,
    field: Option<String>,
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractionErrorKind {
    /// Input could not be parsed at all
    Malformed,
    /// Body was expected but empty
    EmptyBody,
    /// Merged data does not fit the argument type
    DecodeFailed,
    /// Argument failed structural validation
    ValidationFailed,
    /// Body or multipart part is too large
    PayloadTooLarge,
    /// Content-Type header is unusable
    InvalidContentType,
}

impl ExtractionError {
    /// Creates an error for input that could not be parsed.
    #[must_use]
    pub fn malformed(source: ExtractionSource, details: impl fmt::Display) -> Self {
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::Malformed,
            message: format!("malformed {source}: {details}"),
            field: None,
        }
    }

    /// Creates an error for an empty JSON body.
    #[must_use]
    pub fn empty_body() -> Self {
        Self {
            extraction_source: ExtractionSource::Body,
            kind: ExtractionErrorKind::EmptyBody,
            message: "empty request body".to_string(),
            field: None,
        }
    }

    /// Creates an error for merged data that does not decode into the argument.
    #[must_use]
    pub fn decode_failed(type_name: &str, error: impl fmt::Display) -> Self {
        Self {
            extraction_source: ExtractionSource::Argument,
            kind: ExtractionErrorKind::DecodeFailed,
            message: format!("cannot decode `{type_name}`: {error}"),
            field: None,
        }
    }

    /// Creates an error from structural validation failures.
    #[must_use]
    pub fn validation_failed(errors: &ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors
            .field_errors()
            .into_keys()
            .map(|name| name.to_string())
            .collect();
        fields.sort();

        Self {
            extraction_source: ExtractionSource::Argument,
            kind: ExtractionErrorKind::ValidationFailed,
            message: format!("validation failed: {errors}"),
            field: fields.into_iter().next(),
        }
    }

    /// Creates an error for a payload over the configured limit.
    #[must_use]
    pub fn payload_too_large(source: ExtractionSource, max_size: usize, actual_size: usize) -> Self {
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::PayloadTooLarge,
            message: format!("payload too large: max {max_size} bytes, got {actual_size} bytes"),
            field: None,
        }
    }

    /// Creates an error for a Content-Type header that cannot be used.
    #[must_use]
    pub fn invalid_content_type(source: ExtractionSource, details: impl fmt::Display) -> Self {
        Self {
            extraction_source: source,
            kind: ExtractionErrorKind::InvalidContentType,
            message: format!("invalid content type: {details}"),
            field: None,
        }
    }

    /// Attaches the name of the offending field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// Returns the source of the offending data.
    #[must_use]
    pub fn extraction_source(&self) -> ExtractionSource {
        self.extraction_source
    }

    /// Returns the field name if known.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Machine-readable code, used as a log field.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self.kind {
            ExtractionErrorKind::Malformed => "MALFORMED_INPUT",
            ExtractionErrorKind::EmptyBody => "EMPTY_BODY",
            ExtractionErrorKind::DecodeFailed => "DECODE_FAILED",
            ExtractionErrorKind::ValidationFailed => "VALIDATION_FAILED",
            ExtractionErrorKind::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ExtractionErrorKind::InvalidContentType => "INVALID_CONTENT_TYPE",
        }
    }
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExtractionError {}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Limits {
        #[validate(range(min = 1))]
        page: u32,
    }

    #[test]
    fn test_malformed_error() {
        let err = ExtractionError::malformed(ExtractionSource::Query, "invalid percent encoding");

        assert_eq!(err.extraction_source(), ExtractionSource::Query);
        assert_eq!(err.field(), None);
        assert_eq!(err.error_code(), "MALFORMED_INPUT");
        assert!(err.to_string().starts_with("malformed query"));
    }

    #[test]
    fn test_empty_body_error() {
        let err = ExtractionError::empty_body();
        assert_eq!(err.extraction_source(), ExtractionSource::Body);
        assert_eq!(err.to_string(), "empty request body");
    }

    #[test]
    fn test_decode_failed_error() {
        let err = ExtractionError::decode_failed("Login", "missing field `user`");
        assert_eq!(err.extraction_source(), ExtractionSource::Argument);
        assert_eq!(err.error_code(), "DECODE_FAILED");
        assert!(err.to_string().contains("missing field `user`"));
    }

    #[test]
    fn test_validation_failed_names_field() {
        let errors = Limits { page: 0 }.validate().unwrap_err();
        let err = ExtractionError::validation_failed(&errors);

        assert_eq!(err.field(), Some("page"));
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
        assert!(err.to_string().contains("page"));
    }

    #[test]
    fn test_payload_too_large_error() {
        let err = ExtractionError::payload_too_large(ExtractionSource::Multipart, 1024, 2048);

        assert_eq!(err.extraction_source(), ExtractionSource::Multipart);
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");
        assert!(err.to_string().contains("1024"));
        assert!(err.to_string().contains("2048"));
    }

    #[test]
    fn test_with_field() {
        let err = ExtractionError::invalid_content_type(ExtractionSource::Multipart, "no boundary")
            .with_field("content-type");
        assert_eq!(err.field(), Some("content-type"));
    }

    #[test]
    fn test_extraction_source_display() {
        assert_eq!(ExtractionSource::Query.to_string(), "query");
        assert_eq!(ExtractionSource::Form.to_string(), "form");
        assert_eq!(ExtractionSource::Multipart.to_string(), "multipart");
        assert_eq!(ExtractionSource::Body.to_string(), "body");
        assert_eq!(ExtractionSource::Path.to_string(), "path");
        assert_eq!(ExtractionSource::Argument.to_string(), "argument");
    }
}
