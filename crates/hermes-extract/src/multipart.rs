//! Text fields of `multipart/form-data` bodies.
//!
//! Multipart bodies contribute to the argument exactly like the query string:
//! every text field becomes a keyed value. File parts are skipped; a method
//! that needs uploads reads the raw body from its
//! [`CallContext`](hermes_core::CallContext).

use std::io;

use bytes::Bytes;
use http::{header, HeaderMap};

use crate::error::{ExtractionError, ExtractionSource};
use crate::keyed::KeyedValues;

/// Default maximum total body size for multipart (10 MB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default maximum number of parts.
pub const DEFAULT_MAX_FIELDS: usize = 100;

/// Configuration for multipart parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartConfig {
    /// Maximum total body size in bytes.
    pub max_body_size: usize,
    /// Maximum number of parts, text and file parts alike.
    pub max_fields: usize,
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }
}

impl MultipartConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum body size.
    #[must_use]
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the maximum number of parts.
    #[must_use]
    pub fn max_fields(mut self, count: usize) -> Self {
        self.max_fields = count;
        self
    }
}

/// Reads every text field of a multipart body into keyed values.
///
/// # Errors
///
/// Fails if the boundary is missing, the body is over the size limit, there
/// are too many parts, or the body is malformed.
pub async fn read_text_fields(
    headers: &HeaderMap,
    body: Bytes,
    config: &MultipartConfig,
) -> Result<KeyedValues, ExtractionError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            ExtractionError::invalid_content_type(ExtractionSource::Multipart, "missing header")
        })?;

    let boundary = multer::parse_boundary(content_type).map_err(|_| {
        ExtractionError::invalid_content_type(
            ExtractionSource::Multipart,
            "missing or invalid boundary",
        )
    })?;

    if body.len() > config.max_body_size {
        return Err(ExtractionError::payload_too_large(
            ExtractionSource::Multipart,
            config.max_body_size,
            body.len(),
        ));
    }

    let stream = futures_util::stream::once(async move { Ok::<_, io::Error>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut values = KeyedValues::new();
    let mut parts = 0;
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        parts += 1;
        if parts > config.max_fields {
            return Err(ExtractionError::malformed(
                ExtractionSource::Multipart,
                format!("too many parts (max {})", config.max_fields),
            ));
        }

        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        if field.file_name().is_some() {
            tracing::trace!(field = %name, "skipping file part");
            continue;
        }

        let text = field.text().await.map_err(malformed)?;
        values.append(name, text);
    }

    Ok(values)
}

fn malformed(err: multer::Error) -> ExtractionError {
    ExtractionError::malformed(ExtractionSource::Multipart, err)
}
