//! # Hermes Extract
//!
//! Argument resolution for Hermes service methods.
//!
//! A service method receives a single argument assembled from up to three
//! request sources, lowest priority first:
//!
//! | Source | When | Decoding |
//! |--------|------|----------|
//! | Query string (plus form or multipart text fields) | always | keyed strings |
//! | JSON body | POST/PUT/PATCH, `application/json`, request bypass off | JSON, types as sent |
//! | Path parameters | router supplied them | keyed strings |
//!
//! Keyed strings coerce into typed fields through the [`lenient`]
//! deserializer, record field names match case-insensitively, and unknown
//! keys are ignored. A malformed or empty JSON body fails resolution.
//!
//! ## Example
//!
//! ```rust
//! use hermes_core::{ArgContract, Argument};
//! use hermes_extract::{ArgumentResolver, InboundRequest, ResolverConfig};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct ListParams {
//!     limit: Option<u32>,
//!     offset: Option<u32>,
//! }
//!
//! impl Argument for ListParams {}
//!
//! # tokio_test::block_on(async {
//! let shape = *ArgContract::inspect::<ListParams>().unwrap().shape();
//! let resolver = ArgumentResolver::new(shape, ResolverConfig::default());
//!
//! let req = InboundRequest::builder().uri("/users?Limit=10").build();
//! let params: ListParams = resolver.resolve(&req, None).await.unwrap();
//! assert_eq!(params.limit, Some(10));
//! assert_eq!(params.offset, None);
//! # });
//! ```
//!
//! ## Error Handling
//!
//! Every failure is an [`ExtractionError`] carrying the [`ExtractionSource`]
//! it came from; the adapter answers it with a `400` envelope.

#![doc(html_root_url = "https://docs.rs/hermes-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod keyed;
pub mod lenient;
pub mod multipart;
mod request;
mod resolver;

pub use error::{ExtractionError, ExtractionSource};
pub use keyed::KeyedValues;
pub use multipart::MultipartConfig;
pub use request::{InboundRequest, InboundRequestBuilder};
pub use resolver::{
    deep_merge, ArgumentResolver, MergedArgument, ResolverConfig, DEFAULT_MAX_BODY_SIZE,
};
