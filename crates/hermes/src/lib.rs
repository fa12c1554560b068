//! # Hermes
//!
//! Bind ordinary async functions to HTTP endpoints.
//!
//! A service method is any `Fn(CallContext, A) -> impl Future<Output = R>`
//! where `A` is a record, map or sequence argument and `R` is a plain value,
//! a `Result`, or a [`FormattedResponse`](hermes_core::FormattedResponse)
//! envelope. Hermes resolves `A` from the query string, the body and the
//! path parameters, runs the method behind a panic boundary and writes the
//! outcome as JSON.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hermes::prelude::*;
//!
//! #[derive(Serialize, Deserialize, Validate)]
//! struct Add {
//!     a: i64,
//!     b: i64,
//! }
//!
//! validated_argument!(Add);
//!
//! async fn add(_ctx: CallContext, args: Add) -> i64 {
//!     args.a + args.b
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut router = Router::new();
//!     router.add(Method::GET, "/add/{a}/{b}", ServiceHandler::bind(add, ServiceOptions::default())?)?;
//!
//!     Server::builder()
//!         .http_addr("127.0.0.1:8080")
//!         .router(router)
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Crates
//!
//! | Module | Crate |
//! |---|---|
//! | [`core`] | contracts, call context, envelopes, panic containment |
//! | [`extract`] | argument resolution from query, body and path |
//! | [`service`] | the `ServiceHandler` adapter |
//! | [`telemetry`] | logging and call metrics |
//! | [`config`] | file and environment configuration |
//! | [`server`] | HTTP/1 server, router and shutdown |

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use hermes_config as config;
pub use hermes_core as core;
pub use hermes_extract as extract;
pub use hermes_server as server;
pub use hermes_service as service;
pub use hermes_telemetry as telemetry;

mod bootstrap;

pub use bootstrap::{server_config, service_options, METRICS_PATH};

/// Prelude module for convenient imports.
///
/// ```rust
/// use hermes::prelude::*;
/// ```
pub mod prelude {
    pub use hermes_core::{
        raw_return, validated_argument, Argument, CallContext, FormattedResponse, Params, Raw,
        ResponseWriter,
    };

    pub use hermes_extract::InboundRequest;

    pub use hermes_service::{Endpoint, ServiceHandler, ServiceOptions};

    pub use hermes_server::{Router, Server, ServerConfig, ShutdownSignal};

    pub use hermes_config::{ConfigLoader, HermesConfig};

    pub use hermes_telemetry::{init_telemetry, TracingRecorder};

    pub use http::{Method, StatusCode};
    pub use serde::{Deserialize, Serialize};
    pub use validator::Validate;
}
