//! # Hermes Server
//!
//! HTTP/1 transport for Hermes service handlers.
//!
//! - [`Router`] maps `(method, pattern)` to an [`Endpoint`](hermes_service::Endpoint)
//!   and captures `{name}` and `*name` segments as [`Params`](hermes_core::Params)
//! - [`Server`] accepts connections with hyper, collects bounded bodies and
//!   dispatches them, answering unmatched routes with a JSON envelope
//! - [`ShutdownSignal`] stops the accept loop and drains open connections
//!
//! ## Example
//!
//! ```rust,no_run
//! use hermes_core::CallContext;
//! use hermes_server::{Router, Server, ShutdownSignal};
//! use hermes_service::{ServiceHandler, ServiceOptions};
//! use http::Method;
//! use std::collections::HashMap;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! async fn greet(_ctx: CallContext, args: HashMap<String, String>) -> String {
//!     format!("hello {}", args.get("name").map_or("world", String::as_str))
//! }
//!
//! let mut router = Router::new();
//! router.add(Method::GET, "/greet/{name}", ServiceHandler::bind(greet, ServiceOptions::default())?)?;
//!
//! let shutdown = ShutdownSignal::with_os_signals();
//! Server::builder()
//!     .http_addr("127.0.0.1:8080")
//!     .router(router)
//!     .build()
//!     .run_with_shutdown(shutdown)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/hermes-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod router;
mod server;
pub mod shutdown;

pub use config::{ServerConfig, ServerConfigBuilder};
pub use error::ServerError;
pub use router::{Lookup, RouteMatch, Router};
pub use server::{
    HttpResponse, ResponseBody, Server, ServerBuilder, MSG_BODY_TOO_LARGE, MSG_CALL_TIMEOUT,
    MSG_METHOD_NOT_ALLOWED, MSG_NOT_FOUND, MSG_READ_BODY_FAILED, MSG_REQUEST_TIMEOUT,
};
pub use shutdown::ShutdownSignal;
