//! # Hermes Core
//!
//! Core types for turning ordinary async functions into request handlers.
//!
//! A service method has the shape `Fn(CallContext, A) -> impl Future<Output = R>`
//! where `A` is an [`Argument`] and `R` an [`IntoMethodReturn`]. This crate
//! provides the pieces every layer above agrees on:
//!
//! - [`MethodContract`] - a method bound to the verified shape of its argument
//! - [`ArgShape`] / [`ArgContract`] - record, string-keyed map or sequence
//! - [`CallContext`] - cancellation, peer address, inbound headers and body
//! - [`ResponseWriter`] - shared outbound sink
//! - [`FormattedResponse`] - the `{code, msg, data}` envelope
//! - [`invoke`] / [`Invocation`] - panic containment
//! - [`MethodReturn`] - classified return values
//! - [`CallRecorder`] - per-call telemetry sink
//! - [`Params`] - path parameters captured by a router

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod argument;
mod context;
pub mod contract;
pub mod envelope;
mod error;
pub mod invoker;
mod method;
mod params;
pub mod recorder;
mod returns;
mod writer;

use std::future::Future;
use std::pin::Pin;

pub use argument::Argument;
pub use context::{CallContext, CallContextBuilder};
pub use contract::{ArgContract, ArgShape};
pub use envelope::FormattedResponse;
pub use error::ContractViolation;
pub use invoker::{contain, invoke, Contained, Invocation, PanicCapture};
pub use method::MethodContract;
pub use params::Params;
pub use recorder::CallRecorder;
pub use returns::{IntoMethodReturn, MethodReturn, Raw};
pub use writer::ResponseWriter;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
    pub use validator;
}
