//! # Hermes Service
//!
//! [`ServiceHandler`] binds an ordinary async function
//! `Fn(CallContext, A) -> impl Future<Output = R>` to HTTP requests:
//!
//! 1. the argument `A` is resolved from the query string, the body and the
//!    path parameters (`400 parse argument failed` on any failure)
//! 2. the method runs behind a panic boundary
//! 3. the return value is classified and written as JSON
//! 4. an optional [`CallRecorder`](hermes_core::CallRecorder) receives the
//!    argument, the response, the begin time and the duration
//!
//! | Return | Status | Body |
//! |---|---|---|
//! | panic | 500 | `{"code":500,"msg":"service method panicked","data":{"panic":..,"stack":..}}` |
//! | `FormattedResponse` | its code | the envelope |
//! | `None::<FormattedResponse>` | 200 | nothing |
//! | `Err(e)` | 500 | `{"code":500,"msg":"service method error","data":"<e>"}` |
//! | anything else | 200 | the value as JSON (nothing with response bypass) |
//!
//! Each call runs in a `hermes.service` span carrying `service`, `path`,
//! `method` and, for error responses, `error = true`.

#![doc(html_root_url = "https://docs.rs/hermes-service/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod format;
mod handler;
mod options;
pub mod record;
pub mod trace;

pub use format::Written;
pub use handler::{Endpoint, ServiceHandler, ServiceHandlerBuilder};
pub use options::ServiceOptions;
pub use trace::CallTrace;
