//! Panic containment around service method calls.
//!
//! [`invoke`] runs a method and turns any panic raised while building or
//! polling its future into [`Invocation::Panicked`]. A process-wide panic hook
//! is installed on first use: while a panic is being contained it records a
//! backtrace at the panic site and stays silent, any other panic is forwarded
//! to the previously installed hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

use serde::Serialize;

thread_local! {
    static CONTAIN_DEPTH: Cell<usize> = const { Cell::new(0) };
    static PANIC_STACK: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

const NON_STRING_PAYLOAD: &str = "<non-string panic payload>";

/// What a contained panic left behind.
///
/// Serialized on the wire as `{"panic": <message>, "stack": <backtrace>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanicCapture {
    /// The panic message.
    #[serde(rename = "panic")]
    pub message: String,
    /// Backtrace captured where the panic was raised.
    pub stack: String,
}

impl PanicCapture {
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            NON_STRING_PAYLOAD.to_string()
        };

        // Another hook may have replaced ours; fall back to the catch site.
        let stack = PANIC_STACK
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| Backtrace::force_capture().to_string());

        Self { message, stack }
    }

    /// JSON form of the capture.
    #[must_use]
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "panic": self.message, "stack": self.stack })
    }
}

/// Outcome of a contained call.
#[derive(Debug)]
pub enum Invocation<R> {
    /// The method ran to completion.
    Returned(R),
    /// The method panicked.
    Panicked(PanicCapture),
}

impl<R> Invocation<R> {
    /// Whether the method panicked.
    #[must_use]
    pub fn is_panicked(&self) -> bool {
        matches!(self, Self::Panicked(_))
    }

    /// Converts into a `Result`, treating the panic as the error.
    pub fn into_result(self) -> Result<R, PanicCapture> {
        match self {
            Self::Returned(value) => Ok(value),
            Self::Panicked(capture) => Err(capture),
        }
    }
}

fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CONTAIN_DEPTH.with(Cell::get) > 0 {
                let stack = Backtrace::force_capture().to_string();
                PANIC_STACK.with(|slot| *slot.borrow_mut() = Some(stack));
            } else {
                previous(info);
            }
        }));
    });
}

struct DepthGuard;

impl DepthGuard {
    fn enter() -> Self {
        CONTAIN_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        CONTAIN_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Runs `f`, capturing a panic instead of unwinding further.
pub fn contain<T>(f: impl FnOnce() -> T) -> Result<T, PanicCapture> {
    install_hook();
    let _guard = DepthGuard::enter();
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let capture = PanicCapture::from_payload(payload.as_ref());
        tracing::error!(panic = %capture.message, "contained panic in service method");
        capture
    })
}

/// Future wrapper that polls its inner future inside [`contain`].
#[must_use = "futures do nothing unless polled"]
pub struct Contained<F> {
    inner: Option<Pin<Box<F>>>,
}

impl<F: Future> Contained<F> {
    /// Wraps `future`.
    pub fn new(future: F) -> Self {
        Self {
            inner: Some(Box::pin(future)),
        }
    }
}

impl<F: Future> Future for Contained<F> {
    type Output = Invocation<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(future) = this.inner.as_mut() else {
            panic!("`Contained` polled after completion");
        };

        let outcome = match contain(|| future.as_mut().poll(cx)) {
            Ok(Poll::Pending) => return Poll::Pending,
            Ok(Poll::Ready(value)) => Invocation::Returned(value),
            Err(capture) => Invocation::Panicked(capture),
        };
        this.inner = None;
        Poll::Ready(outcome)
    }
}

/// Calls `method` and drives the returned future, containing panics from
/// either step.
///
/// # Example
///
/// ```rust
/// use hermes_core::{invoke, Invocation};
///
/// # tokio_test::block_on(async {
/// let outcome = invoke(|| async { panic!("boom") }).await;
/// match outcome {
///     Invocation::Panicked(capture) => assert_eq!(capture.message, "boom"),
///     Invocation::Returned(()) => unreachable!(),
/// }
/// # });
/// ```
pub async fn invoke<M, Fut>(method: M) -> Invocation<Fut::Output>
where
    M: FnOnce() -> Fut,
    Fut: Future,
{
    match contain(method) {
        Ok(future) => Contained::new(future).await,
        Err(capture) => Invocation::Panicked(capture),
    }
}
