//! Graceful shutdown signal handling.
//!
//! A [`ShutdownSignal`] is a cloneable trigger shared by the accept loop and
//! every connection. It is backed by a [`CancellationToken`]: connections
//! derive child tokens from it, and every request derives a child token from
//! its connection, so triggering shutdown cancels all in-flight calls at
//! once.
//!
//! ```rust
//! use hermes_server::ShutdownSignal;
//!
//! let shutdown = ShutdownSignal::new();
//! let connection = shutdown.child_token();
//!
//! shutdown.trigger();
//! assert!(shutdown.is_shutdown());
//! assert!(connection.is_cancelled());
//! ```

use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// A signal that can be used to trigger and await graceful shutdown.
///
/// Clones share the same state; triggering any clone is seen by all of them.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
}

impl ShutdownSignal {
    /// Creates a signal that is only triggered manually.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a signal that is also triggered by SIGINT or SIGTERM.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn with_os_signals() -> Self {
        let signal = Self::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            match wait_for_os_signal().await {
                Ok(name) => {
                    tracing::info!(signal = name, "Received shutdown signal, draining connections");
                    trigger.trigger();
                }
                Err(err) => {
                    tracing::error!(error = %err, "Failed to listen for shutdown signals");
                }
            }
        });

        signal
    }

    /// Triggers shutdown. Calling this more than once has no further effect.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Returns `true` once shutdown has been triggered.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns a future that completes when shutdown is triggered.
    ///
    /// Completes immediately if shutdown already happened.
    pub fn recv(&self) -> WaitForCancellationFutureOwned {
        self.token.clone().cancelled_owned()
    }

    /// Token cancelled together with this signal.
    ///
    /// Cancelling the child does not trigger shutdown.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }
}

/// Waits for SIGTERM or SIGINT and returns the signal's name.
#[cfg(unix)]
async fn wait_for_os_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => Ok("SIGTERM"),
        _ = sigint.recv() => Ok("SIGINT"),
    }
}

/// Waits for Ctrl+C.
#[cfg(not(unix))]
async fn wait_for_os_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("ctrl-c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_trigger_is_idempotent() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_shutdown());

        signal.trigger();
        signal.trigger();
        assert!(signal.is_shutdown());
    }

    #[test]
    fn test_clones_share_state() {
        let a = ShutdownSignal::new();
        let b = a.clone();
        b.trigger();
        assert!(a.is_shutdown());
    }

    #[test]
    fn test_child_cancel_does_not_trigger() {
        let signal = ShutdownSignal::new();
        let child = signal.child_token();
        child.cancel();
        assert!(!signal.is_shutdown());
    }

    #[tokio::test]
    async fn test_recv_completes_when_triggered() {
        let signal = ShutdownSignal::new();
        let trigger = signal.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.trigger();
        });

        tokio::time::timeout(Duration::from_secs(1), signal.recv())
            .await
            .expect("recv should complete");
    }

    #[tokio::test]
    async fn test_recv_completes_immediately_if_triggered() {
        let signal = ShutdownSignal::new();
        signal.trigger();

        tokio::time::timeout(Duration::from_millis(10), signal.recv())
            .await
            .expect("recv should complete immediately");
    }

    #[tokio::test]
    async fn test_with_os_signals_starts_untriggered() {
        let signal = ShutdownSignal::with_os_signals();
        assert!(!signal.is_shutdown());
        signal.trigger();
        assert!(signal.is_shutdown());
    }
}
