//! Graceful shutdown signalling.
//!
//! Every pipeline and stage task holds a `broadcast` receiver and `select!`s
//! on it alongside its input. The cause travels with the signal so stages can
//! report it on their error stream. Blocking sends inside a task go through
//! [`or_shutdown`] so a full downstream queue never hides the signal.

use std::fmt;
use std::future::Future;
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError};

/// Why the replica is shutting down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShutdownCause {
    /// Shutdown was requested programmatically.
    Requested,
    /// The process received SIGINT or SIGTERM.
    Signal,
    /// Every [`ShutdownController`] was dropped without signalling.
    ControllerDropped,
}

impl ShutdownCause {
    /// The cause behind a shutdown receiver's `recv` result.
    pub fn from_recv(received: Result<ShutdownCause, RecvError>) -> Self {
        match received {
            Ok(cause) => cause,
            // Capacity is one, so lagging means a signal was sent.
            Err(RecvError::Lagged(_)) => ShutdownCause::Requested,
            Err(RecvError::Closed) => ShutdownCause::ControllerDropped,
        }
    }
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownCause::Requested => f.write_str("shutdown requested"),
            ShutdownCause::Signal => f.write_str("terminated by signal"),
            ShutdownCause::ControllerDropped => f.write_str("shutdown controller dropped"),
        }
    }
}

/// Broadcasts a single shutdown signal to every subscribed task.
#[derive(Clone)]
pub struct ShutdownController {
    tx: broadcast::Sender<ShutdownCause>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Get a receiver that will be notified on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownCause> {
        self.tx.subscribe()
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        self.trigger(ShutdownCause::Requested);
    }

    /// Trigger shutdown with an explicit cause.
    pub fn trigger(&self, cause: ShutdownCause) {
        let _ = self.tx.send(cause);
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
            _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
        }

        self.trigger(ShutdownCause::Signal);
    }
}

/// Await `fut` unless shutdown fires first, in which case `fut` is dropped
/// and the cause returned.
pub async fn or_shutdown<F: Future>(
    shutdown: &mut broadcast::Receiver<ShutdownCause>,
    fut: F,
) -> Result<F::Output, ShutdownCause> {
    tokio::select! {
        biased;
        received = shutdown.recv() => Err(ShutdownCause::from_recv(received)),
        out = fut => Ok(out),
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}
