//! Errors raised while starting, running, and stopping the service.

use std::{io, time::Duration};

/// The REST server could not run.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// The address that was tried.
        address: String,
        /// Why binding failed.
        #[source]
        source: io::Error,
    },
    /// The bound socket could not report its address.
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] io::Error),
    /// The server task ended abnormally.
    #[error("server task failed: {0}")]
    Task(String),
}

/// The listener did not shut down cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    /// Connections were still open at the deadline and were forced closed.
    #[error("connections did not drain within {0:?}")]
    DrainTimeout(Duration),
}

/// The backing store did not close cleanly.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to close store: {0}")]
    Close(String),
}

/// One failed step of the shutdown sequence.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The supervisor could not complete a run.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    /// The server failed before shutdown was requested.
    #[error("REST server failed to start: {0}")]
    Startup(#[source] ServerError),
    /// A lifecycle task panicked or was cancelled.
    #[error("lifecycle task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
