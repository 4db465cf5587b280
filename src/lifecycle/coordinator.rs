//! Ordered shutdown of the REST server and the database.
//!
//! The coordinator waits for the cancellation, drains the listener, and only
//! then closes the store, so no request still being served loses its
//! database. A failing step is logged and recorded, and the next step runs
//! regardless.

use super::error::{CleanupError, ServerError, ShutdownError, StoreError};
use crate::infra::database::DbPool;
use std::{fmt, time::Duration};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Something that accepts connections and can be drained.
#[async_trait::async_trait]
pub trait Listener: Send + Sync {
    /// Stops accepting connections and waits for open ones to finish,
    /// for at most `deadline` if one is given.
    async fn shutdown(&self, deadline: Option<Duration>) -> Result<(), ShutdownError>;
}

/// A backing store holding connections that must be released.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Closes the store.
    async fn close(&self) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
impl Store for DbPool {
    async fn close(&self) -> Result<(), StoreError> {
        sqlx::Pool::close(self).await;
        Ok(())
    }
}

/// Where the shutdown sequence currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Waiting for the cancellation.
    Waiting,
    /// Shutting down the listener.
    Draining,
    /// Closing the store.
    Closing,
    /// Finished.
    Done,
}

/// A step of the shutdown sequence that can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Shutting down the listener.
    Drain,
    /// Closing the store.
    Close,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Drain => f.write_str("drain"),
            Step::Close => f.write_str("close"),
        }
    }
}

/// How the coordinator finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The full sequence ran.
    Completed,
    /// Given up before the cancellation; nothing was shut down.
    Abandoned,
}

/// The result of a shutdown sequence.
#[derive(Debug)]
pub struct ShutdownReport {
    /// How the coordinator finished.
    pub outcome: Outcome,
    /// Every shutdown step that failed, in order.
    pub failures: Vec<(Step, CleanupError)>,
    /// Set when the server loop itself failed after shutdown began.
    pub server_failure: Option<ServerError>,
}

impl ShutdownReport {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            failures: Vec::new(),
            server_failure: None,
        }
    }

    /// Whether every step succeeded.
    pub fn is_clean(&self) -> bool {
        self.outcome == Outcome::Completed
            && self.failures.is_empty()
            && self.server_failure.is_none()
    }

    pub(crate) fn record(&mut self, step: Step, error: impl Into<CleanupError>) {
        let error = error.into();
        tracing::error!(%step, "Shutdown step failed: {}", error);
        self.failures.push((step, error));
    }

    pub(crate) fn record_server_failure(&mut self, error: ServerError) {
        tracing::error!("REST server failed during shutdown: {}", error);
        self.server_failure = Some(error);
    }
}

/// Shuts the listener and then the store down once cancelled.
pub struct ShutdownCoordinator<L, S> {
    cancellation: CancellationToken,
    abandon: CancellationToken,
    listener: L,
    store: S,
    deadline: Option<Duration>,
    phase: watch::Sender<Phase>,
}

impl<L, S> ShutdownCoordinator<L, S>
where
    L: Listener,
    S: Store,
{
    /// Creates a coordinator with no drain deadline.
    pub fn new(cancellation: CancellationToken, listener: L, store: S) -> Self {
        let (phase, _) = watch::channel(Phase::Waiting);
        Self {
            cancellation,
            abandon: CancellationToken::new(),
            listener,
            store,
            deadline: None,
            phase,
        }
    }

    /// Bounds how long the listener may take to drain.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Follows the phase of the sequence.
    pub fn phases(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    /// The cancellation that starts the sequence.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Cancelling this token makes a still waiting coordinator return
    /// without shutting anything down.
    pub(crate) fn abandon_token(&self) -> CancellationToken {
        self.abandon.clone()
    }

    /// Waits for the cancellation, then drains the listener and closes the store.
    pub async fn run(self) -> ShutdownReport {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {}
            _ = self.abandon.cancelled() => {
                tracing::debug!("Shutdown abandoned");
                return ShutdownReport::new(Outcome::Abandoned);
            }
        }

        let mut report = ShutdownReport::new(Outcome::Completed);

        self.phase.send_replace(Phase::Draining);
        tracing::info!(deadline = ?self.deadline, "Shutting down REST server");
        match self.listener.shutdown(self.deadline).await {
            Ok(()) => tracing::info!("REST server closed"),
            Err(e) => report.record(Step::Drain, e),
        }

        self.phase.send_replace(Phase::Closing);
        match self.store.close().await {
            Ok(()) => tracing::info!("database closed"),
            Err(e) => report.record(Step::Close, e),
        }

        self.phase.send_replace(Phase::Done);
        report
    }
}
