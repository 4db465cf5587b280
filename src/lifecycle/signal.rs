//! Turns process termination signals into a one-shot cancellation.
//!
//! [`SignalListener::install`] hooks SIGINT and SIGTERM (Ctrl-C elsewhere).
//! [`SignalListener::from_source`] accepts any stream of [`Termination`]
//! events so the same logic runs without touching process-wide handlers.

use futures::{Stream, StreamExt};
use std::fmt;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// A request to terminate the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// SIGINT or Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Interrupt => f.write_str("interrupt"),
            Termination::Terminate => f.write_str("terminate"),
        }
    }
}

/// Watches for termination requests and exposes them as a [`CancellationToken`].
///
/// The token is set by the first termination request or by [`stop`](Self::stop),
/// and is never reset. Dropping the listener stops listening.
pub struct SignalListener {
    cancellation: CancellationToken,
    release: CancellationToken,
    tracker: TaskTracker,
}

impl SignalListener {
    /// Hooks the process termination signals.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if the signal handlers cannot be registered.
    #[cfg(unix)]
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let interrupt = signal(SignalKind::interrupt())?;
        let terminate = signal(SignalKind::terminate())?;
        let source = futures::stream::unfold(
            (interrupt, terminate),
            |(mut interrupt, mut terminate)| async move {
                let received = tokio::select! {
                    Some(()) = interrupt.recv() => Termination::Interrupt,
                    Some(()) = terminate.recv() => Termination::Terminate,
                    else => return None,
                };
                Some((received, (interrupt, terminate)))
            },
        );
        Ok(Self::from_source(source))
    }

    /// Hooks Ctrl-C.
    #[cfg(not(unix))]
    pub fn install() -> std::io::Result<Self> {
        let source = futures::stream::unfold((), |()| async {
            tokio::signal::ctrl_c().await.ok()?;
            Some((Termination::Interrupt, ()))
        });
        Ok(Self::from_source(source))
    }

    /// Listens to an arbitrary stream of termination requests.
    pub fn from_source<S>(source: S) -> Self
    where
        S: Stream<Item = Termination> + Send + 'static,
    {
        let cancellation = CancellationToken::new();
        let release = CancellationToken::new();
        let tracker = TaskTracker::new();
        tracker.spawn(watch(source, cancellation.clone(), release.clone()));
        tracker.close();
        Self {
            cancellation,
            release,
            tracker,
        }
    }

    /// The cancellation set by the first termination request.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Whether termination has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Requests termination without an OS signal.
    pub fn stop(&self) {
        if !self.cancellation.is_cancelled() {
            tracing::info!("Stop requested");
        }
        self.cancellation.cancel();
    }

    /// Stops listening and waits for the signal hooks to be dropped.
    ///
    /// Does not set the cancellation.
    pub async fn release(self) {
        self.release.cancel();
        self.tracker.wait().await;
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        self.release.cancel();
    }
}

async fn watch<S>(source: S, cancellation: CancellationToken, release: CancellationToken)
where
    S: Stream<Item = Termination>,
{
    futures::pin_mut!(source);
    loop {
        tokio::select! {
            _ = release.cancelled() => break,
            received = source.next() => match received {
                Some(signal) if cancellation.is_cancelled() => {
                    tracing::warn!(%signal, "Shutdown already in progress, ignoring signal");
                }
                Some(signal) => {
                    tracing::info!(%signal, "Received termination signal");
                    cancellation.cancel();
                }
                None => break,
            },
        }
    }
    tracing::debug!("Stopped listening for termination signals");
}
