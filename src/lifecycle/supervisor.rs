//! Runs the server loop and the shutdown coordinator side by side.

use super::{
    coordinator::{Listener, Outcome, ShutdownCoordinator, ShutdownReport, Store},
    error::{ServerError, SupervisorError},
};
use std::future::Future;
use tokio_util::task::TaskTracker;

/// Runs `server` and `coordinator` as two tasks and waits for both.
///
/// A server that fails before the cancellation was requested is a startup
/// failure: the coordinator is abandoned without shutting anything down and
/// the error is returned. A server that fails later is kept in
/// [`ShutdownReport::server_failure`].
///
/// # Errors
///
/// Returns [`SupervisorError::Startup`] for startup failures and
/// [`SupervisorError::Join`] if the coordinator panicked.
pub async fn supervise<F, L, S>(
    server: F,
    coordinator: ShutdownCoordinator<L, S>,
) -> Result<ShutdownReport, SupervisorError>
where
    F: Future<Output = Result<(), ServerError>> + Send + 'static,
    L: Listener + 'static,
    S: Store + 'static,
{
    let cancellation = coordinator.cancellation();
    let abandon = coordinator.abandon_token();

    let tracker = TaskTracker::new();
    let shutdown = tracker.spawn(coordinator.run());
    let serving = tracker.spawn(server);
    tracker.close();

    let served = match serving.await {
        Ok(served) => served,
        Err(e) => Err(ServerError::Task(e.to_string())),
    };
    if served.is_err() && !cancellation.is_cancelled() {
        abandon.cancel();
    }

    tracker.wait().await;
    let mut report = shutdown.await?;
    tracing::debug!(outcome = ?report.outcome, "Lifecycle tasks finished");

    match served {
        Err(e) if report.outcome == Outcome::Abandoned => {
            tracing::error!("REST server failed: {}", e);
            Err(SupervisorError::Startup(e))
        }
        Err(e) => {
            report.record_server_failure(e);
            Ok(report)
        }
        Ok(()) => Ok(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::{
        coordinator::{
            tests::{fakes, Calls},
            Phase,
        },
        server::RestServer,
        signal::{SignalListener, Termination},
    };
    use axum::{routing::get, Router};
    use futures::channel::mpsc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_util::sync::CancellationToken;

    const BUDGET: Duration = Duration::from_secs(2);

    fn app() -> Router {
        Router::new().route("/", get(|| async { "ok" }))
    }

    #[tokio::test]
    async fn bind_failure_skips_shutdown() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let server = RestServer::new(taken.local_addr().unwrap().to_string(), app());
        let calls = Calls::default();
        let (listener, store) = fakes(&calls);
        let coordinator = ShutdownCoordinator::new(CancellationToken::new(), listener, store);

        let result = timeout(BUDGET, supervise(server.run(), coordinator))
            .await
            .unwrap();

        assert!(matches!(
            result,
            Err(SupervisorError::Startup(ServerError::Bind { .. }))
        ));
        assert!(calls.get().is_empty());
    }

    #[tokio::test]
    async fn signal_shuts_server_then_store() {
        let server = RestServer::new("127.0.0.1:0", app());
        let handle = server.handle();
        let calls = Calls::default();
        let (_, store) = fakes(&calls);
        let (tx, rx) = mpsc::unbounded();
        let signals = SignalListener::from_source(rx);
        let coordinator = ShutdownCoordinator::new(signals.cancellation(), handle.clone(), store)
            .with_deadline(Some(BUDGET));
        let phases = coordinator.phases();

        let supervised = tokio::spawn(supervise(server.run(), coordinator));
        assert!(handle.local_addr().await.is_some());
        tx.unbounded_send(Termination::Interrupt).unwrap();

        let report = timeout(BUDGET, supervised).await.unwrap().unwrap().unwrap();

        assert!(report.is_clean());
        assert!(handle.is_finished());
        assert_eq!(vec!["store.close"], calls.get());
        assert_eq!(Phase::Done, *phases.borrow());
    }

    #[tokio::test]
    async fn duplicate_signals_shut_down_once() {
        let calls = Calls::default();
        let (listener, store) = fakes(&calls);
        let (tx, rx) = mpsc::unbounded();
        let signals = SignalListener::from_source(rx);
        let coordinator = ShutdownCoordinator::new(signals.cancellation(), listener, store);

        // A stand-in server loop that returns once cancelled.
        let cancellation = signals.cancellation();
        let server = async move {
            cancellation.cancelled().await;
            Ok::<(), ServerError>(())
        };

        tx.unbounded_send(Termination::Interrupt).unwrap();
        tx.unbounded_send(Termination::Interrupt).unwrap();
        let report = timeout(BUDGET, supervise(server, coordinator))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(Outcome::Completed, report.outcome);
        assert_eq!(
            vec!["listener.shutdown:start", "listener.shutdown", "store.close"],
            calls.get()
        );
    }

    #[tokio::test]
    async fn server_failure_after_cancellation_is_reported() {
        let calls = Calls::default();
        let (listener, store) = fakes(&calls);
        let cancellation = CancellationToken::new();
        let coordinator = ShutdownCoordinator::new(cancellation.clone(), listener, store);

        cancellation.cancel();
        let server = async { Err::<(), _>(ServerError::Task("connection loop crashed".to_string())) };
        let report = timeout(BUDGET, supervise(server, coordinator))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(Outcome::Completed, report.outcome);
        assert!(report.failures.is_empty());
        assert!(matches!(report.server_failure, Some(ServerError::Task(_))));
        assert!(!report.is_clean());
        assert_eq!(
            vec!["listener.shutdown:start", "listener.shutdown", "store.close"],
            calls.get()
        );
    }
}
