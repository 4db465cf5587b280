//! Runs the REST server until it is told to stop.
//!
//! Connections are served by hyper's HTTP/1 implementation, one task per
//! connection, all owned by the accept loop. Stopping closes the listening
//! socket at once, asks every connection to finish its current request, and
//! aborts whatever is still running when the drain deadline passes.

use super::{
    coordinator::Listener,
    error::{ServerError, ShutdownError},
};
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use std::{net::SocketAddr, time::Duration};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The REST server.
#[derive(Debug)]
pub struct RestServer {
    address: String,
    app: Router,
    handle: ServerHandle,
    bound: watch::Sender<Option<SocketAddr>>,
}

/// Controls a [`RestServer`] from other tasks.
#[derive(Clone, Debug)]
pub struct ServerHandle {
    stop: CancellationToken,
    force: CancellationToken,
    finished: CancellationToken,
    bound: watch::Receiver<Option<SocketAddr>>,
}

impl RestServer {
    /// Creates a server for `app` that will listen on `address`.
    pub fn new(address: impl Into<String>, app: Router) -> Self {
        let (bound, bound_rx) = watch::channel(None);
        Self {
            address: address.into(),
            app,
            handle: ServerHandle {
                stop: CancellationToken::new(),
                force: CancellationToken::new(),
                finished: CancellationToken::new(),
                bound: bound_rx,
            },
            bound,
        }
    }

    /// Returns a handle for stopping the server.
    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    /// Binds the address and serves requests until [`ServerHandle::shutdown`].
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound.
    #[instrument(skip_all, fields(address = %self.address))]
    pub async fn run(self) -> Result<(), ServerError> {
        let _finished = self.handle.finished.clone().drop_guard();

        let address = bind_address(&self.address);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;
        self.bound.send_replace(Some(local_addr));
        tracing::info!("Starting REST server on {}", local_addr);

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                _ = self.handle.stop.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let stop = self.handle.stop.clone();
                        connections.spawn(serve_connection(stream, peer, self.app.clone(), stop));
                    }
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        drop(listener);
        tracing::info!("Stopped accepting, draining {} connection(s)", connections.len());
        tokio::select! {
            _ = drain(&mut connections) => {
                tracing::debug!("All connections drained");
            }
            _ = self.handle.force.cancelled() => {
                tracing::warn!("Forcing {} connection(s) closed", connections.len());
                connections.shutdown().await;
            }
        }
        Ok(())
    }
}

impl ServerHandle {
    /// The bound address, once the server is listening.
    ///
    /// Resolves to `None` if the server stopped before binding.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        let mut bound = self.bound.clone();
        tokio::select! {
            addr = bound.wait_for(Option::is_some) => addr.ok().and_then(|addr| *addr),
            _ = self.finished.cancelled() => *self.bound.borrow(),
        }
    }

    /// Whether the server loop has returned.
    pub fn is_finished(&self) -> bool {
        self.finished.is_cancelled()
    }
}

#[async_trait::async_trait]
impl Listener for ServerHandle {
    /// Stops accepting and waits for open connections to finish.
    ///
    /// With a deadline, stragglers are forced closed once it passes and
    /// [`ShutdownError::DrainTimeout`] is returned. Only the abort itself,
    /// which does not wait on any request, runs past the deadline.
    async fn shutdown(&self, deadline: Option<Duration>) -> Result<(), ShutdownError> {
        self.stop.cancel();
        let Some(deadline) = deadline else {
            self.finished.cancelled().await;
            return Ok(());
        };
        match tokio::time::timeout(deadline, self.finished.cancelled()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                self.force.cancel();
                self.finished.cancelled().await;
                Err(ShutdownError::DrainTimeout(deadline))
            }
        }
    }
}

/// Accepts Go-style addresses with an empty host, like `:8080`.
pub fn bind_address(address: &str) -> String {
    match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => address.to_string(),
    }
}

async fn drain(connections: &mut JoinSet<()>) {
    while connections.join_next().await.is_some() {}
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, app: Router, stop: CancellationToken) {
    let io = TokioIo::new(stream);
    let service = TowerToHyperService::new(app);
    let conn = http1::Builder::new()
        .serve_connection(io, service)
        .with_upgrades();
    tokio::pin!(conn);

    tokio::select! {
        result = conn.as_mut() => {
            if let Err(e) = result {
                tracing::debug!(%peer, "Connection error: {}", e);
            }
            return;
        }
        _ = stop.cancelled() => {}
    }

    // Finish the in-flight request, if any, then close.
    conn.as_mut().graceful_shutdown();
    if let Err(e) = conn.await {
        tracing::debug!(%peer, "Connection error while draining: {}", e);
    }
}
