//! Listener lifecycle: `Stopped → Starting → Serving → ShuttingDown → Stopped`.
//!
//! The starting stage is the [`Server`] value itself: [`Server::bind`] claims
//! the address, [`Server::start`] spawns the accept loop and hands back a
//! [`RunningServer`], which tracks the remaining states. The caller then waits on
//! whichever comes first, a termination signal or the listener exiting on
//! its own, and drives [`RunningServer::shutdown`] at most once.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};

use crate::config::ServerConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Serving,
    ShuttingDown,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("server error")]
    Serve(#[source] io::Error),

    #[error("server task failed")]
    Task(#[source] JoinError),

    #[error("server shutdown timed out after {0:?}")]
    ShutdownTimedOut(Duration),
}

/// A bound listener that has not started accepting yet.
pub struct Server {
    listener: TcpListener,
    router: Router,
    shutdown_timeout: Duration,
}

impl Server {
    pub async fn bind(config: ServerConfig, router: Router) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.addr,
                source,
            })?;

        Ok(Self {
            listener,
            router,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the accept loop. A listener stopped through
    /// [`RunningServer::shutdown`] completes with `Ok(())`.
    pub fn start(self) -> RunningServer {
        let Server {
            listener,
            router,
            shutdown_timeout,
        } = self;
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        match listener.local_addr() {
            Ok(addr) => info!(%addr, "Server listening"),
            Err(e) => warn!(error = %e, "Server listening on unknown address"),
        }

        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    // A dropped sender also stops the server
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await
                .map_err(ServerError::Serve)
        });

        RunningServer {
            task,
            shutdown_tx,
            shutdown_timeout,
            state: ServerState::Serving,
        }
    }
}

pub struct RunningServer {
    task: JoinHandle<Result<(), ServerError>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_timeout: Duration,
    state: ServerState,
}

impl RunningServer {
    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Resolves when the accept loop exits without a shutdown request.
    /// Cancel-safe: dropping the future leaves the server running.
    pub async fn wait(&mut self) -> Result<(), ServerError> {
        if self.state == ServerState::Stopped {
            return Ok(());
        }

        let result = flatten(&mut self.task).await;
        self.state = ServerState::Stopped;
        if let Err(e) = &result {
            error!(error = ?e, "Server exited unexpectedly");
        }
        result
    }

    /// Stops accepting connections and waits up to the shutdown timeout for
    /// in-flight requests. Not retried on timeout.
    pub async fn shutdown(&mut self) -> Result<(), ServerError> {
        if self.state == ServerState::Stopped {
            return Ok(());
        }

        info!("Shutting down server...");
        self.state = ServerState::ShuttingDown;
        let _ = self.shutdown_tx.send(true);

        match tokio::time::timeout(self.shutdown_timeout, flatten(&mut self.task)).await {
            Ok(result) => {
                self.state = ServerState::Stopped;
                if result.is_ok() {
                    info!("Server stopped gracefully");
                }
                result
            }
            Err(_) => {
                warn!(timeout = ?self.shutdown_timeout, "In-flight requests outlived shutdown timeout");
                Err(ServerError::ShutdownTimedOut(self.shutdown_timeout))
            }
        }
    }
}

async fn flatten(task: &mut JoinHandle<Result<(), ServerError>>) -> Result<(), ServerError> {
    match task.await {
        Ok(result) => result,
        Err(e) => Err(ServerError::Task(e)),
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
