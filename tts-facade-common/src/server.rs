//! HTTP server builder utilities.
//!
//! Binds an axum [`Router`] to a TCP listener and serves it until a shutdown
//! signal (SIGTERM/SIGINT) or a programmatic shutdown channel fires.
//!
//! # Example
//!
//! ```ignore
//! use tts_facade_common::server::HttpServerBuilder;
//!
//! HttpServerBuilder::new(router)
//!     .with_bind_addr("0.0.0.0:8080")
//!     .run()
//!     .await?;
//! ```

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Errors that can occur when running the HTTP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("Failed to bind to {addr}: {message}")]
    BindFailed { addr: String, message: String },

    /// Error while serving connections
    #[error("Serve error: {0}")]
    Serve(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

enum Bind {
    Addr(String),
    Listener(TcpListener),
}

/// Builder for configuring and running the HTTP server.
pub struct HttpServerBuilder {
    router: Router,
    bind: Bind,
    shutdown_rx: Option<oneshot::Receiver<()>>,
}

impl HttpServerBuilder {
    /// Create a new server builder for the given router, bound to `0.0.0.0:8080`.
    pub fn new(router: Router) -> Self {
        Self {
            router,
            bind: Bind::Addr("0.0.0.0:8080".to_string()),
            shutdown_rx: None,
        }
    }

    /// Set the `host:port` address to bind.
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind = Bind::Addr(addr.into());
        self
    }

    /// Serve on an already bound listener (e.g. port 0 in tests).
    pub fn with_listener(mut self, listener: TcpListener) -> Self {
        self.bind = Bind::Listener(listener);
        self
    }

    /// Set a shutdown signal receiver for graceful shutdown.
    ///
    /// When the sender is dropped or a message is sent, the server
    /// stops accepting connections and drains in-flight requests.
    pub fn with_shutdown(mut self, shutdown_rx: oneshot::Receiver<()>) -> Self {
        self.shutdown_rx = Some(shutdown_rx);
        self
    }

    /// Run the server until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = match self.bind {
            Bind::Listener(listener) => listener,
            Bind::Addr(addr) => TcpListener::bind(&addr)
                .await
                .map_err(|e| ServerError::BindFailed {
                    addr: addr.clone(),
                    message: e.to_string(),
                })?,
        };

        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "HTTP server listening");

        let shutdown_rx = self.shutdown_rx;
        let shutdown_future = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => wait_for_shutdown_signal().await,
            }
            tracing::info!("Received shutdown signal, stopping server");
        };

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_future)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to register Ctrl+C handler");
        tracing::info!("Received Ctrl+C");
    }
}

/// Convenience function to set up programmatic shutdown.
///
/// Returns a sender that triggers shutdown and a receiver to pass to
/// [`HttpServerBuilder::with_shutdown`].
pub fn shutdown_channel() -> (oneshot::Sender<()>, oneshot::Receiver<()>) {
    oneshot::channel()
}
