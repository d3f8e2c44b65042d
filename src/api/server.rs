//! Relay server lifecycle — starts/stops the local axum server that hosts
//! the chat relay.
//!
//! Pattern: bind → spawn background task → return handle with shutdown
//! channel. The server binds loopback only; the orchestrator (and any UI
//! embedding it) talks to it over `http://127.0.0.1:<port>`.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::relay::{relay_router, RelayState};

/// Handle to a running relay server.
pub struct RelayServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RelayServer {
    /// Address the server is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Full URL of the chat endpoint.
    pub fn chat_url(&self) -> String {
        format!("http://{}/api/chat", self.addr)
    }

    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Relay server shutdown signal sent");
        }
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start the relay server on `bind_addr` (port 0 picks an ephemeral port),
/// forwarding to `upstream_url`.
pub async fn start_relay_server(
    bind_addr: SocketAddr,
    upstream_url: impl Into<String>,
) -> Result<RelayServer, std::io::Error> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    let app = relay_router(RelayState::new(upstream_url));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Relay server received shutdown signal");
        };

        tracing::info!(%addr, "Relay server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Relay server error: {e}");
        }

        tracing::info!("Relay server stopped");
    });

    Ok(RelayServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}
