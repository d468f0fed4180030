//! Dashboard HTTP server over the local mirror root.
//!
//! Everything the dashboard and the REST surface need is a file in the
//! mirror root (`config.json`, `overview.json`, `jobs/<id>/...`), so the
//! router is a static-file service plus a health probe. The mirror core
//! replaces those files atomically, which makes serving them concurrently
//! with a refresh cycle safe.

use async_trait::async_trait;
use axum::{routing::get, Json, Router};
use hindsight_core::{MirrorError, Result, WebFrontend};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Serving layer for the mirror root.
///
/// Port 0 binds an ephemeral port; the actual address is available from
/// [`local_addr`](Self::local_addr) after a successful start.
pub struct DashboardServer {
    host: String,
    port: u16,
    running: Option<RunningServer>,
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl DashboardServer {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            running: None,
        }
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.addr)
    }
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[async_trait]
impl WebFrontend for DashboardServer {
    async fn start(&mut self, web_root: &Path) -> Result<()> {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let app = Router::new()
            .route("/health", get(handle_health))
            .fallback_service(ServeDir::new(web_root))
            .layer(TraceLayer::new_for_http())
            .layer(cors);

        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| MirrorError::Config {
                message: format!("Invalid bind address {}:{}: {e}", self.host, self.port),
            })?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(MirrorError::from)?;
        let actual_addr = listener.local_addr().map_err(MirrorError::from)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!("Dashboard listening on {}", actual_addr);
        self.running = Some(RunningServer {
            addr: actual_addr,
            shutdown: shutdown_tx,
            handle,
        });
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        info!("Stopping dashboard on {}", running.addr);
        let _ = running.shutdown.send(());
        match running.handle.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(MirrorError::Shutdown {
                message: format!("dashboard server exited with an error: {e}"),
            }),
            Err(e) => Err(MirrorError::Shutdown {
                message: format!("dashboard server task failed: {e}"),
            }),
        }
    }
}
