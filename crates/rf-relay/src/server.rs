use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::RelayConfig;
use crate::routes::router;
use crate::state::RelayState;
use crate::uploads::UploadDir;
use crate::upstream::build_backend;

pub struct RelayServer {
    config: RelayConfig,
    state: Arc<RelayState>,
    shutdown: CancellationToken,
}

impl RelayServer {
    pub async fn new(config: RelayConfig) -> anyhow::Result<Self> {
        let uploads = UploadDir::prepare(&config.upload_dir).await?;
        let backend = build_backend(&config.upstream)?;
        info!(
            "Using {} video backend at {}",
            backend.name(),
            config.upstream.api_url
        );

        let shutdown = CancellationToken::new();
        let state = Arc::new(RelayState::new(backend, uploads, shutdown.clone()));

        Ok(Self {
            config,
            state,
            shutdown,
        })
    }

    pub fn router(&self) -> Router {
        router(self.state.clone())
    }

    /// Cancelling this token stops the server and every in-flight poll.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr).await?;
        self.serve_on(listener).await
    }

    pub async fn serve_on(self, listener: TcpListener) -> anyhow::Result<()> {
        let port = listener.local_addr()?.port();
        info!("Starting relay server on port {}", port);
        info!("Health check: http://localhost:{}/api/health", port);

        let app = self.router();
        let shutdown = self.shutdown.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutdown requested");
                        shutdown.cancel();
                    }
                    _ = shutdown.cancelled() => {}
                }
            })
            .await?;

        info!("Relay server stopped");
        Ok(())
    }
}
