use tokio::net::TcpListener;

use crate::config::PreviewConfig;
use crate::error::{ServeError, ServeResult};
use crate::reconstruct::Reconstructor;
use crate::router::build_router;

/// Local HTTP server answering requests the way the generated worker does.
pub struct PreviewServer {
    config: PreviewConfig,
    reconstructor: Reconstructor,
}

impl PreviewServer {
    pub fn new(config: PreviewConfig, reconstructor: Reconstructor) -> Self {
        Self {
            config,
            reconstructor,
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.reconstructor.clone())
    }

    /// Bind the configured address and serve until the process exits.
    pub async fn serve(self) -> ServeResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> ServeResult<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            %addr,
            files = self.reconstructor.manifest().len(),
            "preview server listening"
        );
        let app = build_router(self.reconstructor);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServeError::Internal(e.to_string()))
    }
}
