use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::processor::BatchProcessor;
use crate::router::build_router;

/// Development ledger gateway.
pub struct GatewayServer {
    config: GatewayConfig,
    processor: Arc<BatchProcessor>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig) -> Self {
        let processor = Arc::new(BatchProcessor::new(&config));
        Self { config, processor }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(Arc::clone(&self.processor))
    }

    /// Serve until the process is killed.
    pub async fn serve(self) -> GatewayResult<()> {
        self.serve_with_shutdown(std::future::pending()).await
    }

    /// Serve until `signal` resolves, then drain in-flight requests.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> GatewayResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            commit_delay_ms = self.config.commit_delay_ms,
            address_check = ?self.config.handler.address_check,
            "custody gateway listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = GatewayServer::new(GatewayConfig::default());
        assert_eq!(server.config().bind_addr, "127.0.0.1:8008".parse().unwrap());
    }

    #[tokio::test]
    async fn serves_until_shutdown_signal() {
        let config = GatewayConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..GatewayConfig::default()
        };
        let server = GatewayServer::new(config);
        server.serve_with_shutdown(async {}).await.unwrap();
    }
}
