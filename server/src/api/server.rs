//! API server initialization

use std::sync::Arc;

use tokio::net::TcpListener;

use super::routes;
use crate::core::config::ResolvedConfiguration;
use crate::core::error::StartupError;
use crate::core::shutdown::ShutdownService;

pub struct ApiServer {
    config: Arc<ResolvedConfiguration>,
    shutdown: ShutdownService,
}

impl ApiServer {
    pub fn new(config: Arc<ResolvedConfiguration>, shutdown: ShutdownService) -> Self {
        Self { config, shutdown }
    }

    /// Bind and serve until shutdown is triggered
    pub async fn start(self) -> Result<(), StartupError> {
        let router = routes::routes(self.config.clone())?;

        let address = self.config.server.bind_address();
        let listener = TcpListener::bind(address.as_str())
            .await
            .map_err(|source| StartupError::Bind {
                address: address.clone(),
                source,
            })?;

        tracing::info!(
            address = %address,
            path = %self.config.server.path,
            "Server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(self.shutdown.wait())
            .await?;

        tracing::debug!("Server stopped");
        Ok(())
    }
}
