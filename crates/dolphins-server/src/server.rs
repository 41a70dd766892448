use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Dolphins HTTP gateway.
pub struct DolphinsServer {
    config: ServerConfig,
    state: AppState,
}

impl DolphinsServer {
    /// Open the configured ledger and prepare the server.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = AppState::from_config(&config)?;
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = build_router(self.state);
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!("Dolphins server listening on {}", self.config.bind_addr);
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = DolphinsServer::new(ServerConfig::default()).unwrap();
        assert_eq!(server.config().bind_addr.port(), 8080);
        assert!(server.state().ledger().journal_path().is_none());
    }

    #[test]
    fn router_builds() {
        let server = DolphinsServer::new(ServerConfig::default()).unwrap();
        let _router = server.router();
    }
}
