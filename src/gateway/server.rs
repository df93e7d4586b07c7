//! Gateway server

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::Client;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

use super::router::{AppState, create_router};
use crate::auth::{IdentityReconciler, OAuthExchanger, TokenCodec};
use crate::config::Config;
use crate::relay::DriveClient;
use crate::store::{IdentityStore, MemoryStore};
use crate::{Error, Result};

/// Feeder gateway server
pub struct Gateway {
    config: Config,
    store: Arc<dyn IdentityStore>,
}

impl Gateway {
    /// Create a new gateway over an in-memory identity store
    pub fn new(config: Config) -> Self {
        Self {
            config,
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// Create a gateway over an explicit identity store
    pub fn with_store(config: Config, store: Arc<dyn IdentityStore>) -> Self {
        Self { config, store }
    }

    /// Run the gateway until a shutdown signal arrives
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        // One HTTP client shared by the exchanger and the relay
        let http = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        let tokens = Arc::new(TokenCodec::new(
            &self.config.session.token_secret,
            self.config.session.token_expiration_secs,
        ));

        let state = Arc::new(AppState {
            store: Arc::clone(&self.store),
            reconciler: IdentityReconciler::new(Arc::clone(&self.store)),
            oauth: OAuthExchanger::new(http.clone(), self.config.oauth.clone()),
            tokens,
            drive: Arc::new(DriveClient::new(http, &self.config.drive)),
            chunk_size: self.config.drive.chunk_size,
            client_url: self.config.server.client_url.clone(),
        });

        let app = create_router(state);

        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("FEEDER GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(client_url = %self.config.server.client_url, "CORS origin");
        info!(
            "Session tokens expire after {}s",
            self.config.session.token_expiration_secs
        );
        info!(
            drive = %self.config.drive.base_url,
            chunk_size = self.config.drive.chunk_size,
            "Media relay upstream"
        );
        info!("============================================================");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("Gateway stopped");
        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
