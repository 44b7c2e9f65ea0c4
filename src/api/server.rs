//! API Server
//!
//! Listener setup, middleware stack and graceful shutdown.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
    websocket::SessionHub,
};
use crate::casino::CasinoService;
use crate::config::ServerConfig;
use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ServerConfig::default().into()
    }
}

impl From<ServerConfig> for ApiConfig {
    fn from(server: ServerConfig) -> Self {
        Self {
            host: server.host,
            port: server.port,
            allowed_origins: server.allowed_origins,
            request_timeout_secs: server.request_timeout_secs,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

pub struct ApiServer {
    config: ApiConfig,
    service: Arc<CasinoService>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, service: Arc<CasinoService>) -> Self {
        Self { config, service }
    }

    /// Bind the configured address and serve until Ctrl-C / SIGTERM
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.get_socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves, then
    /// close storage.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.create_app();
        info!("Reelhouse v{} listening on http://{}", self.config.version, listener.local_addr()?);
        self.log_server_info();

        let served = axum::serve(listener, app).with_graceful_shutdown(shutdown).await;

        // Close storage even if the listener failed
        if let Err(e) = self.service.shutdown().await {
            error!("Failed to close storage: {}", e);
        }
        served?;

        info!("Server stopped gracefully");
        Ok(())
    }

    /// Create the application with middleware stack
    pub fn create_app(&self) -> axum::Router {
        let state = Arc::new(AppState {
            hub: Arc::new(SessionHub::new(self.service.clone())),
        });

        create_router(state).layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(create_cors_layer(&self.config.allowed_origins))
                .layer(TimeoutLayer::new(Duration::from_secs(self.config.request_timeout_secs))),
        )
    }

    fn get_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }

    fn log_server_info(&self) {
        info!("   CORS: {:?}", self.config.allowed_origins);
        info!("   Request timeout: {}s", self.config.request_timeout_secs);
        info!("   Games: {:?}", self.service.catalog().ids());
        info!("   GET  /health  - Health check");
        info!("   GET  /ws      - Session channel (login, balance, gamestate, bet)");
    }
}

/// Wait for shutdown signal
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
