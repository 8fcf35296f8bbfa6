use std::future::IntoFuture;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::commands;
use crate::config::ServerConfig;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/test-connection", post(commands::test_connection))
        .route("/api/execute-query", post(commands::execute_query))
        .route("/api/get-schemas", post(commands::get_schemas))
        .route("/api/generate-sql", post(commands::generate_sql))
        .route("/api/health", get(commands::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self { config, router }
    }

    /// Serves until the listener fails or a termination signal arrives.
    /// In-flight requests are not drained on shutdown.
    pub async fn start(self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.config.addr()).await?;
        info!("SQL Editor API server running on port {}", self.config.port);
        info!("Health check: http://localhost:{}/api/health", self.config.port);

        tokio::select! {
            served = axum::serve(listener, self.router).into_future() => served,
            signal = shutdown_signal() => {
                info!("Received {}. Shutting down", signal);
                Ok(())
            }
        }
    }
}

async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Unable to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = ctrl_c => name,
        name = terminate => name,
    }
}
