pub mod client;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod format;
pub mod http;
pub mod models;
pub mod query;
pub mod schema;
pub mod state;

use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use http::HttpServer;
use state::AppState;

const DEFAULT_LOG_FILTER: &str = "sqlpad=info,sqlpad_lib=info,tower_http=info";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Gateway entrypoint: logging, `PORT`, drivers, then serve.
pub async fn run() -> std::io::Result<()> {
    init_tracing();
    let config = ServerConfig::from_env();
    let state = AppState::new(&config);
    let router = http::router(state);
    HttpServer::new(config, router).start().await
}
