mod config;
mod db;
mod error;
mod routes;
mod services;
mod state;
mod validate;

use tracing_subscriber::EnvFilter;

use crate::config::{Config, ConfigError};

const DEFAULT_LOG_FILTER: &str = "carehub_server=info,tower_http=info";

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("database init failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: std::io::Error },
    #[error("server failed: {0}")]
    Serve(std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .init();

    let config = Config::from_env()?;
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;

    let addr = config.listen_addr();
    let state = state::AppState::new(pool, config);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind { addr: addr.clone(), source })?;

    tracing::info!(%addr, "carehub listening");
    axum::serve(listener, app).await.map_err(StartupError::Serve)
}
