//! Quill HTTP server: public article/comment API plus the admin API.

mod config;
mod handlers;
mod request_context;
mod routes;
mod state;

use anyhow::{Context, Result};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_env()?;
    let _log_guard = quill_runtime::init_tracing("quill-backend", config.log_dir.as_deref())?;

    tracing::info!("Starting Quill backend server");
    tracing::info!("Database: {}", config.db_path.display());

    let db = quill_shared::db::open(&config.db_path)?;
    let app_state = state::AppState::new(db);
    tracing::info!("Loaded {} articles", app_state.article_count()?);

    let app = routes::create_router(app_state, &config.cors_origins);

    let addr = config.listen_addr();
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
    }
}
