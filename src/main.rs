use std::sync::Arc;

use delivery_desk::api;
use delivery_desk::config::Config;
use delivery_desk::error::AppError;
use delivery_desk::services::accounts;
use delivery_desk::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let http_port = config.http_port;
    let seed_admin = config.seed_admin.clone();
    let shared_state = Arc::new(AppState::new(config));

    if let Some(seed) = seed_admin {
        accounts::ensure_admin(&shared_state, &seed.username, &seed.password)?;
        tracing::info!(username = %seed.username, "bootstrap admin ready");
    }

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
