//! $CIGAR Protocol API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use cigar_api::config::AppConfig;
use cigar_api::error::AppError;
use cigar_api::routes;
use cigar_api::state::AppState;
use cigar_core::clock::SystemClock;
use cigar_store::file_completion_store::FileCompletionStore;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting $CIGAR Protocol API server");

    let config = AppConfig::from_env()?;
    let script = config.load_script()?;
    tracing::info!(
        scenes = script.len(),
        state_file = %config.state_file.display(),
        "scene script loaded"
    );

    let app_state = AppState::new(
        Arc::new(SystemClock),
        Arc::new(FileCompletionStore::new(config.state_file.clone())),
        Arc::new(script),
        config.sequencer,
    )
    .with_session_idle_ttl(config.session_idle_ttl);
    let _reaper = app_state.sessions.spawn_reaper();
    let app = routes::app(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
