//! Liveness check.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Body of `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server answers.
    pub status: &'static str,
    /// Crate version of the running binary.
    pub version: &'static str,
    /// Scenes in the loaded script.
    pub scenes: usize,
    /// Intro sessions currently mounted.
    pub active_sessions: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        scenes: state.script.len(),
        active_sessions: state.sessions.len(),
    })
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
