//! Route modules.

pub mod health;
pub mod intro;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with the site's origin once it is fixed.
    Router::new()
        .merge(health::router())
        .nest("/api/v1/intro", intro::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
