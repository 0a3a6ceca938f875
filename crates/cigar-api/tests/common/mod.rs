//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeDelta;
use cigar_core::clock::Clock;
use cigar_core::store::CompletionStore;
use cigar_intro::application::script::default_script;
use cigar_intro::domain::reveal::RevealConfig;
use cigar_intro::domain::sequencer::SequencerConfig;
use cigar_test_support::{FixedClock, epoch};
use http_body_util::BodyExt;
use tower::ServiceExt;

use cigar_api::routes;
use cigar_api::state::{AppState, DEFAULT_SESSION_IDLE_TTL};

/// Fixed timestamp used for completion records.
fn fixed_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(FixedClock(epoch()))
}

/// Short timings so a whole intro plays out in a few virtual seconds.
pub fn fast_config() -> SequencerConfig {
    SequencerConfig {
        reveal: RevealConfig {
            char_interval: TimeDelta::milliseconds(1),
            line_pause: TimeDelta::milliseconds(10),
        },
        auto_advance_delay: TimeDelta::milliseconds(500),
        exit_delay: TimeDelta::milliseconds(1000),
    }
}

/// Build the full app router over the bundled script and `store`. Uses the
/// same route structure as `main.rs`.
pub fn build_test_app(store: Arc<dyn CompletionStore>) -> (Router, AppState) {
    build_test_app_with_idle_ttl(store, DEFAULT_SESSION_IDLE_TTL)
}

/// Build the full app router with a custom session idle time and a running
/// reaper.
pub fn build_test_app_with_idle_ttl(
    store: Arc<dyn CompletionStore>,
    idle_ttl: Duration,
) -> (Router, AppState) {
    let app_state = AppState::new(
        fixed_clock(),
        store,
        Arc::new(default_script()),
        fast_config(),
    )
    .with_session_idle_ttl(idle_ttl);
    app_state.sessions.spawn_reaper();
    (routes::app(app_state.clone()), app_state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

/// Send a POST request with an empty body and return the response.
pub async fn post(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a DELETE request and return the response status.
pub async fn delete(app: Router, uri: &str) -> StatusCode {
    let request = Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await.0
}
