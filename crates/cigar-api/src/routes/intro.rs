//! Routes for the story intro: completion status, the scene script, and
//! mounted sequencer sessions.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use cigar_core::error::DomainError;
use cigar_intro::application::runner::IntroHandle;
use cigar_intro::application::views::{ScriptView, SequencerView};
use cigar_intro::domain::commands::IntroCommand;

use crate::error::ApiError;
use crate::state::AppState;

/// Response body for the completion status.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// True once a visitor has finished the intro.
    pub intro_completed: bool,
    /// When the intro was finished.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Response body returned when a session is mounted.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Id used to address the session.
    pub session_id: Uuid,
    /// Initial view of the sequencer.
    pub view: SequencerView,
}

async fn current_status(state: &AppState) -> Result<StatusResponse, ApiError> {
    let record = state.completion_store.load().await?;
    Ok(StatusResponse {
        intro_completed: record.is_some(),
        completed_at: record.map(|r| r.completed_at),
    })
}

fn session(state: &AppState, session_id: Uuid) -> Result<IntroHandle, ApiError> {
    state
        .sessions
        .get(session_id)
        .ok_or(ApiError(DomainError::SessionNotFound(session_id)))
}

/// GET /status
#[instrument(skip(state))]
async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    Ok(Json(current_status(&state).await?))
}

/// POST /reset
#[instrument(skip(state))]
async fn reset(State(state): State<AppState>) -> Result<Json<StatusResponse>, ApiError> {
    state.completion_store.reset().await?;
    info!("intro completion flag cleared");
    Ok(Json(current_status(&state).await?))
}

/// GET /scenes
async fn list_scenes(State(state): State<AppState>) -> Json<ScriptView> {
    Json(ScriptView::of(&state.script))
}

/// POST /sessions
#[instrument(skip(state))]
async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let (session_id, handle) = state.mount_session();
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            view: handle.view(),
        }),
    )
}

/// GET /sessions/{id}
#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SequencerView>, ApiError> {
    Ok(Json(session(&state, session_id)?.view()))
}

/// DELETE /sessions/{id}
#[instrument(skip(state))]
async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .remove(session_id)
        .ok_or(ApiError(DomainError::SessionNotFound(session_id)))?;
    info!("intro session unmounted");
    Ok(StatusCode::NO_CONTENT)
}

async fn dispatch(
    state: &AppState,
    session_id: Uuid,
    command: IntroCommand,
) -> Result<Json<SequencerView>, ApiError> {
    let handle = session(state, session_id)?;
    match handle.send(command).await {
        Ok(view) => Ok(Json(view)),
        // The runner stops once the intro completes; the session is gone.
        Err(DomainError::Infrastructure(_)) if !handle.is_running() => {
            Err(ApiError(DomainError::SessionNotFound(session_id)))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /sessions/{id}/next
#[instrument(skip(state))]
async fn next(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SequencerView>, ApiError> {
    dispatch(&state, session_id, IntroCommand::Next).await
}

/// POST /sessions/{id}/previous
#[instrument(skip(state))]
async fn previous(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SequencerView>, ApiError> {
    dispatch(&state, session_id, IntroCommand::Previous).await
}

/// POST /sessions/{id}/activate
#[instrument(skip(state))]
async fn activate(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SequencerView>, ApiError> {
    dispatch(&state, session_id, IntroCommand::Activate).await
}

/// Returns the router for the intro.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/reset", post(reset))
        .route("/scenes", get(list_scenes))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/next", post(next))
        .route("/sessions/{id}/previous", post(previous))
        .route("/sessions/{id}/activate", post(activate))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use cigar_core::clock::Clock;
    use cigar_core::store::{CompletionRecord, CompletionStore};
    use cigar_intro::application::script::default_script;
    use cigar_intro::domain::sequencer::SequencerConfig;
    use cigar_test_support::{
        FailingCompletionStore, FixedClock, InMemoryCompletionStore, epoch,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn app_state_with(completion_store: Arc<dyn CompletionStore>) -> AppState {
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(FixedClock(epoch()));
        AppState::new(
            clock,
            completion_store,
            Arc::new(default_script()),
            SequencerConfig::default(),
        )
    }

    fn test_app_state() -> AppState {
        app_state_with(Arc::new(InMemoryCompletionStore::new()))
    }

    async fn send(state: AppState, method: &str, uri: &str) -> (StatusCode, Value) {
        let app = router().with_state(state);
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_status_reports_not_completed_for_empty_store() {
        // Arrange
        let state = test_app_state();

        // Act
        let (status, json) = send(state, "GET", "/status").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intro_completed"], false);
        assert!(json["completed_at"].is_null());
    }

    #[tokio::test]
    async fn test_reset_clears_a_completed_intro() {
        // Arrange
        let store = Arc::new(InMemoryCompletionStore::completed(CompletionRecord {
            completed_at: epoch(),
        }));
        let state = app_state_with(store.clone());

        // Act
        let (status, json) = send(state, "POST", "/reset").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intro_completed"], false);
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_status_returns_500_when_store_fails() {
        // Arrange
        let state = app_state_with(Arc::new(FailingCompletionStore));

        // Act
        let (status, json) = send(state, "GET", "/status").await;

        // Assert
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "infrastructure_error");
    }

    #[tokio::test]
    async fn test_scenes_lists_the_bundled_script() {
        // Arrange
        let state = test_app_state();

        // Act
        let (status, json) = send(state, "GET", "/scenes").await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        let scenes = json["scenes"].as_array().unwrap();
        assert_eq!(scenes.len(), 6);
        assert_eq!(scenes[0]["id"], 1);
        assert_eq!(scenes[5]["layout"], "centered");
    }

    #[tokio::test]
    async fn test_create_session_returns_201_with_initial_view() {
        // Arrange
        let state = test_app_state();

        // Act
        let (status, json) = send(state.clone(), "POST", "/sessions").await;

        // Assert
        assert_eq!(status, StatusCode::CREATED);
        let session_id = Uuid::parse_str(json["session_id"].as_str().unwrap()).unwrap();
        assert!(state.sessions.get(session_id).is_some());
        assert_eq!(json["view"]["current_index"], 0);
        assert_eq!(json["view"]["auto_advance_enabled"], true);
    }

    #[tokio::test]
    async fn test_next_moves_forward_and_disables_auto_advance() {
        // Arrange
        let state = test_app_state();
        let (session_id, _handle) = state.mount_session();

        // Act
        let (status, json) = send(state, "POST", &format!("/sessions/{session_id}/next")).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["current_index"], 1);
        assert_eq!(json["auto_advance_enabled"], false);
    }

    #[tokio::test]
    async fn test_previous_at_first_scene_stays_put() {
        // Arrange
        let state = test_app_state();
        let (session_id, _handle) = state.mount_session();

        // Act
        let (status, json) =
            send(state, "POST", &format!("/sessions/{session_id}/previous")).await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["current_index"], 0);
        assert_eq!(json["auto_advance_enabled"], false);
    }

    #[tokio::test]
    async fn test_activate_away_from_terminal_scene_returns_409() {
        // Arrange
        let state = test_app_state();
        let (session_id, _handle) = state.mount_session();

        // Act
        let (status, json) =
            send(state, "POST", &format!("/sessions/{session_id}/activate")).await;

        // Assert
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"], "not_at_terminal_scene");
    }

    #[tokio::test]
    async fn test_unknown_session_returns_404() {
        // Arrange
        let state = test_app_state();
        let session_id = Uuid::new_v4();

        // Act
        let (status, json) = send(state, "GET", &format!("/sessions/{session_id}")).await;

        // Assert
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "session_not_found");
    }

    #[tokio::test]
    async fn test_delete_session_unmounts_it() {
        // Arrange
        let state = test_app_state();
        let (session_id, _handle) = state.mount_session();

        // Act
        let (status, _) = send(state.clone(), "DELETE", &format!("/sessions/{session_id}")).await;
        let (again, _) = send(state.clone(), "DELETE", &format!("/sessions/{session_id}")).await;

        // Assert
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(again, StatusCode::NOT_FOUND);
        assert!(state.sessions.is_empty());
    }
}
