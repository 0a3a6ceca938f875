//! Integration tests for the story intro routes.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use cigar_core::store::CompletionStore;
use cigar_store::file_completion_store::FileCompletionStore;
use cigar_test_support::{InMemoryCompletionStore, epoch};
use uuid::Uuid;

const BASE: &str = "/api/v1/intro";

async fn mount(app: axum::Router) -> Uuid {
    let (status, json) = common::post(app, &format!("{BASE}/sessions")).await;
    assert_eq!(status, StatusCode::CREATED);
    Uuid::parse_str(json["session_id"].as_str().unwrap()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_intro_full_flow_persists_completion_once() {
    let store = Arc::new(InMemoryCompletionStore::new());
    let (app, state) = common::build_test_app(store.clone());
    let session_id = mount(app.clone()).await;
    let session = format!("{BASE}/sessions/{session_id}");

    // Activation is refused away from the terminal scene.
    let (status, json) = common::post(app.clone(), &format!("{session}/activate")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "not_at_terminal_scene");

    // Step through to the terminal scene.
    for expected in 1..=5 {
        let (status, json) = common::post(app.clone(), &format!("{session}/next")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["current_index"], expected);
        assert_eq!(json["auto_advance_enabled"], false);
    }

    // Forward is clamped at the terminal scene.
    let (_, json) = common::post(app.clone(), &format!("{session}/next")).await;
    assert_eq!(json["current_index"], 5);
    assert!(json["location"].is_null());

    // Activate twice; exiting is visible immediately.
    let (status, json) = common::post(app.clone(), &format!("{session}/activate")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["exiting"], true);
    assert_eq!(json["completed"], false);
    let (status, _) = common::post(app.clone(), &format!("{session}/activate")).await;
    assert_eq!(status, StatusCode::OK);

    // Nothing is persisted before the exit delay elapses.
    tokio::time::sleep(Duration::from_millis(900)).await;
    assert!(store.writes().is_empty());

    let handle = state.sessions.get(session_id).unwrap();
    handle.finished().await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(store.writes().len(), 1);
    let (status, json) = common::get_json(app.clone(), &format!("{BASE}/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intro_completed"], true);
    assert_eq!(json["completed_at"], serde_json::to_value(epoch()).unwrap());

    // The completed session is unmounted.
    let (status, json) = common::get_json(app.clone(), &session).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "session_not_found");

    // Reset clears the flag.
    let (status, json) = common::post(app, &format!("{BASE}/reset")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intro_completed"], false);
}

#[tokio::test(start_paused = true)]
async fn test_intro_auto_advances_after_text_renders() {
    let (app, _) = common::build_test_app(Arc::new(InMemoryCompletionStore::new()));
    let session_id = mount(app.clone()).await;

    tokio::time::sleep(Duration::from_millis(900)).await;

    let (status, json) =
        common::get_json(app, &format!("{BASE}/sessions/{session_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["current_index"], 1);
    assert_eq!(json["auto_advance_enabled"], true);
    assert_eq!(json["progress"][1]["active"], true);
}

#[tokio::test(start_paused = true)]
async fn test_intro_previous_disables_auto_advance() {
    let (app, _) = common::build_test_app(Arc::new(InMemoryCompletionStore::new()));
    let session_id = mount(app.clone()).await;
    let session = format!("{BASE}/sessions/{session_id}");

    common::post(app.clone(), &format!("{session}/next")).await;
    common::post(app.clone(), &format!("{session}/next")).await;
    let (status, json) = common::post(app.clone(), &format!("{session}/previous")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["current_index"], 1);

    // No auto-advance ever fires once the visitor navigated.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let (_, json) = common::get_json(app, &session).await;
    assert_eq!(json["current_index"], 1);
    assert_eq!(json["text_render_complete"], true);
}

#[tokio::test]
async fn test_intro_delete_session_round_trip() {
    let (app, state) = common::build_test_app(Arc::new(InMemoryCompletionStore::new()));
    let session_id = mount(app.clone()).await;
    let session = format!("{BASE}/sessions/{session_id}");

    assert_eq!(common::delete(app.clone(), &session).await, StatusCode::NO_CONTENT);
    assert!(state.sessions.is_empty());

    let (status, json) = common::post(app, &format!("{session}/next")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "session_not_found");
}

#[tokio::test(start_paused = true)]
async fn test_intro_completion_survives_restart_with_file_store() {
    let dir = std::env::temp_dir().join(format!("cigar-api-{}", Uuid::new_v4()));
    let path = dir.join("intro-state.json");
    let (app, state) = common::build_test_app(Arc::new(FileCompletionStore::new(&path)));
    let session_id = mount(app.clone()).await;
    let session = format!("{BASE}/sessions/{session_id}");

    for _ in 0..5 {
        common::post(app.clone(), &format!("{session}/next")).await;
    }
    common::post(app, &format!("{session}/activate")).await;
    let handle = state.sessions.get(session_id).unwrap();
    handle.finished().await;

    // A fresh app over the same file sees the completion.
    let store = FileCompletionStore::new(&path);
    let mut record = store.load().await.unwrap();
    for _ in 0..100 {
        if record.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        record = store.load().await.unwrap();
    }
    let (restarted, _) = common::build_test_app(Arc::new(store));
    let (status, json) = common::get_json(restarted, &format!("{BASE}/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["intro_completed"], true);

    let _ = std::fs::remove_dir_all(dir);
}

#[tokio::test(start_paused = true)]
async fn test_intro_abandoned_sessions_are_unmounted_after_idle_time() {
    let (app, state) = common::build_test_app_with_idle_ttl(
        Arc::new(InMemoryCompletionStore::new()),
        Duration::from_secs(60),
    );
    let abandoned = mount(app.clone()).await;
    let watched = mount(app.clone()).await;

    // Polling keeps a session alive; silence does not.
    for _ in 0..6 {
        tokio::time::sleep(Duration::from_secs(30)).await;
        let (status, _) =
            common::get_json(app.clone(), &format!("{BASE}/sessions/{watched}")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) =
        common::get_json(app.clone(), &format!("{BASE}/sessions/{abandoned}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "session_not_found");
    assert_eq!(state.sessions.len(), 1);

    let (_, json) = common::get_json(app, "/health").await;
    assert_eq!(json["active_sessions"], 1);
}
