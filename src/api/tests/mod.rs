use super::*;
use crate::downloader::test_helpers::{RecordingNotifier, ScriptedFetcher};
use crate::fetcher::Fetcher;
use crate::notifier::Notifier;
use crate::types::{ItemId, StoredItem};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;


/// Helper to create an AppState around a test downloader
fn create_test_state(
    fetcher: Arc<dyn Fetcher>,
    notifier: Option<Arc<dyn Notifier>>,
) -> (AppState, tempfile::TempDir) {
    let (downloader, temp_dir) =
        crate::downloader::test_helpers::create_test_downloader(fetcher, notifier);
    let config = downloader.config().clone();
    (AppState::new(Arc::new(downloader), config), temp_dir)
}

fn default_state() -> (AppState, tempfile::TempDir) {
    create_test_state(Arc::new(ScriptedFetcher::test_video()), None)
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Put a file and its record in place, as a completed download would
fn store_item(state: &AppState, id: &str, stored_name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = state.config.video_dir().join(stored_name);
    if !stored_name.contains("..") {
        std::fs::write(&path, contents).unwrap();
    }
    state
        .store()
        .save(
            ItemId::from(id),
            StoredItem {
                source_url: "u1".into(),
                filename: "Test_Video".into(),
                requester: "r1".into(),
                media_type: "video/mp4".into(),
                stored_name: stored_name.to_string(),
                created_at: chrono::Utc::now(),
            },
        )
        .unwrap();
    path
}

#[tokio::test]
async fn test_api_server_stops_on_shutdown_token() {
    let (state, _temp_dir) = default_state();

    let mut config = (*state.config).clone();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let state = AppState::new(state.downloader.clone(), Arc::new(config));
    let shutdown = state.shutdown.clone();

    let api_handle = tokio::spawn(start_api_server(state));

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("server should stop after cancellation")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (state, _temp_dir) = default_state();
    let app = create_router(state);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS headers should be present"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (state, _temp_dir) = default_state();
    let mut config = (*state.config).clone();
    config.server.cors_enabled = false;
    let state = AppState::new(state.downloader.clone(), Arc::new(config));
    let app = create_router(state);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[test]
fn test_cors_specific_origins() {
    // Invalid origins are skipped rather than failing the whole layer
    let _layer = build_cors_layer(&["http://a.example".to_string(), "\n".to_string()]);
}

#[tokio::test]
async fn test_download_then_retrieve_end_to_end() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (state, _temp_dir) = create_test_state(
        Arc::new(ScriptedFetcher::test_video()),
        Some(notifier.clone()),
    );
    let app = create_router(state.clone());

    let response = get(app.clone(), "/video/download?url=u1&requester=r1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "download started");

    // Completion is only observable through the notifier side channel
    let id = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(sent) = notifier.sent().first() {
                return sent.message.clone();
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(notifier.sent()[0].recipient, "r1");

    let response = get(app.clone(), &format!("/video/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"video_content");

    // Served exactly once
    assert!(state.store().is_empty());
    let response = get(app, &format!("/video/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
