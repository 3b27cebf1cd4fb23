//! API surface tests: request validation and error rendering.
//!
//! These run against the full router with no encoder involved; every case
//! fails before (or during) asset fetch, so no ffmpeg/ffprobe invocation
//! ever happens.

use axum_test::TestServer;
use scenecast_core::ComposerConfig;
use serde_json::json;

fn test_config() -> ComposerConfig {
    ComposerConfig {
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        fetch_concurrency: 4,
        fetch_timeout_secs: 5,
        fetch_connect_timeout_secs: 1,
        compose_timeout_secs: 10,
        // Capability detection only runs `<binary> -version`, so any
        // always-succeeding binary stands in for the real tools here.
        ffmpeg_path: "/bin/true".to_string(),
        ffprobe_path: "/bin/true".to_string(),
        max_request_body_bytes: 2 * 1024 * 1024,
        storage_backend: None,
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        local_storage_path: None,
        local_storage_base_url: None,
    }
}

async fn test_server() -> TestServer {
    let (_state, router) = scenecast_api::setup::initialize_app(test_config())
        .await
        .expect("app initializes");
    TestServer::new(router).expect("test server")
}

#[tokio::test]
async fn test_health_check() {
    let server = test_server().await;
    let response = server.get("/health").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_empty_scenes_returns_400_detail() {
    let server = test_server().await;
    let response = server.post("/compose").json(&json!({ "scenes": [] })).await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("No scenes"));
}

#[tokio::test]
async fn test_missing_media_url_names_the_scene() {
    let server = test_server().await;
    let response = server
        .post("/compose")
        .json(&json!({
            "scenes": [{ "startTime": 0.0, "endTime": 5.0 }]
        }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("Scene 0 is missing mediaUrl"));
}

#[tokio::test]
async fn test_inverted_timing_is_rejected() {
    let server = test_server().await;
    let response = server
        .post("/compose")
        .json(&json!({
            "scenes": [{
                "mediaUrl": "https://cdn.example.com/a.mp4",
                "mediaType": "video",
                "startTime": 5.0,
                "endTime": 2.0
            }]
        }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("invalid timing"));
}

#[tokio::test]
async fn test_unrecognized_media_type_is_rejected() {
    let server = test_server().await;
    let response = server
        .post("/compose")
        .json(&json!({
            "scenes": [{
                "mediaUrl": "https://cdn.example.com/a.gif",
                "mediaType": "gif",
                "startTime": 0.0,
                "endTime": 2.0
            }]
        }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("unrecognized mediaType"));
}

#[tokio::test]
async fn test_payload_without_project_shape_is_rejected() {
    let server = test_server().await;
    let response = server.post("/compose").json(&json!([1, 2, 3])).await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_unreachable_asset_returns_422_naming_the_url() {
    let server = test_server().await;
    // Port 9 (discard) is closed in any sane test environment; the fetch
    // fails at connect time, long before any encoder would run.
    let url = "http://127.0.0.1:9/missing.mp4";
    let response = server
        .post("/compose")
        .json(&json!({
            "scenes": [{
                "mediaUrl": url,
                "mediaType": "video",
                "startTime": 0.0,
                "endTime": 2.0
            }]
        }))
        .await;

    response.assert_status_unprocessable_entity();
    let body: serde_json::Value = response.json();
    assert!(body["detail"].as_str().expect("detail").contains(url));
}

#[tokio::test]
async fn test_stringified_project_payload_is_accepted_for_validation() {
    let server = test_server().await;
    // Validation errors inside a stringified project surface the same way.
    let encoded = r#"{"scenes": [{"startTime": 0.0, "endTime": 1.0}]}"#;
    let response = server
        .post("/compose")
        .json(&json!({ "project": encoded }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    assert!(body["detail"]
        .as_str()
        .expect("detail")
        .contains("Scene 0 is missing mediaUrl"));
}
