//! Fetcher integration tests against an in-process HTTP server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use scenecast_composer::{AssetFetcher, Deadline, Workspace};
use scenecast_core::models::{MediaKind, Project, Scene};
use scenecast_core::ComposeError;

const JPEG_BYTES: &[u8] = b"\xff\xd8\xff\xe0\x00\x10JFIF\x00\x01 fake jpeg payload";

fn mp4_bytes() -> Vec<u8> {
    let mut bytes = vec![0x00, 0x00, 0x00, 0x20];
    bytes.extend_from_slice(b"ftypisom");
    bytes.extend_from_slice(&[0u8; 64]);
    bytes
}

async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    addr
}

fn fetcher() -> AssetFetcher {
    AssetFetcher::new(4, Duration::from_secs(2), Duration::from_secs(10)).expect("fetcher")
}

fn scene(url: &str) -> Scene {
    Scene {
        media_url: url.to_string(),
        media_type: None,
        start_time: 0.0,
        end_time: 2.0,
        trim_start: None,
        trim_end: None,
    }
}

#[tokio::test]
async fn test_fetches_and_classifies_assets() {
    let router = Router::new()
        .route(
            "/image.jpg",
            get(|| async { ([(header::CONTENT_TYPE, "image/jpeg")], JPEG_BYTES) }),
        )
        .route(
            // Octet-stream forces classification down to the byte signature.
            "/video.bin",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/octet-stream")],
                    mp4_bytes(),
                )
            }),
        );
    let addr = spawn_server(router).await;

    let urls = vec![
        format!("http://{addr}/image.jpg"),
        format!("http://{addr}/video.bin"),
    ];
    let workspace = Workspace::create().expect("workspace");
    let deadline = Deadline::after_secs(30);

    let assets = fetcher()
        .fetch_all(&urls, &workspace, &deadline)
        .await
        .expect("assets");

    assert_eq!(assets.len(), 2);

    let image = &assets[&urls[0]];
    assert_eq!(image.sniffed_kind, Some(MediaKind::Image));
    assert_eq!(image.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(std::fs::read(&image.path).expect("image bytes"), JPEG_BYTES);

    let video = &assets[&urls[1]];
    assert_eq!(video.sniffed_kind, Some(MediaKind::Video));
    assert!(video.path.starts_with(workspace.path()));
}

#[tokio::test]
async fn test_single_failure_fails_the_batch_and_names_the_url() {
    let router = Router::new()
        .route("/ok1.jpg", get(|| async { JPEG_BYTES }))
        .route("/missing.mp4", get(|| async { StatusCode::NOT_FOUND }))
        .route("/ok2.jpg", get(|| async { JPEG_BYTES }));
    let addr = spawn_server(router).await;

    let missing = format!("http://{addr}/missing.mp4");
    let urls = vec![
        format!("http://{addr}/ok1.jpg"),
        missing.clone(),
        format!("http://{addr}/ok2.jpg"),
    ];
    let workspace = Workspace::create().expect("workspace");
    let deadline = Deadline::after_secs(30);

    let err = fetcher()
        .fetch_all(&urls, &workspace, &deadline)
        .await
        .unwrap_err();

    match err {
        ComposeError::Fetch { url, cause } => {
            assert_eq!(url, missing);
            assert!(cause.contains("404"));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // No task is still writing: the workspace removes cleanly.
    workspace.close().expect("close after failure");
}

#[tokio::test]
async fn test_duplicate_scene_urls_are_fetched_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let router = Router::new()
        .route(
            "/shared.jpg",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                JPEG_BYTES
            }),
        )
        .with_state(hits.clone());
    let addr = spawn_server(router).await;

    let shared = format!("http://{addr}/shared.jpg");
    let project = Project {
        scenes: vec![scene(&shared), scene(&shared), scene(&shared)],
        audio_url: None,
        settings: Default::default(),
    };

    let urls = AssetFetcher::distinct_urls(&project);
    assert_eq!(urls.len(), 1);

    let workspace = Workspace::create().expect("workspace");
    let deadline = Deadline::after_secs(30);
    let assets = fetcher()
        .fetch_all(&urls, &workspace, &deadline)
        .await
        .expect("assets");

    assert_eq!(assets.len(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_results_keyed_by_url_regardless_of_completion_order() {
    let router = Router::new()
        .route(
            "/slow.jpg",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                JPEG_BYTES.into_response()
            }),
        )
        .route("/fast.bin", get(|| async { mp4_bytes().into_response() }));
    let addr = spawn_server(router).await;

    let slow = format!("http://{addr}/slow.jpg");
    let fast = format!("http://{addr}/fast.bin");
    let workspace = Workspace::create().expect("workspace");
    let deadline = Deadline::after_secs(30);

    let assets = fetcher()
        .fetch_all(&[slow.clone(), fast.clone()], &workspace, &deadline)
        .await
        .expect("assets");

    // The slow asset finished last but still lands under its own URL.
    assert_eq!(assets[&slow].sniffed_kind, Some(MediaKind::Image));
    assert_eq!(assets[&fast].sniffed_kind, Some(MediaKind::Video));
}

#[tokio::test]
async fn test_deadline_cuts_off_stalled_downloads() {
    let router = Router::new().route(
        "/stalled.mp4",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            JPEG_BYTES.into_response()
        }),
    );
    let addr = spawn_server(router).await;

    let workspace = Workspace::create().expect("workspace");
    let deadline = Deadline::after_secs(1);

    let err = fetcher()
        .fetch_all(
            &[format!("http://{addr}/stalled.mp4")],
            &workspace,
            &deadline,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ComposeError::Timeout { seconds: 1 }));
    workspace.close().expect("close after timeout");
}

#[tokio::test]
async fn test_rejects_non_http_schemes() {
    let workspace = Workspace::create().expect("workspace");
    let deadline = Deadline::after_secs(30);

    let err = fetcher()
        .fetch_all(
            &["file:///etc/passwd".to_string()],
            &workspace,
            &deadline,
        )
        .await
        .unwrap_err();

    match err {
        ComposeError::Fetch { cause, .. } => assert!(cause.contains("HTTP")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_body_is_rejected() {
    let router = Router::new().route("/empty.jpg", get(|| async { &[] as &[u8] }));
    let addr = spawn_server(router).await;

    let workspace = Workspace::create().expect("workspace");
    let deadline = Deadline::after_secs(30);

    let err = fetcher()
        .fetch_all(
            &[format!("http://{addr}/empty.jpg")],
            &workspace,
            &deadline,
        )
        .await
        .unwrap_err();

    match err {
        ComposeError::Fetch { cause, .. } => assert!(cause.contains("empty")),
        other => panic!("unexpected error: {other:?}"),
    }
}
