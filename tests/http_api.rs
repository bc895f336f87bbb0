//! End-to-end tests against the HTTP surface of both services.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;

use proctorcam::detect::backend::RawDetection;
use proctorcam::detect::backends::{StubFaceDetector, StubFaceMesh};
use proctorcam::detect::DetectionAdapter;
use proctorcam::evidence::EvidenceStore;
use proctorcam::frame::Frame;
use proctorcam::proctor::ProctorEngine;
use proctorcam::screen_count;
use proctorcam::state::{AppConfig, AppState};
use proctorcam::web_api;

const MULTIPART_BOUNDARY: &str = "testboundary";

fn detection(x_min: f32, score: f32) -> RawDetection {
    RawDetection {
        x_min,
        y_min: 0.2,
        width: 0.2,
        height: 0.2,
        score,
    }
}

/// Build an app around scripted detections, with evidence in a tempdir.
///
/// The returned sender stands in for the camera thread; holding it keeps the
/// frame channel open so /healthz sees the feed as online.
fn proctor_state(
    detections: Vec<RawDetection>,
    dir: &tempfile::TempDir,
) -> (AppState, watch::Sender<Option<Frame>>) {
    let adapter = DetectionAdapter::new(
        Box::new(StubFaceDetector::new(detections)),
        Box::new(StubFaceMesh::empty()),
    );
    let evidence = EvidenceStore::new(dir.path().join("screenshots"), dir.path().join("logs"));
    let engine = Arc::new(ProctorEngine::new(adapter, evidence));

    let (frames_tx, frames) = watch::channel(None);

    let state = AppState {
        config: AppConfig::default(),
        engine,
        frames,
        started_at: Instant::now(),
    };
    (state, frames_tx)
}

async fn serve(app: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn roundtrip(addr: SocketAddr, request: Vec<u8>) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream.write_all(&request).await.expect("write request");
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.expect("read response");
    String::from_utf8_lossy(&response).into_owned()
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    roundtrip(addr, request.into_bytes()).await
}

async fn post_image(addr: SocketAddr, jpeg: &[u8]) -> String {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"frame.jpg\"\r\n",
    );
    body.extend_from_slice(b"Content-Type: image/jpeg\r\n\r\n");
    body.extend_from_slice(jpeg);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

    let mut request = format!(
        "POST /detect HTTP/1.1\r\nHost: {}\r\nContent-Type: multipart/form-data; boundary={}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        addr,
        MULTIPART_BOUNDARY,
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(&body);
    roundtrip(addr, request).await
}

fn test_jpeg() -> Vec<u8> {
    Frame::new(64, 48, vec![90u8; 64 * 48 * 3])
        .unwrap()
        .encode_jpeg()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn healthz_reports_ok() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _frames_tx) = proctor_state(vec![], &dir);
    let addr = serve(web_api::create_router(state)).await;

    let response = http_get(addr, "/healthz").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("\"status\":\"ok\""));
    assert!(response.contains("\"camera_online\":true"));
}

#[tokio::test(flavor = "multi_thread")]
async fn index_serves_monitor_page() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _frames_tx) = proctor_state(vec![], &dir);
    let addr = serve(web_api::create_router(state)).await;

    let response = http_get(addr, "/").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("<!DOCTYPE html>"));
}

#[tokio::test(flavor = "multi_thread")]
async fn detect_single_confident_face() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _frames_tx) = proctor_state(vec![detection(0.2, 0.9)], &dir);
    let addr = serve(web_api::create_router(state)).await;

    let response = post_image(addr, &test_jpeg()).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("\"face_count\":1"));
    assert!(response.contains("\"suspicious\":false"));
    assert!(response.contains("annotated_image_base64"));
}

#[tokio::test(flavor = "multi_thread")]
async fn detect_two_faces_flags_and_logs_once() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _frames_tx) = proctor_state(vec![detection(0.1, 0.9), detection(0.6, 0.8)], &dir);
    let addr = serve(web_api::create_router(state)).await;

    let response = post_image(addr, &test_jpeg()).await;
    assert!(response.contains("\"face_count\":2"));
    assert!(response.contains("\"suspicious\":true"));

    // Second suspicious request is not a new transition.
    post_image(addr, &test_jpeg()).await;

    let log = std::fs::read_to_string(dir.path().join("logs/suspicious_events.log")).unwrap();
    assert_eq!(log.lines().count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn detect_rejects_undecodable_upload() {
    let dir = tempfile::tempdir().unwrap();
    let (state, _frames_tx) = proctor_state(vec![], &dir);
    let addr = serve(web_api::create_router(state)).await;

    let response = post_image(addr, b"definitely not a jpeg").await;
    assert!(response.starts_with("HTTP/1.1 400"), "{}", response);
    assert!(response.contains("DECODE_ERROR"));
}

#[tokio::test(flavor = "multi_thread")]
async fn screen_count_honors_override() {
    let addr = serve(screen_count::router()).await;

    std::env::set_var(screen_count::SCREEN_COUNT_ENV, "3");
    let response = http_get(addr, "/screen-count").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("\"screen_count\":3"));
    assert!(response.contains("\"warning\":\"Please disconnect"));

    std::env::set_var(screen_count::SCREEN_COUNT_ENV, "1");
    let response = http_get(addr, "/screen-count").await;
    assert!(response.contains("\"screen_count\":1"));
    assert!(response.contains("\"warning\":null"));

    std::env::set_var(screen_count::SCREEN_COUNT_ENV, "abc");
    let response = http_get(addr, "/screen-count").await;
    assert!(response.contains("\"screen_count\":1"));
    assert!(response.contains("\"warning\":null"));

    std::env::remove_var(screen_count::SCREEN_COUNT_ENV);
}
