//! API Routes

use std::time::Duration;

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Multipart, State,
    },
    http::header,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// How long streaming loops wait for a fresh frame before checking again.
const FRAME_WAIT: Duration = Duration::from_secs(1);

const MJPEG_BOUNDARY: &str = "frame";

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(super::health_check))
        .route("/detect", post(detect))
        .route("/video_feed", get(video_feed))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

// ========================================
// One-shot detection
// ========================================

async fn detect(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut upload: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("invalid multipart body: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| Error::Validation(format!("failed to read upload: {}", e)))?;
            upload = Some(bytes.to_vec());
            break;
        }
    }

    let bytes = upload.ok_or_else(|| Error::Validation("missing 'file' field".to_string()))?;
    let frame = Frame::decode(&bytes)?;
    let evaluation = state.engine.evaluate(frame).await?;
    Ok(Json(evaluation.report))
}

// ========================================
// Streaming feed (MJPEG)
// ========================================

async fn video_feed(State(state): State<AppState>) -> impl IntoResponse {
    let frames = state.frames.clone();
    let engine = state.engine.clone();

    let stream = futures::stream::unfold((frames, engine), |(mut frames, engine)| async move {
        loop {
            match tokio::time::timeout(FRAME_WAIT, frames.changed()).await {
                // No fresh frame yet; keep waiting.
                Err(_) => continue,
                // Camera loop has terminated; end the stream.
                Ok(Err(_)) => return None,
                Ok(Ok(())) => {}
            }
            let Some(frame) = frames.borrow_and_update().clone() else {
                continue;
            };

            match engine.evaluate(frame).await {
                Ok(evaluation) => {
                    let mut part = Vec::with_capacity(evaluation.annotated_jpeg.len() + 64);
                    part.extend_from_slice(
                        format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", MJPEG_BOUNDARY)
                            .as_bytes(),
                    );
                    part.extend_from_slice(&evaluation.annotated_jpeg);
                    part.extend_from_slice(b"\r\n");
                    return Some((Ok::<_, std::convert::Infallible>(part), (frames, engine)));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "video feed stopped");
                    return None;
                }
            }
        }
    });

    (
        [(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={}", MJPEG_BOUNDARY),
        )],
        Body::from_stream(stream),
    )
}

// ========================================
// WebSocket feed
// ========================================

async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    tracing::info!(connection_id = %connection_id, "WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut frames = state.frames.clone();
    let engine = state.engine.clone();

    // Watch for client close/errors while the send loop runs.
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    let send_loop = async {
        loop {
            match tokio::time::timeout(FRAME_WAIT, frames.changed()).await {
                // Queue-empty is not an exit condition.
                Err(_) => continue,
                Ok(Err(_)) => break,
                Ok(Ok(())) => {}
            }
            let Some(frame) = frames.borrow_and_update().clone() else {
                continue;
            };

            let report = match engine.evaluate(frame).await {
                Ok(evaluation) => evaluation.report,
                Err(e) => {
                    tracing::warn!(connection_id = %connection_id, error = %e, "websocket feed stopped");
                    break;
                }
            };
            let json = match serde_json::to_string(&report) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(connection_id = %connection_id, error = %e, "failed to serialize report");
                    break;
                }
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        _ = recv_task => {}
        _ = send_loop => {}
    }

    tracing::info!(connection_id = %connection_id, "WebSocket client disconnected");
}
