//! proctorcam - Webcam Proctoring Service
//!
//! Main entry point for the proctoring application.

use clap::Parser;
use proctorcam::detect::DetectionAdapter;
use proctorcam::evidence::EvidenceStore;
use proctorcam::frame_source::{self, CameraConfig};
use proctorcam::proctor::ProctorEngine;
use proctorcam::state::{AppConfig, AppState};
use proctorcam::web_api;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "proctorcam", about = "Webcam proctoring service")]
struct Args {
    /// Port to run the server on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Host to run the server on
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proctorcam=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("Starting proctorcam v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig {
        port: args.port,
        host: args.host,
        ..AppConfig::default()
    };
    tracing::info!(
        host = %config.host,
        port = config.port,
        screenshot_dir = %config.screenshot_dir.display(),
        log_dir = %config.log_dir.display(),
        "Configuration loaded"
    );

    // Initialize components
    let adapter = DetectionAdapter::from_env()?;
    let evidence = EvidenceStore::new(config.screenshot_dir.clone(), config.log_dir.clone());
    let engine = Arc::new(ProctorEngine::new(adapter, evidence));
    tracing::info!("ProctorEngine initialized");

    let camera_config = CameraConfig::from_env();
    tracing::info!(
        device = %camera_config.device,
        width = camera_config.width,
        height = camera_config.height,
        fps = camera_config.fps,
        "Starting camera capture"
    );
    let (frames, camera) = frame_source::spawn(camera_config);

    // Create application state
    let state = AppState {
        config: config.clone(),
        engine,
        frames,
        started_at: std::time::Instant::now(),
    };

    let app = web_api::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the camera thread after the server drains
    camera.stop();
    tracing::info!("proctorcam stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
