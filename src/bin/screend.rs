//! screend - Attached-Screen Count Reporter
//!
//! Independent service exposing a single screen-count endpoint for
//! pre-interview environment checks.

use proctorcam::screen_count;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LISTEN_ADDR: &str = "0.0.0.0:8001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting screend v{}", env!("CARGO_PKG_VERSION"));

    let app = screen_count::router()
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(LISTEN_ADDR).await?;
    tracing::info!("Listening on {}", LISTEN_ADDR);

    axum::serve(listener, app).await?;

    Ok(())
}
