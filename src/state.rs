//! Application state
//!
//! Holds all shared components and state

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::frame_source::FrameReceiver;
use crate::proctor::ProctorEngine;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server port
    pub port: u16,
    /// Server host
    pub host: String,
    /// Directory for rising-edge screenshots
    pub screenshot_dir: PathBuf,
    /// Directory for the suspicious-event log
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            screenshot_dir: std::env::var("SCREENSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("screenshots")),
            log_dir: std::env::var("EVENT_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("logs")),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// ProctorEngine (detection + suspicion + evidence)
    pub engine: Arc<ProctorEngine>,
    /// Latest-frame channel fed by the camera thread
    pub frames: FrameReceiver,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    /// The camera feed is alive while its channel sender exists.
    pub fn camera_online(&self) -> bool {
        self.frames.has_changed().is_ok()
    }
}
