//! FrameSource - Camera Capture
//!
//! ## Responsibilities
//!
//! - Own the camera device exclusively on a dedicated thread
//! - Publish decoded RGB frames into a capacity-1 latest-value channel
//! - Observe a cooperative stop flag on every loop iteration
//!
//! Consumers treat the channel as a real-time feed: only the newest frame is
//! retained, so a slow consumer never builds a backlog. A dropped sender
//! signals that the capture loop has terminated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::watch;

use crate::error::Result;
use crate::frame::Frame;

mod synthetic;
#[cfg(target_os = "linux")]
mod v4l2;

/// Latest-frame receiver handed to request handlers.
pub type FrameReceiver = watch::Receiver<Option<Frame>>;

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Device path (e.g. "/dev/video0"), or "stub://" for a synthetic feed
    pub device: String,
    /// Preferred frame width
    pub width: u32,
    /// Preferred frame height
    pub height: u32,
    /// Target frame rate
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl CameraConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            device: std::env::var("CAMERA_DEVICE").unwrap_or(defaults.device),
            width: env_u32("CAMERA_WIDTH", defaults.width),
            height: env_u32("CAMERA_HEIGHT", defaults.height),
            fps: env_u32("CAMERA_FPS", defaults.fps),
        }
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Handle to the capture thread.
pub struct CameraHandle {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl CameraHandle {
    /// Request a cooperative stop and wait for the capture thread to exit.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!("camera thread panicked");
            }
        }
        tracing::info!("camera capture stopped");
    }
}

/// Spawn the capture thread and return the frame channel plus a stop handle.
///
/// Device failures terminate the loop (and release the device); the service
/// keeps running and upload-based detection stays available.
pub fn spawn(config: CameraConfig) -> (FrameReceiver, CameraHandle) {
    let (tx, rx) = watch::channel(None);
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();

    let join = std::thread::Builder::new()
        .name("camera".to_string())
        .spawn(move || capture_loop(config, tx, stop_flag))
        .expect("failed to spawn camera thread");

    (
        rx,
        CameraHandle {
            stop,
            join: Some(join),
        },
    )
}

fn capture_loop(config: CameraConfig, tx: watch::Sender<Option<Frame>>, stop: Arc<AtomicBool>) {
    let result = if config.device.starts_with("stub://") {
        synthetic::run(&config, &tx, &stop)
    } else {
        device_loop(&config, &tx, &stop)
    };

    if let Err(e) = result {
        tracing::error!(device = %config.device, error = %e, "camera capture loop terminated");
    }
}

#[cfg(target_os = "linux")]
fn device_loop(
    config: &CameraConfig,
    tx: &watch::Sender<Option<Frame>>,
    stop: &AtomicBool,
) -> Result<()> {
    v4l2::run(config, tx, stop)
}

#[cfg(not(target_os = "linux"))]
fn device_loop(
    config: &CameraConfig,
    _tx: &watch::Sender<Option<Frame>>,
    _stop: &AtomicBool,
) -> Result<()> {
    Err(crate::error::Error::Camera(format!(
        "v4l2 capture is only available on linux (device {})",
        config.device
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device: "stub://test".to_string(),
            width: 64,
            height: 48,
            fps: 60,
        }
    }

    #[tokio::test]
    async fn synthetic_source_publishes_frames() {
        let (mut rx, handle) = spawn(stub_config());
        rx.changed().await.expect("capture loop ended early");
        let frame = rx.borrow_and_update().clone().expect("frame missing");
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        handle.stop();
    }

    #[tokio::test]
    async fn stop_terminates_capture_thread() {
        let (mut rx, handle) = spawn(stub_config());
        rx.changed().await.expect("capture loop ended early");
        handle.stop();
        // Sender is dropped once the loop exits, so further waits fail.
        loop {
            if rx.changed().await.is_err() {
                break;
            }
        }
    }
}
