//! Synthetic backend for `stub://` device paths.
//!
//! Generates a moving gradient pattern at the configured rate so the full
//! pipeline can run on machines without a camera (tests, CI, demos).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use super::CameraConfig;
use crate::error::Result;
use crate::frame::Frame;

pub(super) fn run(
    config: &CameraConfig,
    tx: &watch::Sender<Option<Frame>>,
    stop: &AtomicBool,
) -> Result<()> {
    let interval = Duration::from_millis(1000 / u64::from(config.fps.max(1)));
    let mut frame_count: u64 = 0;

    tracing::info!(
        device = %config.device,
        width = config.width,
        height = config.height,
        fps = config.fps,
        "synthetic capture started"
    );

    while !stop.load(Ordering::SeqCst) {
        let frame = generate(config.width, config.height, frame_count)?;
        frame_count += 1;
        if tx.send(Some(frame)).is_err() {
            break;
        }
        std::thread::sleep(interval);
    }

    Ok(())
}

fn generate(width: u32, height: u32, frame_count: u64) -> Result<Frame> {
    let pixel_count = (width as usize) * (height as usize) * 3;
    let mut data = vec![0u8; pixel_count];
    for (i, value) in data.iter_mut().enumerate() {
        *value = ((i as u64 + frame_count * 7) % 256) as u8;
    }
    Frame::new(width, height, data)
}
