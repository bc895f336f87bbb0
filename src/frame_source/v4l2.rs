//! V4L2 device backend for the capture loop.
//!
//! Requests packed RGB at the configured resolution; accepts an MJPG
//! negotiation and decodes it through the `image` crate. Other pixel formats
//! are treated as a device error.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;

use super::CameraConfig;
use crate::error::{Error, Result};
use crate::frame::Frame;

pub(super) fn run(
    config: &CameraConfig,
    tx: &watch::Sender<Option<Frame>>,
    stop: &AtomicBool,
) -> Result<()> {
    let mut device = v4l::Device::with_path(&config.device)
        .map_err(|e| Error::Camera(format!("open {}: {}", config.device, e)))?;

    let mut format = device
        .format()
        .map_err(|e| Error::Camera(format!("read format: {}", e)))?;
    format.width = config.width;
    format.height = config.height;
    format.fourcc = v4l::FourCC::new(b"RGB3");

    let format = match device.set_format(&format) {
        Ok(format) => format,
        Err(e) => {
            tracing::warn!(device = %config.device, error = %e, "failed to set format, using device default");
            device
                .format()
                .map_err(|e| Error::Camera(format!("read format after set failure: {}", e)))?
        }
    };

    if config.fps > 0 {
        let params = v4l::video::capture::Parameters::with_fps(config.fps);
        if let Err(e) = device.set_params(&params) {
            tracing::warn!(device = %config.device, error = %e, "failed to set frame rate");
        }
    }

    let fourcc = format.fourcc;
    let (width, height) = (format.width, format.height);

    // Buffer depth 1 keeps the mmap queue from serving stale frames.
    let mut stream = v4l::io::mmap::Stream::with_buffers(&mut device, Type::VideoCapture, 1)
        .map_err(|e| Error::Camera(format!("create buffer stream: {}", e)))?;

    tracing::info!(
        device = %config.device,
        width = width,
        height = height,
        fourcc = %fourcc.str().unwrap_or("????"),
        "camera capture started"
    );

    while !stop.load(Ordering::SeqCst) {
        let (buf, _meta) = stream
            .next()
            .map_err(|e| Error::Camera(format!("capture frame: {}", e)))?;
        let frame = decode_buffer(buf, width, height, &fourcc)?;
        if tx.send(Some(frame)).is_err() {
            break;
        }
    }

    Ok(())
}

fn decode_buffer(buf: &[u8], width: u32, height: u32, fourcc: &v4l::FourCC) -> Result<Frame> {
    match &fourcc.repr {
        b"RGB3" => {
            let expected = (width as usize) * (height as usize) * 3;
            if buf.len() < expected {
                return Err(Error::Camera(format!(
                    "short RGB frame: expected {} bytes, received {}",
                    expected,
                    buf.len()
                )));
            }
            Frame::new(width, height, buf[..expected].to_vec())
        }
        b"MJPG" => Frame::decode(buf),
        other => Err(Error::Camera(format!(
            "unsupported pixel format {}",
            String::from_utf8_lossy(other)
        ))),
    }
}
