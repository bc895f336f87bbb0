//! proctorcam Library
//!
//! Webcam proctoring service
//!
//! ## Architecture (7 Components)
//!
//! 1. FrameSource - camera capture on a dedicated thread
//! 2. DetectionAdapter - face detector + face mesh model fusion
//! 3. SuspicionTracker - edge-triggered proctoring state
//! 4. EvidenceStore - screenshots + append-only event log
//! 5. ProctorEngine - per-frame evaluation pipeline
//! 6. WebAPI - HTTP/WebSocket endpoints
//! 7. ScreenCount - attached-monitor reporting (separate binary)
//!
//! ## Design Principles
//!
//! - Single responsibility per module
//! - Transitions over levels: evidence is written on state changes only
//! - The camera thread is the sole frame producer; handlers only consume

pub mod detect;
pub mod error;
pub mod evidence;
pub mod frame;
pub mod frame_source;
pub mod models;
pub mod proctor;
pub mod screen_count;
pub mod state;
pub mod suspicion;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
