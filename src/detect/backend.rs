//! Model backend traits for the two external face models.
//!
//! Both models are opaque collaborators: the adapter never inspects how a
//! backend arrives at its output, only the normalized detections and landmark
//! sets it reports. Backends receive whole RGB frames and handle their own
//! input preprocessing (resizing, tensor layout).

use crate::error::Result;
use crate::frame::Frame;

/// One face reported by the primary detector, in coordinates relative to the
/// frame (all fields nominally in [0, 1]; values may exceed the range for
/// faces at the frame edge and are clamped downstream).
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub x_min: f32,
    pub y_min: f32,
    pub width: f32,
    pub height: f32,
    /// Model score in [0, 1]
    pub score: f32,
}

/// One landmark set reported by the mesh model, coordinates relative to the
/// frame. Landmarks outside [0, 1] belong to face regions the model placed
/// beyond the frame edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    pub points: Vec<(f32, f32)>,
}

/// Primary face detector.
pub trait FaceDetectorModel: Send {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;
}

/// Face mesh (landmark) model.
pub trait FaceMeshModel: Send {
    /// Backend identifier for logs.
    fn name(&self) -> &'static str;

    /// Extract landmark sets, one per face the model observed.
    fn mesh(&mut self, frame: &Frame) -> Result<Vec<LandmarkSet>>;
}
