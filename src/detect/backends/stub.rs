//! Scripted model stubs for tests.
//!
//! Each stub replays a fixed script regardless of input, which makes the
//! merge and suspicion behavior deterministic under test.

use crate::detect::backend::{FaceDetectorModel, FaceMeshModel, LandmarkSet, RawDetection};
use crate::error::Result;
use crate::frame::Frame;

/// Detector stub returning a fixed set of detections.
pub struct StubFaceDetector {
    detections: Vec<RawDetection>,
}

impl StubFaceDetector {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self { detections }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl FaceDetectorModel for StubFaceDetector {
    fn name(&self) -> &'static str {
        "stub-detector"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<RawDetection>> {
        Ok(self.detections.clone())
    }
}

/// Mesh stub returning fixed landmark sets.
pub struct StubFaceMesh {
    sets: Vec<LandmarkSet>,
}

impl StubFaceMesh {
    pub fn new(sets: Vec<LandmarkSet>) -> Self {
        Self { sets }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl FaceMeshModel for StubFaceMesh {
    fn name(&self) -> &'static str {
        "stub-mesh"
    }

    fn mesh(&mut self, _frame: &Frame) -> Result<Vec<LandmarkSet>> {
        Ok(self.sets.clone())
    }
}
