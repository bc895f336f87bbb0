//! Model backend implementations.

mod onnx;
mod stub;

pub use onnx::{OnnxFaceDetector, OnnxFaceMesh};
pub use stub::{StubFaceDetector, StubFaceMesh};
