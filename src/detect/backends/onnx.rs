//! Tract-based ONNX backends for the face models.
//!
//! Both backends load a local model file and run inference on resized RGB
//! input. Expected graph contracts:
//!
//! - Detector: input `[1, 3, H, W]` f32 in [0, 1]; output 0 is boxes
//!   `[1, N, 4]` as relative `[x_min, y_min, width, height]`, output 1 is
//!   scores `[1, N]`.
//! - Mesh: input `[1, 3, H, W]` f32 in [0, 1]; output 0 is landmarks, either
//!   `[F, L, 3]` or `[F, L*3]`, coordinates in input-pixel units; optional
//!   output 1 is a per-face presence score `[F]`.

use std::path::Path;

use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::{FaceDetectorModel, FaceMeshModel, LandmarkSet, RawDetection};
use crate::error::{Error, Result};
use crate::frame::Frame;

/// Minimum detector score to report a face.
const MIN_DETECTION_SCORE: f32 = 0.2;
/// Minimum mesh presence score to report a landmark set.
const MIN_MESH_PRESENCE: f32 = 0.2;

const DETECTOR_INPUT_WIDTH: u32 = 128;
const DETECTOR_INPUT_HEIGHT: u32 = 128;
const MESH_INPUT_WIDTH: u32 = 192;
const MESH_INPUT_HEIGHT: u32 = 192;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, TypedModel>;

fn load_model<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<RunnableModel> {
    let model_path = model_path.as_ref();
    tract_onnx::onnx()
        .model_for_path(model_path)
        .and_then(|m| {
            m.with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, height as usize, width as usize),
                ),
            )
        })
        .and_then(|m| m.into_optimized())
        .and_then(|m| m.into_runnable())
        .map_err(|e| {
            Error::Inference(format!(
                "failed to load ONNX model from {}: {}",
                model_path.display(),
                e
            ))
        })
}

fn build_input(frame: &Frame, width: u32, height: u32) -> Tensor {
    let resized = imageops::resize(&frame.to_rgb_image(), width, height, FilterType::Triangle);
    let width = width as usize;
    let input = tract_ndarray::Array4::from_shape_fn(
        (1, 3, height as usize, width),
        |(_, channel, y, x)| f32::from(resized.as_raw()[(y * width + x) * 3 + channel]) / 255.0,
    );
    input.into_tensor()
}

fn tensor_values(tensor: Option<&TValue>, label: &str) -> Result<Vec<f32>> {
    let tensor =
        tensor.ok_or_else(|| Error::Inference(format!("missing model output: {}", label)))?;
    let view = tensor
        .to_array_view::<f32>()
        .map_err(|e| Error::Inference(format!("{} tensor was not f32: {}", label, e)))?;
    Ok(view.iter().cloned().collect())
}

/// Primary face detector backed by a local ONNX graph.
pub struct OnnxFaceDetector {
    model: RunnableModel,
    input_width: u32,
    input_height: u32,
    min_score: f32,
}

impl OnnxFaceDetector {
    /// Load the detector model from disk and prepare it for inference.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model = load_model(model_path, DETECTOR_INPUT_WIDTH, DETECTOR_INPUT_HEIGHT)?;
        Ok(Self {
            model,
            input_width: DETECTOR_INPUT_WIDTH,
            input_height: DETECTOR_INPUT_HEIGHT,
            min_score: MIN_DETECTION_SCORE,
        })
    }
}

impl FaceDetectorModel for OnnxFaceDetector {
    fn name(&self) -> &'static str {
        "onnx-detector"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        let input = build_input(frame, self.input_width, self.input_height);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| Error::Inference(format!("face detector inference failed: {}", e)))?;

        let boxes = tensor_values(outputs.first(), "detector boxes")?;
        let scores = tensor_values(outputs.get(1), "detector scores")?;

        if boxes.len() != scores.len() * 4 {
            return Err(Error::Inference(format!(
                "detector output mismatch: {} box values for {} scores",
                boxes.len(),
                scores.len()
            )));
        }

        let mut detections = Vec::new();
        for (i, &score) in scores.iter().enumerate() {
            if score < self.min_score {
                continue;
            }
            detections.push(RawDetection {
                x_min: boxes[i * 4],
                y_min: boxes[i * 4 + 1],
                width: boxes[i * 4 + 2],
                height: boxes[i * 4 + 3],
                score: score.clamp(0.0, 1.0),
            });
        }
        Ok(detections)
    }
}

/// Face mesh model backed by a local ONNX graph.
pub struct OnnxFaceMesh {
    model: RunnableModel,
    input_width: u32,
    input_height: u32,
    min_presence: f32,
}

impl OnnxFaceMesh {
    /// Load the mesh model from disk and prepare it for inference.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model = load_model(model_path, MESH_INPUT_WIDTH, MESH_INPUT_HEIGHT)?;
        Ok(Self {
            model,
            input_width: MESH_INPUT_WIDTH,
            input_height: MESH_INPUT_HEIGHT,
            min_presence: MIN_MESH_PRESENCE,
        })
    }
}

impl FaceMeshModel for OnnxFaceMesh {
    fn name(&self) -> &'static str {
        "onnx-mesh"
    }

    fn mesh(&mut self, frame: &Frame) -> Result<Vec<LandmarkSet>> {
        let input = build_input(frame, self.input_width, self.input_height);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .map_err(|e| Error::Inference(format!("face mesh inference failed: {}", e)))?;

        let output = outputs
            .first()
            .ok_or_else(|| Error::Inference("mesh model produced no outputs".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| Error::Inference(format!("mesh output tensor was not f32: {}", e)))?;

        let (face_count, values_per_face) = match view.shape() {
            &[f, l, 3] => (f, l * 3),
            &[f, v] => (f, v),
            other => {
                return Err(Error::Inference(format!(
                    "unexpected mesh output shape {:?}",
                    other
                )))
            }
        };
        if values_per_face == 0 || values_per_face % 3 != 0 {
            return Err(Error::Inference(format!(
                "mesh output stride {} is not divisible by 3",
                values_per_face
            )));
        }

        let presence = if outputs.len() > 1 {
            Some(tensor_values(outputs.get(1), "mesh presence")?)
        } else {
            None
        };

        let flat: Vec<f32> = view.iter().cloned().collect();
        let mut sets = Vec::new();
        for (face_idx, values) in flat
            .chunks_exact(values_per_face)
            .take(face_count)
            .enumerate()
        {
            if let Some(scores) = &presence {
                if scores.get(face_idx).copied().unwrap_or(0.0) < self.min_presence {
                    continue;
                }
            }
            let points = values
                .chunks_exact(3)
                .map(|p| {
                    (
                        p[0] / self.input_width as f32,
                        p[1] / self.input_height as f32,
                    )
                })
                .collect();
            sets.push(LandmarkSet { points });
        }
        Ok(sets)
    }
}
