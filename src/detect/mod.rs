//! DetectionAdapter - Face Model Fusion
//!
//! ## Responsibilities
//!
//! - Run the detector and mesh models on the same frame
//! - Merge their outputs into one face list (clamped pixel boxes)
//! - Draw bounding boxes and labels onto a copy of the frame
//!
//! The adapter is pure with respect to proctoring state: suspicion tracking
//! and evidence writes are composed around it by the ProctorEngine.

pub mod backend;
pub mod backends;

use std::sync::Mutex;

use ab_glyph::{FontVec, PxScale};
use image::Rgb;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::models::{Face, FaceKind};

use backend::{FaceDetectorModel, FaceMeshModel, LandmarkSet, RawDetection};

/// A mesh-derived box whose top-left corner lies within this many pixels of
/// an accepted box (on both axes) is treated as the same face. The constant
/// is not scale-aware; it is tuned for 640x480 input.
pub const DEDUP_RADIUS_PX: i64 = 50;

/// Minimum fraction of landmarks inside the frame for a mesh-only face.
pub const MIN_MESH_VISIBILITY: f32 = 0.2;

/// A single face below this confidence is flagged as suspicious.
pub const SUSPICIOUS_CONFIDENCE_FLOOR: f32 = 0.3;

const LABEL_SCALE: f32 = 16.0;
const LABEL_OFFSET_PX: i32 = 14;

const FONT_SEARCH_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
];

const DETECTOR_MODEL_ENV: &str = "FACE_DETECTOR_MODEL";
const MESH_MODEL_ENV: &str = "FACE_MESH_MODEL";
const DEFAULT_DETECTOR_MODEL: &str = "models/face_detector.onnx";
const DEFAULT_MESH_MODEL: &str = "models/face_mesh.onnx";

/// Fuses the two face models and annotates frames.
pub struct DetectionAdapter {
    detector: Mutex<Box<dyn FaceDetectorModel>>,
    mesh: Mutex<Box<dyn FaceMeshModel>>,
    font: Option<FontVec>,
}

impl DetectionAdapter {
    pub fn new(detector: Box<dyn FaceDetectorModel>, mesh: Box<dyn FaceMeshModel>) -> Self {
        Self {
            detector: Mutex::new(detector),
            mesh: Mutex::new(mesh),
            font: load_label_font(),
        }
    }

    /// Build the adapter with ONNX backends resolved from the environment.
    pub fn from_env() -> Result<Self> {
        let detector_path = std::env::var(DETECTOR_MODEL_ENV)
            .unwrap_or_else(|_| DEFAULT_DETECTOR_MODEL.to_string());
        let mesh_path =
            std::env::var(MESH_MODEL_ENV).unwrap_or_else(|_| DEFAULT_MESH_MODEL.to_string());

        let detector = backends::OnnxFaceDetector::load(&detector_path)?;
        let mesh = backends::OnnxFaceMesh::load(&mesh_path)?;
        tracing::info!(
            detector_model = %detector_path,
            mesh_model = %mesh_path,
            "face models loaded"
        );
        Ok(Self::new(Box::new(detector), Box::new(mesh)))
    }

    /// Run both models on a frame and return the merged face list plus an
    /// annotated copy of the frame.
    pub fn process(&self, frame: &Frame) -> Result<(Vec<Face>, Frame)> {
        let detections = self
            .detector
            .lock()
            .map_err(|_| Error::Internal("face detector lock poisoned".to_string()))?
            .detect(frame)?;
        let meshes = self
            .mesh
            .lock()
            .map_err(|_| Error::Internal("face mesh lock poisoned".to_string()))?
            .mesh(frame)?;

        let faces = merge_detections(frame.width(), frame.height(), &detections, &meshes);
        let annotated = self.annotate(frame, &faces);
        Ok((faces, annotated))
    }

    fn annotate(&self, frame: &Frame, faces: &[Face]) -> Frame {
        let mut img = frame.to_rgb_image();
        // Green only when exactly one face is present.
        let color = if faces.len() == 1 {
            Rgb([0u8, 255, 0])
        } else {
            Rgb([255u8, 0, 0])
        };

        for face in faces {
            let [x, y, w, h] = face.bbox;
            if w == 0 || h == 0 {
                continue;
            }
            draw_hollow_rect_mut(&mut img, Rect::at(x as i32, y as i32).of_size(w, h), color);
            if w > 2 && h > 2 {
                let inner = Rect::at(x as i32 + 1, y as i32 + 1).of_size(w - 2, h - 2);
                draw_hollow_rect_mut(&mut img, inner, color);
            }
            if let Some(font) = &self.font {
                let label = format!("{:.2} ({})", face.confidence, face.kind);
                let label_y = (y as i32 - LABEL_OFFSET_PX).max(0);
                draw_text_mut(
                    &mut img,
                    color,
                    x as i32,
                    label_y,
                    PxScale::from(LABEL_SCALE),
                    font,
                    &label,
                );
            }
        }
        Frame::from_rgb_image(img)
    }
}

/// Merge detector and mesh outputs into one clamped face list.
///
/// Detector faces are accepted first. Each mesh landmark set then becomes a
/// candidate box; it is dropped as a duplicate of any already-accepted face,
/// and otherwise kept only when enough of its landmarks are inside the frame.
pub fn merge_detections(
    frame_w: u32,
    frame_h: u32,
    detections: &[RawDetection],
    meshes: &[LandmarkSet],
) -> Vec<Face> {
    let mut faces = Vec::new();

    for d in detections {
        let bbox = clamp_box(
            (d.x_min * frame_w as f32) as i64,
            (d.y_min * frame_h as f32) as i64,
            (d.width * frame_w as f32) as i64,
            (d.height * frame_h as f32) as i64,
            frame_w,
            frame_h,
        );
        faces.push(Face {
            bbox,
            confidence: d.score,
            kind: FaceKind::Full,
        });
    }

    for set in meshes {
        if set.points.is_empty() {
            continue;
        }

        let mut x_min = i64::MAX;
        let mut y_min = i64::MAX;
        let mut x_max = i64::MIN;
        let mut y_max = i64::MIN;
        for &(x, y) in &set.points {
            let px = (x * frame_w as f32) as i64;
            let py = (y * frame_h as f32) as i64;
            x_min = x_min.min(px);
            y_min = y_min.min(py);
            x_max = x_max.max(px);
            y_max = y_max.max(py);
        }

        let duplicate = faces.iter().any(|f| {
            (x_min - f.bbox[0] as i64).abs() < DEDUP_RADIUS_PX
                && (y_min - f.bbox[1] as i64).abs() < DEDUP_RADIUS_PX
        });
        if duplicate {
            continue;
        }

        let visible = set
            .points
            .iter()
            .filter(|(x, y)| (0.0..=1.0).contains(x) && (0.0..=1.0).contains(y))
            .count();
        let confidence = visible as f32 / set.points.len() as f32;
        if confidence > MIN_MESH_VISIBILITY {
            faces.push(Face {
                bbox: clamp_box(x_min, y_min, x_max - x_min, y_max - y_min, frame_w, frame_h),
                confidence,
                kind: FaceKind::Partial,
            });
        }
    }

    faces
}

/// Evaluate the suspicion predicate over a face list.
pub fn is_suspicious(faces: &[Face]) -> bool {
    faces.len() > 1 || (faces.len() == 1 && faces[0].confidence < SUSPICIOUS_CONFIDENCE_FLOOR)
}

fn clamp_box(x: i64, y: i64, w: i64, h: i64, frame_w: u32, frame_h: u32) -> [u32; 4] {
    let x = x.clamp(0, frame_w as i64);
    let y = y.clamp(0, frame_h as i64);
    let w = w.clamp(0, frame_w as i64 - x);
    let h = h.clamp(0, frame_h as i64 - y);
    [x as u32, y as u32, w as u32, h as u32]
}

fn load_label_font() -> Option<FontVec> {
    let candidates = std::env::var("PROCTOR_FONT")
        .ok()
        .into_iter()
        .chain(FONT_SEARCH_PATHS.iter().map(|p| p.to_string()));

    for path in candidates {
        let Ok(bytes) = std::fs::read(&path) else {
            continue;
        };
        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                tracing::debug!(font = %path, "label font loaded");
                return Some(font);
            }
            Err(e) => {
                tracing::warn!(font = %path, error = %e, "failed to parse label font");
            }
        }
    }

    tracing::warn!("no label font found; boxes will be drawn without labels");
    None
}

#[cfg(test)]
mod tests {
    use super::backends::{StubFaceDetector, StubFaceMesh};
    use super::*;

    fn detection(x_min: f32, y_min: f32, width: f32, height: f32, score: f32) -> RawDetection {
        RawDetection {
            x_min,
            y_min,
            width,
            height,
            score,
        }
    }

    /// Landmarks forming a box with the given relative corners.
    fn landmarks(x0: f32, y0: f32, x1: f32, y1: f32) -> LandmarkSet {
        LandmarkSet {
            points: vec![(x0, y0), (x1, y0), (x0, y1), (x1, y1)],
        }
    }

    #[test]
    fn detector_faces_are_clamped_to_frame() {
        let faces = merge_detections(
            640,
            480,
            &[detection(-0.1, -0.1, 0.5, 1.5, 0.9)],
            &[],
        );
        assert_eq!(faces.len(), 1);
        let [x, y, w, h] = faces[0].bbox;
        assert_eq!((x, y), (0, 0));
        assert!(x + w <= 640);
        assert!(y + h <= 480);
        assert_eq!(faces[0].kind, FaceKind::Full);
    }

    #[test]
    fn mesh_face_near_detector_face_is_deduplicated() {
        // Detector box at (128, 96); mesh box top-left at (160, 120) is
        // within 50px on both axes.
        let faces = merge_detections(
            640,
            480,
            &[detection(0.2, 0.2, 0.3, 0.3, 0.9)],
            &[landmarks(0.25, 0.25, 0.5, 0.5)],
        );
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].kind, FaceKind::Full);
    }

    #[test]
    fn distant_mesh_face_is_kept_as_partial() {
        // Mesh box top-left at (448, 360), far from the detector box.
        let faces = merge_detections(
            640,
            480,
            &[detection(0.1, 0.1, 0.2, 0.2, 0.9)],
            &[landmarks(0.7, 0.75, 0.9, 0.95)],
        );
        assert_eq!(faces.len(), 2);
        assert_eq!(faces[1].kind, FaceKind::Partial);
        assert!((faces[1].confidence - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn mostly_invisible_mesh_face_is_dropped() {
        // One of five landmarks inside the frame: ratio 0.2 is not > 0.2.
        let set = LandmarkSet {
            points: vec![
                (0.9, 0.9),
                (1.2, 0.9),
                (1.3, 1.1),
                (1.2, 1.4),
                (1.5, 1.5),
            ],
        };
        let faces = merge_detections(640, 480, &[], &[set]);
        assert!(faces.is_empty());
    }

    #[test]
    fn mesh_boxes_are_clamped_to_frame() {
        // Enough landmarks visible to keep the face, but the box spills past
        // the right and bottom edges.
        let set = LandmarkSet {
            points: vec![(0.8, 0.8), (0.9, 0.9), (1.2, 1.3), (0.85, 0.95)],
        };
        let faces = merge_detections(640, 480, &[], &[set]);
        assert_eq!(faces.len(), 1);
        let [x, y, w, h] = faces[0].bbox;
        assert!(x + w <= 640);
        assert!(y + h <= 480);
    }

    #[test]
    fn suspicion_predicate_truth_table() {
        let face = |confidence| Face {
            bbox: [0, 0, 10, 10],
            confidence,
            kind: FaceKind::Full,
        };
        assert!(!is_suspicious(&[]));
        assert!(!is_suspicious(&[face(0.9)]));
        assert!(is_suspicious(&[face(0.2)]));
        assert!(is_suspicious(&[face(0.9), face(0.9)]));
    }

    #[test]
    fn process_annotates_a_copy() {
        let adapter = DetectionAdapter::new(
            Box::new(StubFaceDetector::new(vec![detection(
                0.25, 0.25, 0.25, 0.25, 0.9,
            )])),
            Box::new(StubFaceMesh::empty()),
        );
        let frame = Frame::new(64, 64, vec![0u8; 64 * 64 * 3]).unwrap();
        let (faces, annotated) = adapter.process(&frame).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(annotated.width(), 64);
        assert_eq!(annotated.height(), 64);
        // The input frame is untouched; the annotated copy has boxes drawn.
        assert!(frame.data().iter().all(|&b| b == 0));
        assert!(annotated.data().iter().any(|&b| b != 0));
    }

    #[test]
    fn empty_outputs_process_cleanly() {
        let adapter = DetectionAdapter::new(
            Box::new(StubFaceDetector::empty()),
            Box::new(StubFaceMesh::empty()),
        );
        let frame = Frame::new(32, 32, vec![10u8; 32 * 32 * 3]).unwrap();
        let (faces, _) = adapter.process(&frame).unwrap();
        assert!(faces.is_empty());
    }
}
