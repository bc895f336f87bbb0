//! Shared data models

use serde::{Deserialize, Serialize};

/// How a face was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceKind {
    /// Reported directly by the primary detector
    Full,
    /// Inferred from mesh landmarks only
    Partial,
}

impl std::fmt::Display for FaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaceKind::Full => write!(f, "full"),
            FaceKind::Partial => write!(f, "partial"),
        }
    }
}

/// A detected face in frame-pixel coordinates.
///
/// The box is always clamped to the frame bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// [x, y, w, h] in pixels
    #[serde(rename = "box")]
    pub bbox: [u32; 4],
    /// Confidence in [0, 1]
    pub confidence: f32,
    #[serde(rename = "type")]
    pub kind: FaceKind,
}

/// Per-frame detection result returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub face_count: usize,
    pub suspicious: bool,
    pub faces: Vec<Face>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotated_image_base64: Option<String>,
    /// ISO-8601 evaluation timestamp
    pub timestamp: String,
    /// Seconds spent in the suspicious state, present only while suspicious
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suspicious_duration: Option<f64>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub camera_online: bool,
}
