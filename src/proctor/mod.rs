//! ProctorEngine - Per-Frame Evaluation Pipeline
//!
//! ## Responsibilities
//!
//! - Run the DetectionAdapter on the tokio blocking pool
//! - Feed the result into the SuspicionTracker
//! - Write evidence exactly once per rising edge
//! - Assemble the DetectionReport returned to clients
//!
//! Transitions are serialized by the tracker, so concurrent requests cannot
//! produce duplicate evidence for one episode.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;

use crate::detect::{self, DetectionAdapter};
use crate::error::{Error, Result};
use crate::evidence::EvidenceStore;
use crate::frame::Frame;
use crate::models::{DetectionReport, Face};
use crate::suspicion::SuspicionTracker;

/// Result of one frame evaluation.
pub struct Evaluation {
    pub report: DetectionReport,
    /// Annotated frame as JPEG, for the multipart stream
    pub annotated_jpeg: Vec<u8>,
}

/// Per-frame evaluation pipeline.
pub struct ProctorEngine {
    adapter: Arc<DetectionAdapter>,
    tracker: SuspicionTracker,
    evidence: EvidenceStore,
}

impl ProctorEngine {
    pub fn new(adapter: DetectionAdapter, evidence: EvidenceStore) -> Self {
        Self {
            adapter: Arc::new(adapter),
            tracker: SuspicionTracker::new(),
            evidence,
        }
    }

    /// Evaluate one frame: detect, track suspicion, persist evidence on the
    /// rising edge, and build the client-facing report.
    pub async fn evaluate(&self, frame: Frame) -> Result<Evaluation> {
        let adapter = self.adapter.clone();
        let (faces, annotated_jpeg) = tokio::task::spawn_blocking(
            move || -> Result<(Vec<Face>, Vec<u8>)> {
                let (faces, annotated) = adapter.process(&frame)?;
                let jpeg = annotated.encode_jpeg()?;
                Ok((faces, jpeg))
            },
        )
        .await
        .map_err(|e| Error::Internal(format!("detection task failed: {}", e)))??;

        let now = Utc::now();
        let suspicious = detect::is_suspicious(&faces);
        if let Some(transition) = self.tracker.observe(suspicious, now).await {
            self.evidence.record(&annotated_jpeg, transition.since).await?;
        }
        let suspicious_duration = self.tracker.duration_secs(now).await;

        let report = DetectionReport {
            face_count: faces.len(),
            suspicious,
            faces,
            annotated_image_base64: Some(BASE64.encode(&annotated_jpeg)),
            timestamp: now.to_rfc3339(),
            suspicious_duration,
        };

        Ok(Evaluation {
            report,
            annotated_jpeg,
        })
    }
}
