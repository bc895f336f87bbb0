//! EvidenceStore - Screenshots and the Suspicious-Event Log
//!
//! ## Responsibilities
//!
//! - Write the annotated frame to disk when suspicion begins
//! - Append one JSON line per event to the append-only event log
//!
//! Records are immutable once written; there is no retry on I/O failure.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::Result;

const SCREENSHOT_PREFIX: &str = "suspicious_";
const EVENT_LOG_FILE: &str = "suspicious_events.log";
const EVENT_TYPE: &str = "suspicious_activity";
/// Timestamp format shared by screenshot names and log entries.
const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// One line of the suspicious-event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousEventRecord {
    pub timestamp: String,
    pub screenshot: String,
    #[serde(rename = "type")]
    pub event_type: String,
}

/// Writes rising-edge evidence to disk.
pub struct EvidenceStore {
    screenshot_dir: PathBuf,
    log_dir: PathBuf,
}

impl EvidenceStore {
    pub fn new(screenshot_dir: PathBuf, log_dir: PathBuf) -> Self {
        Self {
            screenshot_dir,
            log_dir,
        }
    }

    /// Persist one suspicious-transition event: screenshot plus log line.
    pub async fn record(&self, jpeg: &[u8], at: DateTime<Utc>) -> Result<SuspiciousEventRecord> {
        fs::create_dir_all(&self.screenshot_dir).await?;
        fs::create_dir_all(&self.log_dir).await?;

        let stamp = at.format(STAMP_FORMAT).to_string();
        let screenshot_path = self
            .screenshot_dir
            .join(format!("{}{}.jpg", SCREENSHOT_PREFIX, stamp));
        fs::write(&screenshot_path, jpeg).await?;

        let record = SuspiciousEventRecord {
            timestamp: stamp,
            screenshot: screenshot_path.to_string_lossy().into_owned(),
            event_type: EVENT_TYPE.to_string(),
        };

        let line = serde_json::to_string(&record)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.event_log_path())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;

        tracing::info!(screenshot = %record.screenshot, "suspicious event recorded");
        Ok(record)
    }

    pub fn event_log_path(&self) -> PathBuf {
        self.log_dir.join(EVENT_LOG_FILE)
    }
}
