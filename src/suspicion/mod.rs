//! SuspicionTracker - Edge-Triggered Proctoring State
//!
//! Tracks whether the current frame stream is in a suspicious condition.
//! Only the Calm -> Suspicious transition is surfaced, so evidence is written
//! once per episode instead of once per frame.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Proctoring state
#[derive(Debug, Clone, PartialEq, Eq)]
enum SuspicionState {
    /// Nothing unusual in the frame stream
    Calm,
    /// A suspicious condition is ongoing
    Suspicious { since: DateTime<Utc> },
}

/// Rising-edge transition into the suspicious state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspicionTransition {
    pub since: DateTime<Utc>,
}

/// Tracks suspicion state and detects transitions.
pub struct SuspicionTracker {
    state: RwLock<SuspicionState>,
}

impl SuspicionTracker {
    /// Create new tracker (calm)
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SuspicionState::Calm),
        }
    }

    /// Feed one frame evaluation into the state machine.
    ///
    /// Returns:
    /// - `Some(transition)` on Calm -> Suspicious (the rising edge)
    /// - `None` for every other combination (falling edge clears silently)
    pub async fn observe(&self, suspicious: bool, now: DateTime<Utc>) -> Option<SuspicionTransition> {
        let mut state = self.state.write().await;
        match (&*state, suspicious) {
            (SuspicionState::Calm, true) => {
                *state = SuspicionState::Suspicious { since: now };
                tracing::warn!(since = %now, "suspicious activity started");
                Some(SuspicionTransition { since: now })
            }
            (SuspicionState::Suspicious { .. }, false) => {
                *state = SuspicionState::Calm;
                tracing::info!("suspicious activity cleared");
                None
            }
            _ => None,
        }
    }

    /// Seconds spent in the suspicious state, if currently suspicious.
    pub async fn duration_secs(&self, now: DateTime<Utc>) -> Option<f64> {
        match &*self.state.read().await {
            SuspicionState::Suspicious { since } => {
                Some((now - *since).num_milliseconds() as f64 / 1000.0)
            }
            SuspicionState::Calm => None,
        }
    }
}

impl Default for SuspicionTracker {
    fn default() -> Self {
        Self::new()
    }
}
