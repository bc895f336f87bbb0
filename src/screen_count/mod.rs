//! ScreenCount - Attached-Monitor Reporting
//!
//! ## Responsibilities
//!
//! - Resolve the attached screen count (env override, then OS query)
//! - Attach an advisory warning when more than one screen is present
//!
//! Resolution is fail-open: an invalid override or a failed OS query reports
//! a single screen with no warning, never an error.

use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};

/// Environment override for the detected screen count.
pub const SCREEN_COUNT_ENV: &str = "SCREEN_COUNT";

const MULTI_SCREEN_WARNING: &str =
    "Please disconnect additional monitors before starting the interview";

/// Screen-count response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub screen_count: i64,
    pub warning: Option<String>,
}

/// Resolve the current screen count.
pub fn current() -> ScreenInfo {
    resolve(std::env::var(SCREEN_COUNT_ENV).ok(), probe_displays)
}

/// Router for the screen-count service.
pub fn router() -> Router {
    Router::new().route("/screen-count", get(get_screen_count))
}

async fn get_screen_count() -> Json<ScreenInfo> {
    Json(current())
}

fn probe_displays() -> Option<i64> {
    match display_info::DisplayInfo::all() {
        Ok(displays) => Some(displays.len() as i64),
        Err(e) => {
            tracing::warn!(error = %e, "display enumeration failed");
            None
        }
    }
}

fn resolve(override_value: Option<String>, probe: impl FnOnce() -> Option<i64>) -> ScreenInfo {
    let count = match override_value {
        Some(raw) => match raw.trim().parse::<i64>() {
            Ok(n) => Some(n),
            Err(_) => {
                tracing::warn!(value = %raw, "invalid screen count override");
                None
            }
        },
        None => probe(),
    };

    match count {
        Some(n) if n > 1 => ScreenInfo {
            screen_count: n,
            warning: Some(MULTI_SCREEN_WARNING.to_string()),
        },
        Some(n) => ScreenInfo {
            screen_count: n,
            warning: None,
        },
        None => ScreenInfo {
            screen_count: 1,
            warning: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_above_one_warns() {
        let info = resolve(Some("3".to_string()), || None);
        assert_eq!(info.screen_count, 3);
        assert!(info.warning.is_some());
    }

    #[test]
    fn override_of_one_is_clean() {
        let info = resolve(Some("1".to_string()), || None);
        assert_eq!(info.screen_count, 1);
        assert!(info.warning.is_none());
    }

    #[test]
    fn invalid_override_falls_back_open() {
        let info = resolve(Some("abc".to_string()), || Some(4));
        assert_eq!(info.screen_count, 1);
        assert!(info.warning.is_none());
    }

    #[test]
    fn probe_is_used_without_override() {
        let info = resolve(None, || Some(2));
        assert_eq!(info.screen_count, 2);
        assert!(info.warning.is_some());
    }

    #[test]
    fn failed_probe_falls_back_open() {
        let info = resolve(None, || None);
        assert_eq!(info.screen_count, 1);
        assert!(info.warning.is_none());
    }

    #[test]
    fn warning_serializes_as_null_when_absent() {
        let info = resolve(Some("1".to_string()), || None);
        let json = serde_json::to_value(&info).unwrap();
        assert!(json["warning"].is_null());
    }
}
