//! Activity state snapshots exposed to viewers and the title-bar generator.

use serde::{Deserialize, Serialize};

/// Application-specific status extracted by a bound detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppStatus {
    /// Detector name (e.g., "claude").
    pub app: String,
    /// Compact display string (e.g., "Crafting (205s, ↑6.0k)").
    pub status: String,
}

/// Snapshot of a session's activity state.
///
/// Produced by `ActivityTracker::activity_state()`; consumed by the external
/// title-bar generator and the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityState {
    /// Whether meaningful output was seen within the activity timeout.
    pub is_active: bool,
    /// Last activity timestamp in milliseconds since the Unix epoch.
    /// Monotonically non-decreasing for a live tracker.
    pub last_activity_time: u64,
    /// App-specific status while one is fresh, cleared when stale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specific_status: Option<AppStatus>,
}

impl Default for ActivityState {
    fn default() -> Self {
        Self {
            is_active: false,
            last_activity_time: 0,
            specific_status: None,
        }
    }
}
