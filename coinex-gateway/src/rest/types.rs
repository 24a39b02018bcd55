//! Response payloads for the common REST endpoints.

use serde::{Deserialize, Serialize};

/// `GET ping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    /// Always `"pong"`.
    pub result: String,
}

/// `GET time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTime {
    /// Server time in Unix milliseconds.
    pub timestamp: i64,
}

/// What a maintenance window covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MaintenanceScope {
    /// Futures trading only.
    Futures,
    /// Spot trading only.
    Spot,
    /// The whole site.
    AllSite,
}

/// One scheduled maintenance window from `GET maintain/info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceInfo {
    /// Start, Unix milliseconds.
    pub started_at: i64,
    /// End, Unix milliseconds.
    pub ended_at: i64,
    /// Affected segments.
    #[serde(default)]
    pub scope: Vec<MaintenanceScope>,
    /// Announcement link.
    #[serde(default)]
    pub announce_url: String,
    /// Whether the announcement is published.
    #[serde(default)]
    pub announce_enabled: bool,
    /// Start of the protection period that follows maintenance, if set.
    #[serde(default)]
    pub protect_duration_start: Option<i64>,
    /// End of the protection period, if set.
    #[serde(default)]
    pub protect_duration_end: Option<i64>,
}

impl MaintenanceInfo {
    /// Returns true if the window covers `now_ms`.
    #[must_use]
    pub fn is_active_at(&self, now_ms: i64) -> bool {
        (self.started_at..self.ended_at).contains(&now_ms)
    }

    /// Returns true if the protection period covers `now_ms`.
    #[must_use]
    pub fn is_protected_at(&self, now_ms: i64) -> bool {
        match (self.protect_duration_start, self.protect_duration_end) {
            (Some(start), Some(end)) => (start..end).contains(&now_ms),
            _ => false,
        }
    }
}
