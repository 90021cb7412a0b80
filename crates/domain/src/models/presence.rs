//! Presence projection models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Ephemeral online-status projection for one badge/surveyor pair.
///
/// Derived entirely from live feed events plus the one-shot freshness
/// check; recomputed on every event and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceView {
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    /// Distinct live members currently joined to the surveyor channel.
    pub presence_count: usize,
}

impl Default for PresenceView {
    fn default() -> Self {
        Self {
            is_online: false,
            last_seen: None,
            presence_count: 0,
        }
    }
}

impl PresenceView {
    /// Initial view seeded from a badge's cached `last_location_at`, used
    /// before any live signal arrives.
    pub fn seeded(last_location_at: Option<DateTime<Utc>>) -> Self {
        Self {
            last_seen: last_location_at,
            ..Self::default()
        }
    }

    pub fn status_text(&self) -> &'static str {
        if self.is_online {
            "online"
        } else {
            "offline"
        }
    }
}

/// Response payload for the presence snapshot endpoint.
///
/// Carries both the compact indicator fields and the expanded
/// humanized "last seen" string; pure projection, no I/O of its own.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshotResponse {
    pub badge_id: Uuid,
    pub surveyor_id: String,
    pub is_online: bool,
    pub status_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_text: Option<String>,
    pub presence_count: usize,
}

impl PresenceSnapshotResponse {
    pub fn new(badge_id: Uuid, surveyor_id: String, view: PresenceView) -> Self {
        Self {
            badge_id,
            surveyor_id,
            is_online: view.is_online,
            status_text: view.status_text().to_string(),
            last_seen: view.last_seen,
            last_seen_text: view.last_seen.map(shared::relative_time::relative_to_now),
            presence_count: view.presence_count,
        }
    }
}
