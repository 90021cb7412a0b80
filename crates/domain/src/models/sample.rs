//! Location sample domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Represents one location sample row.
///
/// Samples are append-only: immutable once written, never updated or
/// deleted by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub id: i64,
    pub badge_id: Uuid,
    pub surveyor_id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Capture time, client-assigned at write time.
    pub recorded_at: DateTime<Utc>,
    /// Store-assigned insertion time.
    pub created_at: DateTime<Utc>,
}

/// Request payload for sample insertion.
///
/// POST /api/v1/locations
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordSampleRequest {
    pub badge_id: Uuid,

    #[validate(custom(function = "shared::validation::validate_surveyor_id"))]
    pub surveyor_id: String,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    /// Defaults to the server clock when omitted.
    #[validate(custom(function = "shared::validation::validate_recorded_at"))]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Response payload for sample insertion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSampleResponse {
    pub success: bool,
    pub sample: LocationSample,
}

/// Query parameters for the sample history endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleHistoryQuery {
    /// Number of newest samples to return (1-50, default 50).
    pub limit: Option<i64>,
}

impl SampleHistoryQuery {
    /// Default number of samples returned.
    pub const DEFAULT_LIMIT: i64 = 50;
    /// Upper bound on the visible history window.
    pub const MAX_LIMIT: i64 = 50;
    /// Lower bound for history queries.
    pub const MIN_LIMIT: i64 = 1;

    /// Returns the effective limit, clamped to valid range.
    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(Self::MIN_LIMIT, Self::MAX_LIMIT)
    }
}

/// Single sample in a history response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleHistoryItem {
    pub id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

impl From<LocationSample> for SampleHistoryItem {
    fn from(sample: LocationSample) -> Self {
        Self {
            id: sample.id,
            latitude: sample.latitude,
            longitude: sample.longitude,
            recorded_at: sample.recorded_at,
        }
    }
}

/// Response payload for the sample history endpoint, newest first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleHistoryResponse {
    pub samples: Vec<SampleHistoryItem>,
    pub count: usize,
}
