//! Tracking session endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::SurveyorBadge;
use domain::services::geolocation::PositionFix;
use domain::services::tracking::TrackingSnapshot;
use persistence::repositories::BadgeRepository;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::FixOutcome;

/// Display precision for the current position.
const CURRENT_POSITION_DECIMALS: usize = 6;
/// Display precision for history rows.
const HISTORY_DECIMALS: usize = 4;

/// Device fix pushed into an active tracking session.
///
/// POST /api/v1/badges/:badge_id/tracking/fixes
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PushFixRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,

    /// Defaults to the server clock when omitted.
    #[validate(custom(function = "shared::validation::validate_recorded_at"))]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Response for start/stop/fix actions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingActionResponse {
    pub success: bool,
    pub tracking: bool,
}

/// Current position formatted for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPosition {
    pub latitude: String,
    pub longitude: String,
    pub recorded_at: DateTime<Utc>,
}

/// History row formatted for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingHistoryRow {
    pub id: i64,
    pub latitude: String,
    pub longitude: String,
    pub recorded_at: DateTime<Utc>,
}

/// Tracking session view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStatusResponse {
    pub tracking: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_position: Option<FormattedPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update: Option<DateTime<Utc>>,
    pub history: Vec<TrackingHistoryRow>,
    pub history_count: usize,
    pub samples_recorded: u64,
}

fn format_coordinate(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

impl From<TrackingSnapshot> for TrackingStatusResponse {
    fn from(snapshot: TrackingSnapshot) -> Self {
        let current_position = snapshot.current_position.map(|fix| FormattedPosition {
            latitude: format_coordinate(fix.latitude, CURRENT_POSITION_DECIMALS),
            longitude: format_coordinate(fix.longitude, CURRENT_POSITION_DECIMALS),
            recorded_at: fix.recorded_at,
        });
        let history: Vec<TrackingHistoryRow> = snapshot
            .history
            .iter()
            .map(|sample| TrackingHistoryRow {
                id: sample.id,
                latitude: format_coordinate(sample.latitude, HISTORY_DECIMALS),
                longitude: format_coordinate(sample.longitude, HISTORY_DECIMALS),
                recorded_at: sample.recorded_at,
            })
            .collect();

        Self {
            tracking: snapshot.tracking,
            current_position,
            last_update: snapshot.last_update,
            history_count: history.len(),
            history,
            samples_recorded: snapshot.samples_recorded,
        }
    }
}

async fn find_active_badge(
    state: &AppState,
    badge_id: Uuid,
) -> Result<SurveyorBadge, ApiError> {
    let repo = BadgeRepository::new(state.pool.clone());
    let badge = repo
        .find_by_id(badge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Badge not found".to_string()))?;

    let badge: SurveyorBadge = badge.into();
    if !badge.is_active() {
        return Err(ApiError::NotFound("Badge not found".to_string()));
    }
    Ok(badge)
}

/// Start (or resume) location capture for a badge.
///
/// POST /api/v1/badges/:badge_id/tracking/start
pub async fn start_tracking(
    State(state): State<AppState>,
    Path(badge_id): Path<Uuid>,
) -> Result<Json<TrackingStatusResponse>, ApiError> {
    let badge = find_active_badge(&state, badge_id).await?;
    let snapshot = state.sessions.start(&badge).await;

    info!(badge_id = %badge_id, tracking = snapshot.tracking, "Tracking session started");
    Ok(Json(snapshot.into()))
}

/// Stop location capture for a badge. A no-op when not tracking.
///
/// POST /api/v1/badges/:badge_id/tracking/stop
pub async fn stop_tracking(
    State(state): State<AppState>,
    Path(badge_id): Path<Uuid>,
) -> Result<Json<TrackingActionResponse>, ApiError> {
    if state.sessions.stop(badge_id).await.is_some() {
        info!(badge_id = %badge_id, "Tracking session stopped");
    }
    Ok(Json(TrackingActionResponse {
        success: true,
        tracking: false,
    }))
}

/// Push one device fix into the badge's active tracking session.
///
/// POST /api/v1/badges/:badge_id/tracking/fixes
pub async fn push_fix(
    State(state): State<AppState>,
    Path(badge_id): Path<Uuid>,
    Json(request): Json<PushFixRequest>,
) -> Result<Json<TrackingActionResponse>, ApiError> {
    request.validate()?;

    let fix = PositionFix {
        latitude: request.latitude,
        longitude: request.longitude,
        recorded_at: request.recorded_at.unwrap_or_else(Utc::now),
    };

    match state.sessions.push_fix(badge_id, fix).await {
        FixOutcome::Accepted => Ok(Json(TrackingActionResponse {
            success: true,
            tracking: true,
        })),
        FixOutcome::NoSession => Err(ApiError::NotFound(
            "No tracking session for badge".to_string(),
        )),
        FixOutcome::NotTracking => Err(ApiError::Conflict(
            "Tracking is not active for badge".to_string(),
        )),
    }
}

/// Tracking session view for a badge.
///
/// GET /api/v1/badges/:badge_id/tracking
pub async fn get_tracking(
    State(state): State<AppState>,
    Path(badge_id): Path<Uuid>,
) -> Result<Json<TrackingStatusResponse>, ApiError> {
    let snapshot = state
        .sessions
        .snapshot(badge_id)
        .await
        .ok_or_else(|| ApiError::NotFound("No tracking session for badge".to_string()))?;

    Ok(Json(snapshot.into()))
}
