//! Badge registry endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::badge::{BadgeResponse, SurveyorBadge, UpdateBadgeRequest};
use persistence::repositories::BadgeRepository;

use crate::app::AppState;
use crate::error::ApiError;

/// Read one badge.
///
/// GET /api/v1/badges/:badge_id
pub async fn get_badge(
    State(state): State<AppState>,
    Path(badge_id): Path<Uuid>,
) -> Result<Json<BadgeResponse>, ApiError> {
    let repo = BadgeRepository::new(state.pool.clone());
    let badge = repo
        .find_by_id(badge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Badge not found".to_string()))?;

    let badge: SurveyorBadge = badge.into();
    Ok(Json(badge.into()))
}

/// Partially update a badge.
///
/// PATCH /api/v1/badges/:badge_id
///
/// The location cache fields travel as a unit and the forms-submitted
/// counter never decreases.
pub async fn update_badge(
    State(state): State<AppState>,
    Path(badge_id): Path<Uuid>,
    Json(request): Json<UpdateBadgeRequest>,
) -> Result<Json<BadgeResponse>, ApiError> {
    request.validate()?;

    if request.is_empty() {
        return Err(ApiError::Validation("No fields to update".to_string()));
    }
    if !request.location_fields_consistent() {
        return Err(ApiError::Validation(
            "lastLatitude, lastLongitude, and lastLocationAt must be updated together".to_string(),
        ));
    }

    let repo = BadgeRepository::new(state.pool.clone());
    let updated = repo
        .apply_update(badge_id, &request)
        .await?
        .ok_or_else(|| ApiError::NotFound("Badge not found".to_string()))?;

    info!(badge_id = %badge_id, "Badge updated");

    let badge: SurveyorBadge = updated.into();
    Ok(Json(badge.into()))
}
