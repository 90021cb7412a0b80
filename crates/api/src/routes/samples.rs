//! Location store endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use domain::models::sample::{
    LocationSample, RecordSampleRequest, RecordSampleResponse, SampleHistoryItem,
    SampleHistoryQuery, SampleHistoryResponse,
};
use domain::models::SurveyorBadge;
use domain::services::stores::{ChangeFeedPublisher, NewLocationSample};
use persistence::repositories::{BadgeRepository, LocationSampleRepository};

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_sample_recorded;

/// Insert one location sample.
///
/// POST /api/v1/locations
pub async fn record_sample(
    State(state): State<AppState>,
    Json(request): Json<RecordSampleRequest>,
) -> Result<Json<RecordSampleResponse>, ApiError> {
    request.validate()?;

    let badge_repo = BadgeRepository::new(state.pool.clone());
    let badge = badge_repo
        .find_by_id(request.badge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Badge not found".to_string()))?;

    let badge: SurveyorBadge = badge.into();
    if !badge.is_active() {
        return Err(ApiError::NotFound("Badge not found".to_string()));
    }

    let recorded_at = request.recorded_at.unwrap_or_else(Utc::now);

    let sample_repo = LocationSampleRepository::new(state.pool.clone());
    let entity = sample_repo
        .insert(&NewLocationSample {
            badge_id: request.badge_id,
            surveyor_id: request.surveyor_id.clone(),
            latitude: request.latitude,
            longitude: request.longitude,
            recorded_at,
        })
        .await?;

    let sample: LocationSample = entity.into();
    state.change_feed.publish(&sample);
    record_sample_recorded();

    // Refresh the badge's cached last-known location (fire-and-forget); a
    // failure here self-corrects on the next sample.
    let pool = state.pool.clone();
    let badge_id = request.badge_id;
    let (latitude, longitude) = (request.latitude, request.longitude);
    tokio::spawn(async move {
        let repo = BadgeRepository::new(pool);
        if let Err(e) = repo
            .set_last_location(badge_id, latitude, longitude, recorded_at)
            .await
        {
            tracing::warn!("Failed to refresh badge location cache: {}", e);
        }
    });

    info!(
        badge_id = %request.badge_id,
        latitude = request.latitude,
        longitude = request.longitude,
        "Location sample recorded"
    );

    Ok(Json(RecordSampleResponse {
        success: true,
        sample,
    }))
}

/// Newest samples for a badge, descending by recorded_at.
///
/// GET /api/v1/badges/:badge_id/locations
pub async fn get_sample_history(
    State(state): State<AppState>,
    Path(badge_id): Path<Uuid>,
    Query(query): Query<SampleHistoryQuery>,
) -> Result<Json<SampleHistoryResponse>, ApiError> {
    let badge_repo = BadgeRepository::new(state.pool.clone());
    badge_repo
        .find_by_id(badge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Badge not found".to_string()))?;

    let limit = query.effective_limit();
    let sample_repo = LocationSampleRepository::new(state.pool.clone());
    let samples: Vec<SampleHistoryItem> = sample_repo
        .find_most_recent(badge_id, limit)
        .await?
        .into_iter()
        .map(|entity| {
            let sample: LocationSample = entity.into();
            sample.into()
        })
        .collect();

    info!(badge_id = %badge_id, count = samples.len(), "Sample history retrieved");

    Ok(Json(SampleHistoryResponse {
        count: samples.len(),
        samples,
    }))
}

/// Change-feed subscription for a badge, as Server-Sent Events.
///
/// GET /api/v1/badges/:badge_id/locations/feed
pub async fn sample_feed(
    State(state): State<AppState>,
    Path(badge_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let badge_repo = BadgeRepository::new(state.pool.clone());
    badge_repo
        .find_by_id(badge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Badge not found".to_string()))?;

    let rx = state.change_feed.subscribe(badge_id);
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(sample) => Some(Event::default().event("insert").json_data(&sample)),
        // A lagged subscriber resynchronizes from the next insert.
        Err(BroadcastStreamRecvError::Lagged(_)) => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
