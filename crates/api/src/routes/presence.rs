//! Presence endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use domain::models::presence::PresenceSnapshotResponse;
use domain::models::SurveyorBadge;
use persistence::repositories::BadgeRepository;

use crate::app::AppState;
use crate::error::ApiError;
use crate::feeds::PresenceFeedEvent;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceQuery {
    /// Defaults to the badge's own surveyor id.
    pub surveyor_id: Option<String>,
}

/// Current derived presence for a badge/surveyor pair.
///
/// GET /api/v1/badges/:badge_id/presence
pub async fn get_presence(
    State(state): State<AppState>,
    Path(badge_id): Path<Uuid>,
    Query(query): Query<PresenceQuery>,
) -> Result<Json<PresenceSnapshotResponse>, ApiError> {
    let repo = BadgeRepository::new(state.pool.clone());
    let badge = repo
        .find_by_id(badge_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Badge not found".to_string()))?;

    let badge: SurveyorBadge = badge.into();
    let surveyor_id = query
        .surveyor_id
        .unwrap_or_else(|| badge.surveyor_id.clone());

    let monitor = state.monitors.get_or_spawn(&badge, &surveyor_id).await;
    Ok(Json(PresenceSnapshotResponse::new(
        badge_id,
        surveyor_id,
        monitor.view(),
    )))
}

/// Join a surveyor's presence channel, as Server-Sent Events.
///
/// GET /api/v1/surveyors/:surveyor_id/presence/feed
///
/// The open connection is the channel membership: the client joins on
/// connect and leaves when the stream drops. The first event is a `sync`
/// membership snapshot.
pub async fn presence_feed(
    State(state): State<AppState>,
    Path(surveyor_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    shared::validation::validate_surveyor_id(&surveyor_id)
        .map_err(|_| ApiError::Validation("Invalid surveyor id".to_string()))?;

    // Subscribe before joining so the client observes its own join event.
    let (members, rx) = state.presence_feed.subscribe(&surveyor_id);
    let membership = state.presence_feed.join(&surveyor_id);

    let sync = Event::default()
        .event("presence")
        .json_data(&PresenceFeedEvent::Sync { members });

    let events = BroadcastStream::new(rx).filter_map(move |result| {
        // The membership guard lives as long as the stream; dropping the
        // connection emits the leave event.
        let _held = &membership;
        match result {
            Ok(event) => Some(Event::default().event("presence").json_data(&event)),
            Err(BroadcastStreamRecvError::Lagged(_)) => None,
        }
    });

    let stream = tokio_stream::once(sync).chain(events);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
