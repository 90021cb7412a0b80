//! Per-badge tracking sessions.
//!
//! A session wires one tracking controller to its device-fed geolocation
//! source and keeps the controller's history synchronized with the change
//! feed, so samples written by other devices tracking the same badge show
//! up in the session view.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use domain::models::badge::SurveyorBadge;
use domain::services::geolocation::{GeolocationService, PositionFix};
use domain::services::stores::{BadgeRegistry, ChangeFeedPublisher, LocationStore};
use domain::services::tracking::{TrackingConfig, TrackingController, TrackingSnapshot};

use crate::feeds::ChangeFeedHub;
use crate::services::device_feed::DeviceFeedGeolocation;

/// Outcome of a device fix push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixOutcome {
    Accepted,
    NoSession,
    NotTracking,
}

struct TrackingSession {
    controller: Arc<TrackingController>,
    device_feed: Arc<DeviceFeedGeolocation>,
    feed_task: JoinHandle<()>,
}

/// Registry of tracking sessions, one per badge at a time.
#[derive(Clone)]
pub struct TrackingSessionManager {
    sessions: Arc<tokio::sync::Mutex<HashMap<Uuid, TrackingSession>>>,
    config: TrackingConfig,
    ingest_capacity: usize,
    store: Arc<dyn LocationStore>,
    registry: Arc<dyn BadgeRegistry>,
    change_feed: ChangeFeedHub,
}

impl TrackingSessionManager {
    pub fn new(
        config: TrackingConfig,
        ingest_capacity: usize,
        store: Arc<dyn LocationStore>,
        registry: Arc<dyn BadgeRegistry>,
        change_feed: ChangeFeedHub,
    ) -> Self {
        Self {
            sessions: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            config,
            ingest_capacity,
            store,
            registry,
            change_feed,
        }
    }

    /// Starts (or resumes) tracking for a badge and returns the session
    /// snapshot. On first start the visible history is loaded from the
    /// store before capture begins.
    pub async fn start(&self, badge: &SurveyorBadge) -> TrackingSnapshot {
        let mut sessions = self.sessions.lock().await;

        if let Some(session) = sessions.get(&badge.id) {
            session.controller.clone().start_tracking().await;
            return session.controller.snapshot();
        }

        let device_feed = Arc::new(DeviceFeedGeolocation::new(self.ingest_capacity));
        let controller = Arc::new(TrackingController::new(
            badge.id,
            badge.surveyor_id.clone(),
            self.config,
            Arc::clone(&device_feed) as Arc<dyn GeolocationService>,
            Arc::clone(&self.store),
            Arc::clone(&self.registry),
            Arc::new(self.change_feed.clone()) as Arc<dyn ChangeFeedPublisher>,
        ));

        controller.fetch_locations().await;
        Arc::clone(&controller).start_tracking().await;

        let mut change_rx = self.change_feed.subscribe(badge.id);
        let feed_controller = Arc::clone(&controller);
        let feed_task = tokio::spawn(async move {
            loop {
                match change_rx.recv().await {
                    Ok(sample) => feed_controller.apply_external_insert(sample),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Tracking session change feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let snapshot = controller.snapshot();
        sessions.insert(
            badge.id,
            TrackingSession {
                controller,
                device_feed,
                feed_task,
            },
        );
        snapshot
    }

    /// Stops capture for a badge. The session view survives the stop so
    /// history and counters stay readable; a missing session is a no-op.
    pub async fn stop(&self, badge_id: Uuid) -> Option<TrackingSnapshot> {
        let sessions = self.sessions.lock().await;
        match sessions.get(&badge_id) {
            Some(session) => {
                session.controller.stop_tracking().await;
                Some(session.controller.snapshot())
            }
            None => None,
        }
    }

    /// Forwards one device fix into the badge's active capture.
    pub async fn push_fix(&self, badge_id: Uuid, fix: PositionFix) -> FixOutcome {
        let sessions = self.sessions.lock().await;
        match sessions.get(&badge_id) {
            None => FixOutcome::NoSession,
            Some(session) => {
                if !session.controller.is_tracking() {
                    return FixOutcome::NotTracking;
                }
                if session.device_feed.push_fix(fix).await {
                    FixOutcome::Accepted
                } else {
                    FixOutcome::NotTracking
                }
            }
        }
    }

    /// Session snapshot for a badge, if a session exists.
    pub async fn snapshot(&self, badge_id: Uuid) -> Option<TrackingSnapshot> {
        let sessions = self.sessions.lock().await;
        Some(sessions.get(&badge_id)?.controller.snapshot())
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Stops every session and its feed forwarder; used during graceful
    /// shutdown.
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.lock().await;
        for (_, session) in sessions.drain() {
            session.controller.stop_tracking().await;
            session.feed_task.abort();
        }
    }
}
