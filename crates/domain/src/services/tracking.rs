//! Tracking controller: active device-location capture for one badge.
//!
//! The controller owns the geolocation watch handle for the lifetime of a
//! tracking session and releases it on stop, on a watch error, and on
//! drop. Sample persistence is two independent best-effort writes (badge
//! cache refresh + sample insert); partial failure is logged and the
//! optimistic local state keeps the device reading, since the next sample
//! self-corrects the cache.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::sample::LocationSample;
use crate::services::geolocation::{GeolocationService, PositionFix, WatchOptions};
use crate::services::stores::{
    BadgeRegistry, ChangeFeedPublisher, LocationStore, NewLocationSample,
};

/// Tuning for a tracking controller.
#[derive(Debug, Clone, Copy)]
pub struct TrackingConfig {
    /// Cap on the in-memory history window (view cap, not a store limit).
    pub history_limit: usize,
    /// Options for the continuous geolocation watch.
    pub watch: WatchOptions,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            watch: WatchOptions::default(),
        }
    }
}

/// Read model of a controller's current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingSnapshot {
    pub tracking: bool,
    pub current_position: Option<PositionFix>,
    pub last_update: Option<DateTime<Utc>>,
    pub history: Vec<LocationSample>,
    pub samples_recorded: u64,
}

#[derive(Debug, Default)]
struct TrackingState {
    tracking: bool,
    current_position: Option<PositionFix>,
    last_update: Option<DateTime<Utc>>,
    history: VecDeque<LocationSample>,
    samples_recorded: u64,
}

impl TrackingState {
    fn replace_history(&mut self, samples: Vec<LocationSample>, cap: usize) {
        self.history = samples.into_iter().take(cap).collect();
        if let Some(newest) = self.history.front() {
            self.current_position = Some(PositionFix {
                latitude: newest.latitude,
                longitude: newest.longitude,
                recorded_at: newest.recorded_at,
            });
            self.last_update = Some(newest.recorded_at);
        }
    }

    fn prepend(&mut self, sample: LocationSample, cap: usize) {
        if self.history.iter().any(|s| s.id == sample.id) {
            return;
        }
        self.history.push_front(sample);
        self.history.truncate(cap);
    }

    fn snapshot(&self) -> TrackingSnapshot {
        TrackingSnapshot {
            tracking: self.tracking,
            current_position: self.current_position,
            last_update: self.last_update,
            history: self.history.iter().cloned().collect(),
            samples_recorded: self.samples_recorded,
        }
    }
}

#[derive(Default)]
struct Lifecycle {
    task: Option<JoinHandle<()>>,
    stop_tx: Option<watch::Sender<bool>>,
}

/// Manages the lifecycle of active device-location capture for one badge.
///
/// States are Idle (no watch held) and Tracking (watch held, each accepted
/// fix persisted). Single instance per badge at a time.
pub struct TrackingController {
    badge_id: Uuid,
    surveyor_id: String,
    config: TrackingConfig,
    geolocation: Arc<dyn GeolocationService>,
    store: Arc<dyn LocationStore>,
    registry: Arc<dyn BadgeRegistry>,
    feed: Arc<dyn ChangeFeedPublisher>,
    state: Mutex<TrackingState>,
    lifecycle: tokio::sync::Mutex<Lifecycle>,
}

impl TrackingController {
    pub fn new(
        badge_id: Uuid,
        surveyor_id: impl Into<String>,
        config: TrackingConfig,
        geolocation: Arc<dyn GeolocationService>,
        store: Arc<dyn LocationStore>,
        registry: Arc<dyn BadgeRegistry>,
        feed: Arc<dyn ChangeFeedPublisher>,
    ) -> Self {
        Self {
            badge_id,
            surveyor_id: surveyor_id.into(),
            config,
            geolocation,
            store,
            registry,
            feed,
            state: Mutex::new(TrackingState::default()),
            lifecycle: tokio::sync::Mutex::new(Lifecycle::default()),
        }
    }

    pub fn badge_id(&self) -> Uuid {
        self.badge_id
    }

    pub fn surveyor_id(&self) -> &str {
        &self.surveyor_id
    }

    pub fn is_tracking(&self) -> bool {
        self.state.lock().expect("state lock").tracking
    }

    pub fn snapshot(&self) -> TrackingSnapshot {
        self.state.lock().expect("state lock").snapshot()
    }

    /// Loads the newest samples for the badge into the visible history.
    ///
    /// Idempotent; a read failure is logged and leaves prior state
    /// untouched (no partial overwrite).
    pub async fn fetch_locations(&self) {
        let limit = self.config.history_limit as i64;
        match self.store.most_recent(self.badge_id, limit).await {
            Ok(samples) => {
                let mut state = self.state.lock().expect("state lock");
                state.replace_history(samples, self.config.history_limit);
            }
            Err(e) => {
                warn!(badge_id = %self.badge_id, error = %e, "Failed to fetch location history");
            }
        }
    }

    /// Starts continuous capture. A no-op when already tracking; if the
    /// host has no usable geolocation the failure is logged and the
    /// controller stays Idle.
    pub async fn start_tracking(self: Arc<Self>) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.is_tracking() {
            return;
        }

        let mut position_watch = match self.geolocation.watch(self.config.watch).await {
            Ok(w) => w,
            Err(e) => {
                warn!(badge_id = %self.badge_id, error = %e, "Geolocation watch unavailable");
                return;
            }
        };

        {
            let mut state = self.state.lock().expect("state lock");
            state.tracking = true;
            state.samples_recorded = 0;
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let controller = Arc::clone(&self);
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = position_watch.next() => match event {
                        Some(Ok(fix)) => controller.record_fix(fix).await,
                        Some(Err(e)) => {
                            warn!(
                                badge_id = %controller.badge_id,
                                error = %e,
                                "Geolocation watch error; stopping capture"
                            );
                            controller.clear_tracking();
                            break;
                        }
                        None => {
                            debug!(badge_id = %controller.badge_id, "Geolocation watch closed");
                            controller.clear_tracking();
                            break;
                        }
                    },
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            // The watch handle drops here, releasing the subscription on
            // every exit path, error exits included.
        });

        lifecycle.task = Some(task);
        lifecycle.stop_tx = Some(stop_tx);
    }

    /// Stops continuous capture and returns to Idle. Safe to call when
    /// already Idle.
    pub async fn stop_tracking(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        self.clear_tracking();

        if let Some(stop_tx) = lifecycle.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(task) = lifecycle.task.take() {
            if let Err(e) = task.await {
                warn!(badge_id = %self.badge_id, "Tracking task panicked: {}", e);
            }
        }
    }

    /// Accepts one device fix: optimistic local update, then two
    /// independent best-effort writes.
    pub async fn record_fix(&self, fix: PositionFix) {
        {
            let mut state = self.state.lock().expect("state lock");
            state.current_position = Some(fix);
            state.last_update = Some(fix.recorded_at);
            state.samples_recorded += 1;
        }

        if let Err(e) = self
            .registry
            .update_last_location(self.badge_id, fix.latitude, fix.longitude, fix.recorded_at)
            .await
        {
            warn!(badge_id = %self.badge_id, error = %e, "Failed to refresh badge location cache");
        }

        match self
            .store
            .insert_sample(NewLocationSample {
                badge_id: self.badge_id,
                surveyor_id: self.surveyor_id.clone(),
                latitude: fix.latitude,
                longitude: fix.longitude,
                recorded_at: fix.recorded_at,
            })
            .await
        {
            Ok(sample) => self.feed.publish(&sample),
            Err(e) => {
                warn!(badge_id = %self.badge_id, error = %e, "Failed to insert location sample");
            }
        }
    }

    /// Folds an externally-inserted sample (another device tracking the
    /// same badge, or this session's own write echoed back) into the
    /// bounded history window.
    pub fn apply_external_insert(&self, sample: LocationSample) {
        let mut state = self.state.lock().expect("state lock");
        state.prepend(sample, self.config.history_limit);
    }

    fn clear_tracking(&self) {
        self.state.lock().expect("state lock").tracking = false;
    }
}

impl Drop for TrackingController {
    fn drop(&mut self) {
        if let Ok(mut lifecycle) = self.lifecycle.try_lock() {
            if let Some(stop_tx) = lifecycle.stop_tx.take() {
                let _ = stop_tx.send(true);
            }
            if let Some(task) = lifecycle.task.take() {
                task.abort();
            }
        }
    }
}
