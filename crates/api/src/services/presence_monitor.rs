//! Per-pair presence monitors.
//!
//! Each monitor owns the live derivation for one (badge, surveyor) pair:
//! it subscribes to the presence channel and the change feed, issues the
//! one-shot freshness read, and folds every event through the presence
//! reducer into a watch channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use domain::models::badge::SurveyorBadge;
use domain::models::presence::PresenceView;
use domain::services::presence::{PresenceConfig, PresenceEvent, PresenceState};
use domain::services::stores::LocationStore;

use crate::feeds::{ChangeFeedHub, PresenceFeedEvent, PresenceFeedHub};

/// Live online-status derivation for one badge/surveyor pair.
pub struct PresenceMonitor {
    badge_id: Uuid,
    surveyor_id: String,
    view_rx: watch::Receiver<PresenceView>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PresenceMonitor {
    /// Spawns the monitor: subscribes both feeds, folds the initial
    /// membership snapshot, then derives continuously until stopped.
    pub fn spawn(
        badge_id: Uuid,
        surveyor_id: String,
        seed_last_seen: Option<chrono::DateTime<Utc>>,
        config: PresenceConfig,
        store: Arc<dyn LocationStore>,
        presence_feed: &PresenceFeedHub,
        change_feed: &ChangeFeedHub,
    ) -> Arc<Self> {
        let (members, mut presence_rx) = presence_feed.subscribe(&surveyor_id);
        let mut change_rx = change_feed.subscribe(badge_id);

        let mut state = PresenceState::new(config, seed_last_seen);
        let initial = state.apply(PresenceEvent::Sync {
            members,
            at: Utc::now(),
        });

        let (view_tx, view_rx) = watch::channel(initial);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task_badge_id = badge_id;
        let task = tokio::spawn(async move {
            // One-shot freshness read: a recent sample proves activity even
            // before presence membership is established (e.g. right after a
            // page reload). A failed read leaves the seeded state intact.
            match store.latest(task_badge_id).await {
                Ok(latest) => {
                    let view = state.apply(PresenceEvent::FreshnessChecked {
                        recorded_at: latest.map(|s| s.recorded_at),
                        at: Utc::now(),
                    });
                    let _ = view_tx.send(view);
                }
                Err(e) => {
                    warn!(badge_id = %task_badge_id, error = %e, "Presence freshness check failed");
                }
            }

            loop {
                tokio::select! {
                    event = presence_rx.recv() => match event {
                        Ok(event) => {
                            let view = state.apply(feed_event_to_domain(event));
                            let _ = view_tx.send(view);
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(badge_id = %task_badge_id, skipped, "Presence feed lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    sample = change_rx.recv() => match sample {
                        Ok(sample) => {
                            let view = state.apply(PresenceEvent::SampleInserted {
                                recorded_at: sample.recorded_at,
                            });
                            let _ = view_tx.send(view);
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            debug!(badge_id = %task_badge_id, skipped, "Change feed lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            // Both feed receivers drop here, releasing the subscriptions.
        });

        Arc::new(Self {
            badge_id,
            surveyor_id,
            view_rx,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        })
    }

    pub fn badge_id(&self) -> Uuid {
        self.badge_id
    }

    pub fn surveyor_id(&self) -> &str {
        &self.surveyor_id
    }

    /// Current derived view.
    pub fn view(&self) -> PresenceView {
        *self.view_rx.borrow()
    }

    /// Watch channel for derived-view updates.
    pub fn subscribe(&self) -> watch::Receiver<PresenceView> {
        self.view_rx.clone()
    }

    /// Stops the derivation task and releases both feed subscriptions.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().expect("task lock").take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(badge_id = %self.badge_id, "Presence monitor task panicked: {}", e);
            }
        }
    }
}

fn feed_event_to_domain(event: PresenceFeedEvent) -> PresenceEvent {
    let at = Utc::now();
    match event {
        PresenceFeedEvent::Sync { members } => PresenceEvent::Sync { members, at },
        PresenceFeedEvent::Join { members } => PresenceEvent::Join { members, at },
        PresenceFeedEvent::Leave { members } => PresenceEvent::Leave { members, at },
    }
}

type MonitorKey = (Uuid, String);

/// Registry of presence monitors, keyed by (badge, surveyor).
///
/// Monitors are spawned on first request and pruned once nothing outside
/// the registry references them.
#[derive(Clone)]
pub struct PresenceMonitorRegistry {
    monitors: Arc<tokio::sync::Mutex<HashMap<MonitorKey, Arc<PresenceMonitor>>>>,
    config: PresenceConfig,
    store: Arc<dyn LocationStore>,
    presence_feed: PresenceFeedHub,
    change_feed: ChangeFeedHub,
}

impl PresenceMonitorRegistry {
    pub fn new(
        config: PresenceConfig,
        store: Arc<dyn LocationStore>,
        presence_feed: PresenceFeedHub,
        change_feed: ChangeFeedHub,
    ) -> Self {
        Self {
            monitors: Arc::new(tokio::sync::Mutex::new(HashMap::new())),
            config,
            store,
            presence_feed,
            change_feed,
        }
    }

    /// Returns the monitor for the pair, spawning it on first use. The
    /// badge's cached `last_location_at` seeds "last seen".
    pub async fn get_or_spawn(
        &self,
        badge: &SurveyorBadge,
        surveyor_id: &str,
    ) -> Arc<PresenceMonitor> {
        let key = (badge.id, surveyor_id.to_string());
        let mut monitors = self.monitors.lock().await;
        if let Some(monitor) = monitors.get(&key) {
            return Arc::clone(monitor);
        }

        let monitor = PresenceMonitor::spawn(
            badge.id,
            surveyor_id.to_string(),
            badge.last_location_at,
            self.config,
            Arc::clone(&self.store),
            &self.presence_feed,
            &self.change_feed,
        );
        monitors.insert(key, Arc::clone(&monitor));
        monitor
    }

    /// Number of live monitors.
    pub async fn len(&self) -> usize {
        self.monitors.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.monitors.lock().await.is_empty()
    }

    /// Stops and removes monitors referenced by nobody but the registry.
    /// Returns the number removed.
    pub async fn prune_idle(&self) -> usize {
        let mut monitors = self.monitors.lock().await;
        let idle: Vec<MonitorKey> = monitors
            .iter()
            .filter(|(_, monitor)| Arc::strong_count(monitor) == 1)
            .map(|(key, _)| key.clone())
            .collect();

        let mut removed = 0;
        for key in idle {
            if let Some(monitor) = monitors.remove(&key) {
                monitor.stop().await;
                removed += 1;
            }
        }
        removed
    }

    /// Stops every monitor; used during graceful shutdown.
    pub async fn shutdown(&self) {
        let mut monitors = self.monitors.lock().await;
        for (_, monitor) in monitors.drain() {
            monitor.stop().await;
        }
    }
}
