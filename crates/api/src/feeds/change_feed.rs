//! Change feed: per-badge fan-out of newly inserted location samples.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use domain::models::sample::LocationSample;
use domain::services::stores::ChangeFeedPublisher;

/// Fan-out hub for location store inserts, one channel per badge.
///
/// Publishing never blocks; subscribers that fall behind see a lagged
/// receive and resynchronize from the next event.
#[derive(Clone)]
pub struct ChangeFeedHub {
    channels: Arc<Mutex<HashMap<Uuid, broadcast::Sender<LocationSample>>>>,
    capacity: usize,
}

impl ChangeFeedHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Subscribe to inserts for one badge.
    pub fn subscribe(&self, badge_id: Uuid) -> broadcast::Receiver<LocationSample> {
        let mut channels = self.channels.lock().expect("channels lock");
        channels
            .entry(badge_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers for one badge.
    pub fn subscriber_count(&self, badge_id: Uuid) -> usize {
        self.channels
            .lock()
            .expect("channels lock")
            .get(&badge_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drops channels that no longer have any subscriber. Returns the
    /// number of channels removed.
    pub fn prune(&self) -> usize {
        let mut channels = self.channels.lock().expect("channels lock");
        let before = channels.len();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        before - channels.len()
    }
}

impl ChangeFeedPublisher for ChangeFeedHub {
    fn publish(&self, sample: &LocationSample) {
        let tx = {
            let channels = self.channels.lock().expect("channels lock");
            channels.get(&sample.badge_id).cloned()
        };
        if let Some(tx) = tx {
            match tx.send(sample.clone()) {
                Ok(receivers) => {
                    debug!(badge_id = %sample.badge_id, receivers, "Sample published to change feed");
                }
                Err(_) => {
                    debug!(badge_id = %sample.badge_id, "No change feed subscribers");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(badge_id: Uuid, id: i64) -> LocationSample {
        LocationSample {
            id,
            badge_id,
            surveyor_id: "SRV-001".to_string(),
            latitude: 1.0,
            longitude: 2.0,
            recorded_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_published_sample() {
        let hub = ChangeFeedHub::new(8);
        let badge_id = Uuid::new_v4();
        let mut rx = hub.subscribe(badge_id);

        hub.publish(&sample(badge_id, 1));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, 1);
        assert_eq!(received.badge_id, badge_id);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = ChangeFeedHub::new(8);
        hub.publish(&sample(Uuid::new_v4(), 1));
    }

    #[tokio::test]
    async fn test_channels_are_scoped_per_badge() {
        let hub = ChangeFeedHub::new(8);
        let watched = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut rx = hub.subscribe(watched);

        hub.publish(&sample(other, 1));
        hub.publish(&sample(watched, 2));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, 2);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_fan_out() {
        let hub = ChangeFeedHub::new(8);
        let badge_id = Uuid::new_v4();
        let mut rx1 = hub.subscribe(badge_id);
        let mut rx2 = hub.subscribe(badge_id);

        hub.publish(&sample(badge_id, 5));

        assert_eq!(rx1.recv().await.unwrap().id, 5);
        assert_eq!(rx2.recv().await.unwrap().id, 5);
        assert_eq!(hub.subscriber_count(badge_id), 2);
    }

    #[tokio::test]
    async fn test_prune_removes_abandoned_channels() {
        let hub = ChangeFeedHub::new(8);
        let badge_id = Uuid::new_v4();
        let rx = hub.subscribe(badge_id);
        assert_eq!(hub.prune(), 0);

        drop(rx);
        assert_eq!(hub.prune(), 1);
        assert_eq!(hub.subscriber_count(badge_id), 0);
    }
}
