//! Background job that prunes idle presence monitors and feed channels.

use std::time::Duration;

use super::scheduler::Job;
use crate::feeds::{ChangeFeedHub, PresenceFeedHub};
use crate::services::PresenceMonitorRegistry;

/// Drops presence monitors nobody references anymore and feed channels
/// with no remaining subscribers, so abandoned badge/surveyor pairs do
/// not accumulate live tasks.
pub struct PruneFeedsJob {
    monitors: PresenceMonitorRegistry,
    change_feed: ChangeFeedHub,
    presence_feed: PresenceFeedHub,
}

impl PruneFeedsJob {
    pub fn new(
        monitors: PresenceMonitorRegistry,
        change_feed: ChangeFeedHub,
        presence_feed: PresenceFeedHub,
    ) -> Self {
        Self {
            monitors,
            change_feed,
            presence_feed,
        }
    }
}

#[async_trait::async_trait]
impl Job for PruneFeedsJob {
    fn name(&self) -> &'static str {
        "prune_feeds"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn execute(&self) -> Result<(), String> {
        let monitors = self.monitors.prune_idle().await;
        let channels = self.change_feed.prune() + self.presence_feed.prune();
        if monitors > 0 || channels > 0 {
            tracing::info!(monitors, channels, "Pruned idle feed resources");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::services::presence::PresenceConfig;
    use domain::services::stores::{LocationStore, NewLocationSample, StoreError};
    use std::sync::Arc;
    use uuid::Uuid;

    struct EmptyStore;

    #[async_trait::async_trait]
    impl LocationStore for EmptyStore {
        async fn insert_sample(
            &self,
            _sample: NewLocationSample,
        ) -> Result<domain::models::LocationSample, StoreError> {
            Err(StoreError::Unavailable("read-only".to_string()))
        }

        async fn most_recent(
            &self,
            _badge_id: Uuid,
            _limit: i64,
        ) -> Result<Vec<domain::models::LocationSample>, StoreError> {
            Ok(vec![])
        }

        async fn latest(
            &self,
            _badge_id: Uuid,
        ) -> Result<Option<domain::models::LocationSample>, StoreError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_prune_job_executes_cleanly() {
        let change_feed = ChangeFeedHub::new(8);
        let presence_feed = PresenceFeedHub::new(8);
        let monitors = PresenceMonitorRegistry::new(
            PresenceConfig::default(),
            Arc::new(EmptyStore),
            presence_feed.clone(),
            change_feed.clone(),
        );

        let rx = change_feed.subscribe(Uuid::new_v4());
        drop(rx);

        let job = PruneFeedsJob::new(monitors, change_feed, presence_feed);
        assert_eq!(job.name(), "prune_feeds");
        assert!(job.execute().await.is_ok());
    }
}
