//! Store collaborator contracts.
//!
//! The location store is append-only and authoritative; the badge
//! registry's location fields are a denormalized cache reconciled lazily.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::badge::SurveyorBadge;
use crate::models::sample::LocationSample;

/// Errors surfaced by store collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Fields for a new location sample row; id and creation time are
/// store-assigned.
#[derive(Debug, Clone)]
pub struct NewLocationSample {
    pub badge_id: Uuid,
    pub surveyor_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only store of location samples.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Inserts one sample and returns the stored row.
    async fn insert_sample(&self, sample: NewLocationSample)
        -> Result<LocationSample, StoreError>;

    /// Up to `limit` newest samples for a badge, descending by recorded_at.
    async fn most_recent(
        &self,
        badge_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LocationSample>, StoreError>;

    /// The single newest sample for a badge, if any.
    async fn latest(&self, badge_id: Uuid) -> Result<Option<LocationSample>, StoreError>;
}

/// Registry of surveyor badges.
#[async_trait]
pub trait BadgeRegistry: Send + Sync {
    async fn find(&self, badge_id: Uuid) -> Result<Option<SurveyorBadge>, StoreError>;

    /// Refreshes the badge's cached last-known location.
    async fn update_last_location(
        &self,
        badge_id: Uuid,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Publisher half of the change feed: every successfully inserted sample
/// fans out to live subscribers watching the badge.
pub trait ChangeFeedPublisher: Send + Sync {
    fn publish(&self, sample: &LocationSample);
}

/// Publisher that drops everything; for contexts with no live feed wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopChangeFeed;

impl ChangeFeedPublisher for NoopChangeFeed {
    fn publish(&self, _sample: &LocationSample) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::NotFound("badge");
        assert_eq!(err.to_string(), "badge not found");

        let err = StoreError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "store unavailable: connection refused");
    }

    #[test]
    fn test_store_error_from_sqlx() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_noop_feed_accepts_samples() {
        let sample = LocationSample {
            id: 1,
            badge_id: Uuid::new_v4(),
            surveyor_id: "SRV-001".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            recorded_at: Utc::now(),
            created_at: Utc::now(),
        };
        NoopChangeFeed.publish(&sample);
    }
}
