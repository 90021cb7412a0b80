//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use domain::models::sample::LocationSample;
use domain::services::stores::{LocationStore, NewLocationSample, StoreError};

/// In-memory location store standing in for the Postgres-backed
/// repository.
#[derive(Default)]
pub struct MemoryLocationStore {
    rows: Mutex<Vec<LocationSample>>,
    next_id: AtomicI64,
}

impl MemoryLocationStore {
    /// Inserts a row directly, bypassing the trait, and returns it.
    pub fn seed_sample(&self, badge_id: Uuid, recorded_at: DateTime<Utc>) -> LocationSample {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let sample = LocationSample {
            id,
            badge_id,
            surveyor_id: "SRV-000".to_string(),
            latitude: 48.2082,
            longitude: 16.3738,
            recorded_at,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(sample.clone());
        sample
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl LocationStore for MemoryLocationStore {
    async fn insert_sample(&self, sample: NewLocationSample) -> Result<LocationSample, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let row = LocationSample {
            id,
            badge_id: sample.badge_id,
            surveyor_id: sample.surveyor_id,
            latitude: sample.latitude,
            longitude: sample.longitude,
            recorded_at: sample.recorded_at,
            created_at: Utc::now(),
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn most_recent(
        &self,
        badge_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LocationSample>, StoreError> {
        let mut rows: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.badge_id == badge_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn latest(&self, badge_id: Uuid) -> Result<Option<LocationSample>, StoreError> {
        Ok(self.most_recent(badge_id, 1).await?.into_iter().next())
    }
}
