//! Location sample repository for database operations.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::sample::LocationSample;
use domain::services::stores::{LocationStore, NewLocationSample, StoreError};

use crate::entities::LocationSampleEntity;

/// Repository for location sample database operations.
///
/// The location_samples table is append-only: rows are inserted and read,
/// never updated or deleted by the application.
#[derive(Clone)]
pub struct LocationSampleRepository {
    pool: PgPool,
}

impl LocationSampleRepository {
    /// Creates a new LocationSampleRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert one sample and return the stored row.
    pub async fn insert(
        &self,
        sample: &NewLocationSample,
    ) -> Result<LocationSampleEntity, sqlx::Error> {
        sqlx::query_as::<_, LocationSampleEntity>(
            r#"
            INSERT INTO location_samples (badge_id, surveyor_id, latitude, longitude, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, badge_id, surveyor_id, latitude, longitude, recorded_at, created_at
            "#,
        )
        .bind(sample.badge_id)
        .bind(&sample.surveyor_id)
        .bind(sample.latitude)
        .bind(sample.longitude)
        .bind(sample.recorded_at)
        .fetch_one(&self.pool)
        .await
    }

    /// Up to `limit` newest samples for a badge, descending by recorded_at.
    pub async fn find_most_recent(
        &self,
        badge_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LocationSampleEntity>, sqlx::Error> {
        sqlx::query_as::<_, LocationSampleEntity>(
            r#"
            SELECT id, badge_id, surveyor_id, latitude, longitude, recorded_at, created_at
            FROM location_samples
            WHERE badge_id = $1
            ORDER BY recorded_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(badge_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// The single newest sample for a badge, if any.
    pub async fn find_latest(
        &self,
        badge_id: Uuid,
    ) -> Result<Option<LocationSampleEntity>, sqlx::Error> {
        sqlx::query_as::<_, LocationSampleEntity>(
            r#"
            SELECT id, badge_id, surveyor_id, latitude, longitude, recorded_at, created_at
            FROM location_samples
            WHERE badge_id = $1
            ORDER BY recorded_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(badge_id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[async_trait]
impl LocationStore for LocationSampleRepository {
    async fn insert_sample(
        &self,
        sample: NewLocationSample,
    ) -> Result<LocationSample, StoreError> {
        Ok(self.insert(&sample).await?.into())
    }

    async fn most_recent(
        &self,
        badge_id: Uuid,
        limit: i64,
    ) -> Result<Vec<LocationSample>, StoreError> {
        Ok(self
            .find_most_recent(badge_id, limit)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    async fn latest(&self, badge_id: Uuid) -> Result<Option<LocationSample>, StoreError> {
        Ok(self.find_latest(badge_id).await?.map(Into::into))
    }
}
