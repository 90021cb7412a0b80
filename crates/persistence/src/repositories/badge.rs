//! Badge repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use domain::models::badge::{SurveyorBadge, UpdateBadgeRequest};
use domain::services::stores::{BadgeRegistry, StoreError};

use crate::entities::SurveyorBadgeEntity;

/// Repository for badge-related database operations.
#[derive(Clone)]
pub struct BadgeRepository {
    pool: PgPool,
}

impl BadgeRepository {
    /// Creates a new BadgeRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a badge by its UUID.
    pub async fn find_by_id(
        &self,
        badge_id: Uuid,
    ) -> Result<Option<SurveyorBadgeEntity>, sqlx::Error> {
        sqlx::query_as::<_, SurveyorBadgeEntity>(
            r#"
            SELECT id, surveyor_id, owner_id, status, last_latitude, last_longitude,
                   last_location_at, forms_submitted, created_at, updated_at
            FROM surveyor_badges
            WHERE id = $1
            "#,
        )
        .bind(badge_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Refresh the badge's cached last-known location.
    /// Returns the number of rows affected (0 if badge not found).
    pub async fn set_last_location(
        &self,
        badge_id: Uuid,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE surveyor_badges
            SET last_latitude = $2, last_longitude = $3, last_location_at = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(badge_id)
        .bind(latitude)
        .bind(longitude)
        .bind(at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Apply a partial update to a badge.
    ///
    /// The forms-submitted counter never decreases; the location cache
    /// fields are written as a unit (the handler rejects partial pairs).
    /// Returns the updated row, or None if the badge does not exist.
    pub async fn apply_update(
        &self,
        badge_id: Uuid,
        update: &UpdateBadgeRequest,
    ) -> Result<Option<SurveyorBadgeEntity>, sqlx::Error> {
        sqlx::query_as::<_, SurveyorBadgeEntity>(
            r#"
            UPDATE surveyor_badges
            SET last_latitude = COALESCE($2, last_latitude),
                last_longitude = COALESCE($3, last_longitude),
                last_location_at = COALESCE($4, last_location_at),
                forms_submitted = GREATEST(forms_submitted, COALESCE($5, forms_submitted)),
                updated_at = $6
            WHERE id = $1
            RETURNING id, surveyor_id, owner_id, status, last_latitude, last_longitude,
                      last_location_at, forms_submitted, created_at, updated_at
            "#,
        )
        .bind(badge_id)
        .bind(update.last_latitude)
        .bind(update.last_longitude)
        .bind(update.last_location_at)
        .bind(update.forms_submitted)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
    }
}

#[async_trait]
impl BadgeRegistry for BadgeRepository {
    async fn find(&self, badge_id: Uuid) -> Result<Option<SurveyorBadge>, StoreError> {
        Ok(self.find_by_id(badge_id).await?.map(Into::into))
    }

    async fn update_last_location(
        &self,
        badge_id: Uuid,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let rows = self.set_last_location(badge_id, latitude, longitude, at).await?;
        if rows == 0 {
            return Err(StoreError::NotFound("badge"));
        }
        Ok(())
    }
}
