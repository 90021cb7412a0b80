//! Surveyor badge entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use domain::models::badge::BadgeStatus;

/// Database row mapping for the surveyor_badges table.
#[derive(Debug, Clone, FromRow)]
pub struct SurveyorBadgeEntity {
    pub id: Uuid,
    pub surveyor_id: String,
    pub owner_id: Uuid,
    pub status: String,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_location_at: Option<DateTime<Utc>>,
    pub forms_submitted: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SurveyorBadgeEntity> for domain::models::SurveyorBadge {
    fn from(entity: SurveyorBadgeEntity) -> Self {
        let status = entity.status.parse().unwrap_or_else(|_| {
            // The status column is check-constrained; an unknown value means
            // a migration drifted. Treat the badge as unusable.
            tracing::warn!(badge_id = %entity.id, status = %entity.status, "Unknown badge status");
            BadgeStatus::Expired
        });
        Self {
            id: entity.id,
            surveyor_id: entity.surveyor_id,
            owner_id: entity.owner_id,
            status,
            last_latitude: entity.last_latitude,
            last_longitude: entity.last_longitude,
            last_location_at: entity.last_location_at,
            forms_submitted: entity.forms_submitted,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
