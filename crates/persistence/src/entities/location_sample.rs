//! Location sample entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the location_samples table.
#[derive(Debug, Clone, FromRow)]
pub struct LocationSampleEntity {
    pub id: i64,
    pub badge_id: Uuid,
    pub surveyor_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<LocationSampleEntity> for domain::models::LocationSample {
    fn from(entity: LocationSampleEntity) -> Self {
        Self {
            id: entity.id,
            badge_id: entity.badge_id,
            surveyor_id: entity.surveyor_id,
            latitude: entity.latitude,
            longitude: entity.longitude,
            recorded_at: entity.recorded_at,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_to_domain() {
        let entity = LocationSampleEntity {
            id: 42,
            badge_id: Uuid::new_v4(),
            surveyor_id: "SRV-001".to_string(),
            latitude: 37.7749,
            longitude: -122.4194,
            recorded_at: Utc::now(),
            created_at: Utc::now(),
        };
        let badge_id = entity.badge_id;
        let sample: domain::models::LocationSample = entity.into();
        assert_eq!(sample.id, 42);
        assert_eq!(sample.badge_id, badge_id);
        assert_eq!(sample.latitude, 37.7749);
    }
}
