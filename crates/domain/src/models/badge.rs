//! Surveyor badge domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Badge lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeStatus {
    Active,
    Suspended,
    Expired,
}

impl BadgeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for BadgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BadgeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "suspended" => Ok(Self::Suspended),
            "expired" => Ok(Self::Expired),
            _ => Err(format!("Invalid badge status: {}", s)),
        }
    }
}

/// Denormalized last-known location carried on a badge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

/// Represents a surveyor badge record in the system.
///
/// The `last_*` fields cache the newest location sample for quick map
/// rendering; the location store row remains authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyorBadge {
    pub id: Uuid,
    pub surveyor_id: String,
    pub owner_id: Uuid,
    pub status: BadgeStatus,
    pub last_latitude: Option<f64>,
    pub last_longitude: Option<f64>,
    pub last_location_at: Option<DateTime<Utc>>,
    pub forms_submitted: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SurveyorBadge {
    /// The cached location pair. Coordinates and timestamp are set together
    /// or not at all; a partially-populated cache reads as absent.
    pub fn last_location(&self) -> Option<LastLocation> {
        match (
            self.last_latitude,
            self.last_longitude,
            self.last_location_at,
        ) {
            (Some(latitude), Some(longitude), Some(timestamp)) => Some(LastLocation {
                latitude,
                longitude,
                timestamp,
            }),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BadgeStatus::Active
    }
}

/// Partial-update payload for a badge.
///
/// PATCH /api/v1/badges/{badge_id}
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBadgeRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub last_latitude: Option<f64>,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub last_longitude: Option<f64>,

    pub last_location_at: Option<DateTime<Utc>>,

    #[validate(range(min = 0))]
    pub forms_submitted: Option<i64>,
}

impl UpdateBadgeRequest {
    pub fn is_empty(&self) -> bool {
        self.last_latitude.is_none()
            && self.last_longitude.is_none()
            && self.last_location_at.is_none()
            && self.forms_submitted.is_none()
    }

    /// The location cache fields must be updated as a unit.
    pub fn location_fields_consistent(&self) -> bool {
        let present = [
            self.last_latitude.is_some(),
            self.last_longitude.is_some(),
            self.last_location_at.is_some(),
        ];
        present.iter().all(|p| *p) || present.iter().all(|p| !*p)
    }
}

/// Response payload for badge reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeResponse {
    pub id: Uuid,
    pub surveyor_id: String,
    pub status: BadgeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_location: Option<LastLocation>,
    pub forms_submitted: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SurveyorBadge> for BadgeResponse {
    fn from(badge: SurveyorBadge) -> Self {
        let last_location = badge.last_location();
        Self {
            id: badge.id,
            surveyor_id: badge.surveyor_id,
            status: badge.status,
            last_location,
            forms_submitted: badge.forms_submitted,
            created_at: badge.created_at,
            updated_at: badge.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_badge() -> SurveyorBadge {
        SurveyorBadge {
            id: Uuid::new_v4(),
            surveyor_id: "SRV-001".to_string(),
            owner_id: Uuid::new_v4(),
            status: BadgeStatus::Active,
            last_latitude: Some(37.7749),
            last_longitude: Some(-122.4194),
            last_location_at: Some(Utc::now()),
            forms_submitted: 12,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_badge_status_from_str() {
        assert_eq!("active".parse::<BadgeStatus>().unwrap(), BadgeStatus::Active);
        assert_eq!(
            "suspended".parse::<BadgeStatus>().unwrap(),
            BadgeStatus::Suspended
        );
        assert_eq!(
            "expired".parse::<BadgeStatus>().unwrap(),
            BadgeStatus::Expired
        );
        assert!("invalid".parse::<BadgeStatus>().is_err());
    }

    #[test]
    fn test_badge_status_display() {
        assert_eq!(BadgeStatus::Active.to_string(), "active");
        assert_eq!(BadgeStatus::Suspended.to_string(), "suspended");
        assert_eq!(BadgeStatus::Expired.to_string(), "expired");
    }

    #[test]
    fn test_last_location_pairing() {
        let badge = create_test_badge();
        let last = badge.last_location().unwrap();
        assert_eq!(last.latitude, 37.7749);
        assert_eq!(last.longitude, -122.4194);
    }

    #[test]
    fn test_last_location_absent_when_partial() {
        let mut badge = create_test_badge();
        badge.last_location_at = None;
        assert!(badge.last_location().is_none());

        let mut badge = create_test_badge();
        badge.last_latitude = None;
        assert!(badge.last_location().is_none());
    }

    #[test]
    fn test_is_active() {
        let mut badge = create_test_badge();
        assert!(badge.is_active());
        badge.status = BadgeStatus::Suspended;
        assert!(!badge.is_active());
        badge.status = BadgeStatus::Expired;
        assert!(!badge.is_active());
    }

    #[test]
    fn test_update_request_empty() {
        let request = UpdateBadgeRequest::default();
        assert!(request.is_empty());
        assert!(request.location_fields_consistent());
    }

    #[test]
    fn test_update_request_location_fields_consistent() {
        let request = UpdateBadgeRequest {
            last_latitude: Some(45.0),
            last_longitude: Some(-120.0),
            last_location_at: Some(Utc::now()),
            forms_submitted: None,
        };
        assert!(request.location_fields_consistent());
    }

    #[test]
    fn test_update_request_location_fields_inconsistent() {
        let request = UpdateBadgeRequest {
            last_latitude: Some(45.0),
            last_longitude: None,
            last_location_at: None,
            forms_submitted: None,
        };
        assert!(!request.location_fields_consistent());
    }

    #[test]
    fn test_update_request_validation() {
        let request = UpdateBadgeRequest {
            last_latitude: Some(100.0), // Invalid: > 90
            last_longitude: Some(-120.0),
            last_location_at: Some(Utc::now()),
            forms_submitted: None,
        };
        assert!(request.validate().is_err());

        let request = UpdateBadgeRequest {
            forms_submitted: Some(-1),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_request_deserialization() {
        let json = r#"{
            "lastLatitude": 40.7128,
            "lastLongitude": -74.0060,
            "lastLocationAt": "2026-08-01T12:00:00Z",
            "formsSubmitted": 5
        }"#;
        let request: UpdateBadgeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.last_latitude, Some(40.7128));
        assert_eq!(request.forms_submitted, Some(5));
    }

    #[test]
    fn test_badge_response_from_badge() {
        let badge = create_test_badge();
        let id = badge.id;
        let response: BadgeResponse = badge.into();
        assert_eq!(response.id, id);
        assert!(response.last_location.is_some());
        assert_eq!(response.forms_submitted, 12);
    }

    #[test]
    fn test_badge_response_serialization_skips_absent_location() {
        let mut badge = create_test_badge();
        badge.last_latitude = None;
        badge.last_longitude = None;
        badge.last_location_at = None;
        let response: BadgeResponse = badge.into();
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("lastLocation"));
        assert!(json.contains("\"status\":\"active\""));
    }
}
