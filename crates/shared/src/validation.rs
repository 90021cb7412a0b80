//! Common validation utilities.

use chrono::{DateTime, Utc};
use validator::ValidationError;

/// Maximum age of a recorded-at timestamp in days (7 days).
const MAX_RECORDED_AT_AGE_DAYS: i64 = 7;

/// Maximum allowed future timestamp tolerance in seconds (5 minutes for clock skew).
const MAX_FUTURE_TOLERANCE_SECS: i64 = 300;

lazy_static::lazy_static! {
    /// Surveyor identifiers are uppercase alphanumeric with dashes, 2-32 chars.
    static ref SURVEYOR_ID_RE: regex::Regex =
        regex::Regex::new(r"^[A-Z0-9][A-Z0-9-]{1,31}$").expect("valid regex");
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates a surveyor identifier (human-assigned badge code).
pub fn validate_surveyor_id(surveyor_id: &str) -> Result<(), ValidationError> {
    if SURVEYOR_ID_RE.is_match(surveyor_id) {
        Ok(())
    } else {
        let mut err = ValidationError::new("surveyor_id_format");
        err.message =
            Some("Surveyor id must be 2-32 uppercase letters, digits, or dashes".into());
        Err(err)
    }
}

/// Validates that a sample recorded-at timestamp is within acceptable range.
/// - Must not be more than 5 minutes in the future (allows for clock skew)
/// - Must not be older than 7 days
pub fn validate_recorded_at(recorded_at: &DateTime<Utc>) -> Result<(), ValidationError> {
    let now = Utc::now();
    let recorded_at = *recorded_at;

    let future_limit = now + chrono::Duration::seconds(MAX_FUTURE_TOLERANCE_SECS);
    if recorded_at > future_limit {
        let mut err = ValidationError::new("recorded_at_future");
        err.message = Some("Recorded-at timestamp cannot be in the future".into());
        return Err(err);
    }

    let past_limit = now - chrono::Duration::days(MAX_RECORDED_AT_AGE_DAYS);
    if recorded_at < past_limit {
        let mut err = ValidationError::new("recorded_at_old");
        err.message = Some("Recorded-at timestamp cannot be older than 7 days".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_latitude() {
        assert!(validate_latitude(0.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(45.1234).is_ok());
    }

    #[test]
    fn test_validate_latitude_out_of_range() {
        assert!(validate_latitude(90.0001).is_err());
        assert!(validate_latitude(-90.0001).is_err());
        assert!(validate_latitude(180.0).is_err());
    }

    #[test]
    fn test_validate_longitude() {
        assert!(validate_longitude(0.0).is_ok());
        assert!(validate_longitude(180.0).is_ok());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(-122.4194).is_ok());
    }

    #[test]
    fn test_validate_longitude_out_of_range() {
        assert!(validate_longitude(180.0001).is_err());
        assert!(validate_longitude(-180.0001).is_err());
        assert!(validate_longitude(360.0).is_err());
    }

    #[test]
    fn test_validate_surveyor_id() {
        assert!(validate_surveyor_id("SRV-001").is_ok());
        assert!(validate_surveyor_id("A1").is_ok());
        assert!(validate_surveyor_id("FIELD-TEAM-NORTH-07").is_ok());
    }

    #[test]
    fn test_validate_surveyor_id_rejects_bad_formats() {
        assert!(validate_surveyor_id("").is_err());
        assert!(validate_surveyor_id("a").is_err());
        assert!(validate_surveyor_id("srv-001").is_err());
        assert!(validate_surveyor_id("-SRV").is_err());
        assert!(validate_surveyor_id("SRV 001").is_err());
        assert!(validate_surveyor_id(&"X".repeat(33)).is_err());
    }

    #[test]
    fn test_validate_recorded_at_now() {
        assert!(validate_recorded_at(&Utc::now()).is_ok());
    }

    #[test]
    fn test_validate_recorded_at_slight_skew() {
        let ts = Utc::now() + chrono::Duration::seconds(120);
        assert!(validate_recorded_at(&ts).is_ok());
    }

    #[test]
    fn test_validate_recorded_at_too_far_future() {
        let ts = Utc::now() + chrono::Duration::hours(1);
        assert!(validate_recorded_at(&ts).is_err());
    }

    #[test]
    fn test_validate_recorded_at_too_old() {
        let ts = Utc::now() - chrono::Duration::days(10);
        assert!(validate_recorded_at(&ts).is_err());
    }

    #[test]
    fn test_validate_recorded_at_recent_past() {
        let ts = Utc::now() - chrono::Duration::days(3);
        assert!(validate_recorded_at(&ts).is_ok());
    }
}
