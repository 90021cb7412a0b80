//! Relative time formatting for "last seen" display strings.

use chrono::{DateTime, Utc};

/// Formats the duration between `then` and `now` as a human-readable
/// relative string ("just now", "4 minutes ago", "2 hours ago").
///
/// Timestamps at or ahead of `now` render as "just now"; device clock skew
/// must not produce negative durations in the UI.
pub fn relative_from(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let secs = elapsed.num_seconds();

    if secs < 60 {
        return "just now".to_string();
    }

    let minutes = elapsed.num_minutes();
    if minutes < 60 {
        return plural(minutes, "minute");
    }

    let hours = elapsed.num_hours();
    if hours < 24 {
        return plural(hours, "hour");
    }

    plural(elapsed.num_days(), "day")
}

/// Formats against the current wall clock.
pub fn relative_to_now(then: DateTime<Utc>) -> String {
    relative_from(then, Utc::now())
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", count, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_just_now() {
        let n = now();
        assert_eq!(relative_from(n, n), "just now");
        assert_eq!(relative_from(n - Duration::seconds(30), n), "just now");
        assert_eq!(relative_from(n - Duration::seconds(59), n), "just now");
    }

    #[test]
    fn test_future_timestamps_clamp_to_just_now() {
        let n = now();
        assert_eq!(relative_from(n + Duration::seconds(45), n), "just now");
        assert_eq!(relative_from(n + Duration::hours(2), n), "just now");
    }

    #[test]
    fn test_minutes() {
        let n = now();
        assert_eq!(relative_from(n - Duration::minutes(1), n), "1 minute ago");
        assert_eq!(relative_from(n - Duration::minutes(4), n), "4 minutes ago");
        assert_eq!(relative_from(n - Duration::minutes(59), n), "59 minutes ago");
    }

    #[test]
    fn test_hours() {
        let n = now();
        assert_eq!(relative_from(n - Duration::hours(1), n), "1 hour ago");
        assert_eq!(relative_from(n - Duration::hours(23), n), "23 hours ago");
    }

    #[test]
    fn test_days() {
        let n = now();
        assert_eq!(relative_from(n - Duration::days(1), n), "1 day ago");
        assert_eq!(relative_from(n - Duration::days(14), n), "14 days ago");
    }

    #[test]
    fn test_boundary_minute_to_hour() {
        let n = now();
        assert_eq!(relative_from(n - Duration::seconds(60), n), "1 minute ago");
        assert_eq!(relative_from(n - Duration::seconds(3599), n), "59 minutes ago");
        assert_eq!(relative_from(n - Duration::seconds(3600), n), "1 hour ago");
    }
}
