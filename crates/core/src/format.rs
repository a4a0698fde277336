//! Presentation helpers.

use chrono::{DateTime, Utc};

/// Largest count shown verbatim on the bell badge.
const BADGE_MAX: u64 = 99;

/// Relative age of `created_at` as seen at `now`.
///
/// Future timestamps read as "just now". Anything a week or older is shown
/// as a plain date.
#[must_use]
pub fn time_ago(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(created_at);
    let seconds = elapsed.num_seconds();

    if seconds < 60 {
        "just now".to_string()
    } else if elapsed.num_minutes() < 60 {
        format!("{}m ago", elapsed.num_minutes())
    } else if elapsed.num_hours() < 24 {
        format!("{}h ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{}d ago", elapsed.num_days())
    } else {
        created_at.format("%Y-%m-%d").to_string()
    }
}

/// Badge label for an unread count. `None` hides the badge.
#[must_use]
pub fn badge_text(unread: u64) -> Option<String> {
    match unread {
        0 => None,
        n if n > BADGE_MAX => Some(format!("{BADGE_MAX}+")),
        n => Some(n.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_time_ago_buckets() {
        let ago = |d: Duration| time_ago(now() - d, now());
        assert_eq!(ago(Duration::seconds(59)), "just now");
        assert_eq!(ago(Duration::seconds(60)), "1m ago");
        assert_eq!(ago(Duration::minutes(59)), "59m ago");
        assert_eq!(ago(Duration::hours(5)), "5h ago");
        assert_eq!(ago(Duration::days(6)), "6d ago");
        assert_eq!(ago(Duration::days(7)), "2026-10-09");
    }

    #[test]
    fn test_time_ago_future_is_just_now() {
        assert_eq!(time_ago(now() + Duration::minutes(3), now()), "just now");
    }

    #[test]
    fn test_badge_text() {
        assert_eq!(badge_text(0), None);
        assert_eq!(badge_text(7).as_deref(), Some("7"));
        assert_eq!(badge_text(99).as_deref(), Some("99"));
        assert_eq!(badge_text(100).as_deref(), Some("99+"));
    }
}
