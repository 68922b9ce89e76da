//! Timestamp and duration formatting for reports.

use chrono::{DateTime, Utc};

/// Formats a unix timestamp as a UTC date string
/// ("Tue, 14 Nov 2023 08:21:00 GMT").
pub fn timestamp_to_utc(timestamp: u64) -> String {
    match DateTime::<Utc>::from_timestamp(timestamp as i64, 0) {
        Some(datetime) => datetime.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        None => format!("invalid timestamp {}", timestamp),
    }
}

/// Formats the distance from `now` to `target` the way the reports phrase
/// it: "2days : 3h : 4min : 5s", dropping leading units that are zero.
pub fn format_remaining_time(target: u64, now: u64) -> String {
    let difference = target.saturating_sub(now);

    let days = difference / (24 * 60 * 60);
    let hours = (difference % (24 * 60 * 60)) / (60 * 60);
    let minutes = (difference % (60 * 60)) / 60;
    let seconds = difference % 60;

    if days > 0 {
        format!("{}days : {}h : {}min : {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h : {}min : {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}min : {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Formats an age in seconds as "X hours, Y minutes, Z seconds".
pub fn format_hours_minutes_seconds(seconds: u64) -> String {
    format!(
        "{} hours, {} minutes, {} seconds",
        seconds / 3600,
        (seconds / 60) % 60,
        seconds % 60
    )
}

/// Current unix time.
pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_to_utc() {
        assert_eq!(timestamp_to_utc(0), "Thu, 01 Jan 1970 00:00:00 GMT");
        assert_eq!(timestamp_to_utc(1_700_000_000), "Tue, 14 Nov 2023 22:13:20 GMT");
    }

    #[test]
    fn test_format_remaining_time_units() {
        let now = 1_000_000;
        assert_eq!(format_remaining_time(now + 45, now), "45s");
        assert_eq!(format_remaining_time(now + 125, now), "2min : 5s");
        assert_eq!(format_remaining_time(now + 3 * 3600 + 60, now), "3h : 1min : 0s");
        assert_eq!(
            format_remaining_time(now + 2 * 86400 + 3 * 3600, now),
            "2days : 3h : 0min : 0s"
        );
    }

    #[test]
    fn test_format_remaining_time_past_target() {
        assert_eq!(format_remaining_time(100, 200), "0s");
    }

    #[test]
    fn test_format_hours_minutes_seconds() {
        assert_eq!(
            format_hours_minutes_seconds(5 * 3600 + 42 * 60 + 7),
            "5 hours, 42 minutes, 7 seconds"
        );
    }
}
