//! Duration helpers for completed sessions and running timers

use chrono::{DateTime, Utc};

/// Human readable duration stored alongside `duration_minutes`
pub fn format_duration_minutes(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let hours = minutes / 60;
    let rest = minutes % 60;

    if hours > 0 {
        format!("{}h {}m", hours, rest)
    } else {
        format!("{}m", rest)
    }
}

/// Whole seconds between `start` and `now`, clamped at zero
///
/// Pure function of its inputs; callers recompute it on whatever cadence
/// they refresh timers.
pub fn elapsed_seconds(now: DateTime<Utc>, start: DateTime<Utc>) -> i64 {
    (now - start).num_seconds().max(0)
}

/// `HH:MM:SS` rendering of a running timer; hours are not wrapped at 24
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Minutes between start and stop rounded to the nearest whole minute
///
/// Returns `None` when `stop` precedes `start`.
pub fn rounded_minutes(start: DateTime<Utc>, stop: DateTime<Utc>) -> Option<i64> {
    let millis = (stop - start).num_milliseconds();
    if millis < 0 {
        return None;
    }
    Some((millis as f64 / 60_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_format_duration_minutes() {
        assert_eq!(format_duration_minutes(0), "0m");
        assert_eq!(format_duration_minutes(45), "45m");
        assert_eq!(format_duration_minutes(60), "1h 0m");
        assert_eq!(format_duration_minutes(605), "10h 5m");
        assert_eq!(format_duration_minutes(-3), "0m");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00:00");
        assert_eq!(format_elapsed(3_725), "01:02:05");
        assert_eq!(format_elapsed(90_000), "25:00:00");
    }

    #[test]
    fn test_rounded_minutes_rounds_half_up() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();

        assert_eq!(rounded_minutes(start, start + Duration::seconds(29)), Some(0));
        assert_eq!(rounded_minutes(start, start + Duration::seconds(30)), Some(1));
        assert_eq!(rounded_minutes(start, start + Duration::minutes(30)), Some(30));
        assert_eq!(rounded_minutes(start, start - Duration::seconds(1)), None);
    }
}
