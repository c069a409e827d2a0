//! Timestamp utilities

use chrono::{DateTime, NaiveDateTime, Utc};

const SECONDS_PER_DAY: i64 = 86_400;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as whole seconds since the Unix epoch (cache timestamps)
pub fn now_epoch_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Parse a remote "added at" timestamp
///
/// Accepts RFC 3339 (`2024-03-01T12:00:00Z`, `...+02:00`) and naive ISO
/// date-times, which are taken as UTC. Anything else yields `None`; callers
/// treat that exactly like a missing timestamp.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Whole days elapsed from `earlier` to `later`, rounded toward negative infinity
///
/// A timestamp one second in the future is day -1, not day 0.
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_seconds().div_euclid(SECONDS_PER_DAY)
}
