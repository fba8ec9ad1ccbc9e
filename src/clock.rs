//! Wall-clock helpers pinned to Western Indonesia Time (UTC+7).
//!
//! Both stores persist timestamps as `YYYY-MM-DD HH:MM:SS` civil time at a
//! fixed +07:00 offset, so everything in the crate works with `NaiveDateTime`
//! values that are already in that offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

pub const UTC_OFFSET_SECS: i32 = 7 * 3600;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn offset() -> FixedOffset {
    FixedOffset::east_opt(UTC_OFFSET_SECS).expect("+07:00 is a valid offset")
}

pub fn to_local(dt: DateTime<Utc>) -> NaiveDateTime {
    dt.with_timezone(&offset()).naive_local()
}

pub fn now() -> NaiveDateTime {
    to_local(Utc::now())
}

pub fn today() -> NaiveDate {
    now().date()
}

pub fn format_timestamp(dt: &NaiveDateTime) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored or scraped timestamp into UTC+7 civil time.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    // Offset-aware values (e.g. "2026-01-11T12:34:56+00:00") are shifted into +07:00
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(to_local(dt.with_timezone(&Utc)));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
        return Some(naive);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
