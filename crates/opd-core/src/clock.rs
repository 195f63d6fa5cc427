//! Clinic-local calendar day resolution.
//!
//! The clinic operates on a fixed UTC+05:30 civil calendar regardless of
//! where the server or the staff's browsers are. Every "is this today"
//! decision in the crate routes through this module; nothing else is
//! allowed to compare raw timestamps across a day boundary.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Fixed clinic offset from UTC, in seconds (+05:30).
pub const CLINIC_UTC_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// The clinic's fixed timezone offset.
pub fn clinic_offset() -> FixedOffset {
    FixedOffset::east_opt(CLINIC_UTC_OFFSET_SECS).expect("UTC+05:30 is a valid offset")
}

/// Parse a stored timestamp into a clinic-local instant.
///
/// Accepts RFC 3339 (the crate's own storage format), SQLite's
/// `datetime('now')` format (taken as UTC), and a bare `YYYY-MM-DD` prefix
/// (taken as clinic-local midnight, matching the legacy ISO-prefix
/// comparisons). Returns `None` for anything else; callers treat `None`
/// as "not today" rather than an error.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&clinic_offset()));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive).with_timezone(&clinic_offset()));
    }

    let prefix = raw.get(..10)?;
    if let Ok(date) = NaiveDate::parse_from_str(prefix, "%Y-%m-%d") {
        let midnight = date.and_time(NaiveTime::MIN);
        return clinic_offset().from_local_datetime(&midnight).single();
    }

    None
}

/// Project a stored timestamp onto the clinic-local calendar date.
pub fn calendar_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|dt| dt.date_naive())
}

/// The clinic-local calendar date for a reference instant.
pub fn clinic_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&clinic_offset()).date_naive()
}

/// Whether a stored timestamp falls on the clinic-local date of `now`.
///
/// Unparseable timestamps are "not today": a bad value degrades to
/// exclusion from today's views, never a panic.
pub fn is_today(raw: &str, now: DateTime<Utc>) -> bool {
    calendar_date(raw).is_some_and(|date| date == clinic_today(now))
}

/// Whether two stored timestamps fall on the same clinic-local date.
///
/// Either side unparseable means "no" (an unreadable assignment time can
/// never collide with anything).
pub fn same_calendar_day(a: &str, b: &str) -> bool {
    match (calendar_date(a), calendar_date(b)) {
        (Some(da), Some(db)) => da == db,
        _ => false,
    }
}

/// The `[midnight, next midnight)` clinic-local window containing `now`,
/// expressed as UTC instants. Queue counts use this window so that counts
/// and list membership can never disagree about the day boundary.
pub fn day_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_midnight = clinic_today(now).and_time(NaiveTime::MIN);
    let start = Utc.from_utc_datetime(&(local_midnight - Duration::seconds(CLINIC_UTC_OFFSET_SECS as i64)));
    (start, start + Duration::days(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_timestamp("2024-03-11T18:29:59+00:00").unwrap();
        // 18:29:59 UTC is 23:59:59 clinic-local
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(dt.time(), NaiveTime::from_hms_opt(23, 59, 59).unwrap());
    }

    #[test]
    fn test_parse_sqlite_format() {
        let dt = parse_timestamp("2024-03-11 18:30:01").unwrap();
        // One second past clinic-local midnight: next calendar day
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
    }

    #[test]
    fn test_parse_date_prefix() {
        let dt = parse_timestamp("2024-03-11").unwrap();
        assert_eq!(dt.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(dt.time(), NaiveTime::MIN);
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("not a timestamp").is_none());
        assert!(parse_timestamp("11/03/2024").is_none());
    }

    #[test]
    fn test_is_today_day_boundary() {
        // Assignment stamped yesterday 23:59:59 clinic-local
        let stamp = "2024-03-11T18:29:59+00:00";
        // "Now" is today 00:00:01 clinic-local (18:30:01 UTC the same UTC day)
        let now = at(2024, 3, 11, 18, 30, 1);
        assert!(!is_today(stamp, now));

        // Two seconds earlier it was still the same clinic day
        let just_before = at(2024, 3, 11, 18, 29, 59);
        assert!(is_today(stamp, just_before));
    }

    #[test]
    fn test_is_today_garbage_excluded() {
        let now = at(2024, 3, 11, 6, 0, 0);
        assert!(!is_today("garbage", now));
        assert!(!is_today("", now));
    }

    #[test]
    fn test_same_calendar_day() {
        assert!(same_calendar_day(
            "2024-03-11T01:00:00+05:30",
            "2024-03-11T23:00:00+05:30"
        ));
        // 18:30 UTC crosses into the next clinic day
        assert!(!same_calendar_day(
            "2024-03-11T18:00:00+00:00",
            "2024-03-11T19:00:00+00:00"
        ));
        assert!(!same_calendar_day("garbage", "2024-03-11T10:00:00+05:30"));
    }

    #[test]
    fn test_day_bounds_contains_now() {
        let now = at(2024, 3, 11, 6, 0, 0);
        let (start, end) = day_bounds(now);
        assert!(start <= now && now < end);
        assert_eq!(end - start, Duration::days(1));
        // Window starts at 18:30 UTC the previous day
        assert_eq!(start, at(2024, 3, 10, 18, 30, 0));
    }
}
