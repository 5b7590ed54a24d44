// src/utils/time.rs

//! Timestamp helpers shared by the window resolver, clients and transformers.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Marker value the registry stores for hotels that were never imported.
pub const BEGINNING_OF_TIME: &str = "1900-01-01T00:00:00Z";

/// Layout of run timestamps, marker values and `updateFrom` parameters.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// The "all history" instant used as the lower bound of a first import.
pub fn beginning_of_time() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Format an instant the way every key and marker in the system expects.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp as written by the registry or the source API.
///
/// Accepts RFC 3339 with any offset, or a naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// which is taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|n| n.and_utc())
}

/// Date portion of a Host date or datetime string (`2024-07-04T00:00:00` -> `2024-07-04`).
pub fn date_part(value: &str) -> Option<NaiveDate> {
    let head = value.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Open-ended date range literal, e.g. `[2021-02-02,)`.
pub fn open_range(date: NaiveDate) -> String {
    format!("[{},)", date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_round_trip() {
        let sentinel = parse_timestamp(BEGINNING_OF_TIME).unwrap();
        assert_eq!(sentinel, beginning_of_time());
        assert_eq!(format_timestamp(sentinel), BEGINNING_OF_TIME);
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = parse_timestamp("2024-07-04T10:30:00Z").unwrap();
        assert_eq!(parse_timestamp("2024-07-04T10:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-07-04T12:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-07-04 10:30:00.000"), Some(expected));
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_date_part() {
        let d = NaiveDate::from_ymd_opt(2021, 2, 2).unwrap();
        assert_eq!(date_part("2021-02-02T00:00:00"), Some(d));
        assert_eq!(date_part("2021-02-02"), Some(d));
        assert_eq!(date_part("02/02/2021"), None);
        assert_eq!(date_part("2021"), None);
        assert_eq!(open_range(d), "[2021-02-02,)");
    }
}
