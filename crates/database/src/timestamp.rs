//! Timestamp encoding for TEXT columns.
//!
//! All timestamps are UTC RFC 3339 with microsecond precision and a `Z`
//! suffix, so comparing the strings compares the instants.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{DatabaseError, Result};

/// Encode a timestamp for storage.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidTimestamp(value.to_string()))
}

/// The current time, encoded for storage.
pub fn now() -> String {
    format_timestamp(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_is_fixed_width() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2024-05-01T09:05:00.000000Z");
    }

    #[test]
    fn test_parse_round_trip() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(ts)).unwrap(), ts);
    }

    #[test]
    fn test_parse_offset_normalized() {
        let parsed = parse_timestamp("2024-05-01T17:05:00+08:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 9, 5, 0).unwrap());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(DatabaseError::InvalidTimestamp(_))
        ));
    }
}
