//! Timestamp utilities
//!
//! All timestamps are stored as RFC 3339 text in SQLite.

use chrono::{DateTime, NaiveDate, Utc};

use crate::{Error, Result};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp for storage
pub fn to_db(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Parse a stored timestamp
pub fn from_db(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", field, e)))
}

/// Parse an optional stored calendar date (YYYY-MM-DD)
pub fn date_from_db(field: &str, value: Option<String>) -> Result<Option<NaiveDate>> {
    value
        .map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", field, e)))
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        // Should be a reasonable timestamp (after year 2000)
        assert!(timestamp.timestamp() > 946_684_800);
    }

    #[test]
    fn test_timestamp_storage_preserves_instant() {
        let ts = now();
        let stored = to_db(&ts);
        let parsed = from_db("created_at", &stored).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn test_malformed_timestamp_rejected() {
        let err = from_db("created_at", "yesterday").unwrap_err();
        assert!(err.to_string().contains("created_at"));
    }

    #[test]
    fn test_date_parsing() {
        let date = date_from_db("start_date", Some("2024-02-29".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(date_from_db("start_date", None).unwrap(), None);
        assert!(date_from_db("start_date", Some("2024-13-01".to_string())).is_err());
    }

    #[test]
    fn test_millis_to_duration() {
        assert_eq!(millis_to_duration(1500), Duration::from_millis(1500));
    }
}
