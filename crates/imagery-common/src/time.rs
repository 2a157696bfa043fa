//! Timestamp parsing and formatting for capture queries.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SubsecRound, TimeZone, Utc};

/// Parse a query timestamp.
///
/// Supports:
/// - RFC 3339 with timezone: "2024-01-15T12:00:00Z"
/// - Naive datetime (UTC assumed): "2024-01-15T12:00:00"
/// - Bare date (midnight UTC): "2024-01-15"
///
/// Fractional seconds are truncated: the canonical timestamp form is
/// second-granular, and anything finer could never compare equal to a
/// timestamp that went through a redirect URL.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).trunc_subsecs(0));
    }

    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    if let Ok(nd) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&nd.and_hms_opt(0, 0, 0).unwrap()));
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Canonical timestamp form used in redirect URLs.
///
/// Must round-trip through [`parse_timestamp`] so an exact-timestamp
/// request compares equal to the capture it was redirected to.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid timestamp format: {0}")]
    InvalidFormat(String),
}
