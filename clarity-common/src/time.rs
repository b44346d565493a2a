//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Envelope timestamp format (UTC, second precision, `Z` suffix)
pub const ENVELOPE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp the way every API envelope reports it
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(ENVELOPE_TIMESTAMP_FORMAT).to_string()
}

/// Current time formatted for an API envelope
pub fn envelope_timestamp() -> String {
    format_timestamp(&now())
}
