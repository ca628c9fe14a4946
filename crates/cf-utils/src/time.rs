//! Timestamp conventions shared by artifacts, receipts, and progress events.

use chrono::{DateTime, Utc};

/// Current UTC time. Centralized so tests can be written against a fixed
/// instant by constructing values directly rather than calling this.
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Format a timestamp as ISO-8601 UTC with microsecond precision, the
/// format every stamped record's `created_at` field uses.
#[must_use]
pub fn format_micros(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}
