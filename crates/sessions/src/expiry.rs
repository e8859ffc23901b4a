//! Inactivity expiry policy.

use chrono::{DateTime, Utc};

use crate::record::SessionRecord;

/// Milliseconds since the record was last accessed.
pub fn idle_ms(record: &SessionRecord, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(record.last_accessed_at())
        .num_milliseconds()
}

/// A record is stale once strictly more than `timeout_sec` seconds have
/// passed since its last access.
pub fn is_expired(record: &SessionRecord, now: DateTime<Utc>, timeout_sec: u64) -> bool {
    let timeout_ms = i64::try_from(timeout_sec.saturating_mul(1000)).unwrap_or(i64::MAX);
    idle_ms(record, now) > timeout_ms
}
