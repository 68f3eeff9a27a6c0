//! Stored entry representation and the cache clock.

use std::time::Duration;

use chrono::Utc;

/// A raw row of the entries table.
///
/// `value` is the serialized form; `expire_at` is seconds since the Unix epoch,
/// infinite for rows written without one.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub expire_at: f64,
}

impl Entry {
    /// An entry is expired once the clock reaches its `expire_at`.
    pub fn is_expired_at(&self, now: f64) -> bool {
        now >= self.expire_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining_at(&self, now: f64) -> Duration {
        if self.is_expired_at(now) {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.expire_at - now).unwrap_or(Duration::MAX)
    }
}

/// Current wall-clock time in fractional seconds since the Unix epoch.
///
/// Both the write path and the read path take time from here.
pub fn now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Absolute expiry for an entry written at `now` with the given TTL.
pub fn expire_at(now: f64, ttl: Duration) -> f64 {
    now + ttl.as_secs_f64()
}
