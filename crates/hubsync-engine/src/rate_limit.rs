//! Remaining API quota, as last reported by the source.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub remaining: u32,
    pub reset_epoch_millis: i64,
}

impl RateLimit {
    pub fn new(remaining: u32, reset_epoch_millis: i64) -> Self {
        Self {
            remaining,
            reset_epoch_millis,
        }
    }

    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.reset_epoch_millis).single()
    }
}

/// Last-write-wins cell.
#[derive(Debug, Default)]
pub struct RateLimitCell {
    current: Mutex<Option<RateLimit>>,
}

impl RateLimitCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, limit: RateLimit) {
        *self.current.lock() = Some(limit);
    }

    pub fn get(&self) -> Option<RateLimit> {
        *self.current.lock()
    }
}
