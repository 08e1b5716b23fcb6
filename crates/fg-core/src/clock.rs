//! Wall clock used for pass expiry.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{Local, TimeZone};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;

    /// Last millisecond of the current local day.
    fn end_of_day_millis(&self) -> i64 {
        end_of_local_day(self.now_millis())
    }
}

/// The system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Local::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(now_millis),
        }
    }

    pub fn set(&self, now_millis: i64) {
        self.now.store(now_millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// 23:59:59.999 local time on the day containing `now_millis`.
pub fn end_of_local_day(now_millis: i64) -> i64 {
    Local
        .timestamp_millis_opt(now_millis)
        .single()
        .and_then(|now| now.date_naive().and_hms_milli_opt(23, 59, 59, 999))
        .and_then(|end| end.and_local_timezone(Local).latest())
        .map(|end| end.timestamp_millis())
        .unwrap_or(now_millis + DAY_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.now_millis(), 1_500);
        clock.set(42);
        assert_eq!(clock.now_millis(), 42);
    }

    #[test]
    fn test_end_of_local_day() {
        let now = 1_700_000_000_000;
        let end = end_of_local_day(now);
        assert!(end > now);
        assert!(end - now <= DAY_MS + 60 * 60 * 1000);
        // Idempotent within the day
        assert_eq!(end_of_local_day(end), end);
    }
}
