//! Wall-clock abstraction.
//!
//! Token expiry is compared against the clock at the moment of each read or
//! redemption. Injecting the clock lets tests move time forward.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in Unix seconds.
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> i64;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        // A clock set before 1970 reads as the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_secs: i64) -> Self {
        Self {
            now: AtomicI64::new(start_secs),
        }
    }

    pub fn set(&self, secs: i64) {
        self.now.store(secs, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    pub fn advance_hours(&self, hours: i64) {
        self.advance_secs(hours * crate::share::SECONDS_PER_HOUR);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_secs(), 1_000);
        clock.advance_hours(2);
        assert_eq!(clock.now_secs(), 8_200);
        clock.set(5);
        assert_eq!(clock.now_secs(), 5);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_secs() > 1_577_836_800);
    }
}
