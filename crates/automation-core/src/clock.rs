//! Time sources.
//!
//! Wall-clock time drives frequency windows and cache expiry; monotonic time
//! drives timers. Both are injectable so tests can pin them.

use std::fmt::Debug;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

pub trait Clock: Send + Sync + Debug {
    /// Milliseconds since the Unix epoch.
    fn current_time_millis(&self) -> i64;

    /// Milliseconds since an arbitrary fixed origin; never goes backwards.
    fn monotonic_millis(&self) -> u64;
}

/// Real system time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn current_time_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn monotonic_millis(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Manually driven clock.
#[derive(Debug, Default)]
pub struct TestClock {
    current_time_millis: AtomicI64,
    monotonic_millis: AtomicU64,
}

impl TestClock {
    pub fn new(current_time_millis: i64) -> Self {
        Self {
            current_time_millis: AtomicI64::new(current_time_millis),
            monotonic_millis: AtomicU64::new(0),
        }
    }

    pub fn set_time(&self, millis: i64) {
        self.current_time_millis.store(millis, Ordering::SeqCst);
    }

    /// Moves both wall and monotonic time forward.
    pub fn advance(&self, millis: u64) {
        self.current_time_millis
            .fetch_add(i64::try_from(millis).unwrap_or(i64::MAX), Ordering::SeqCst);
        self.monotonic_millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn current_time_millis(&self) -> i64 {
        self.current_time_millis.load(Ordering::SeqCst)
    }

    fn monotonic_millis(&self) -> u64 {
        self.monotonic_millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_clock_advances_both_sources() {
        let clock = TestClock::new(1_000);
        clock.advance(250);
        assert_eq!(clock.current_time_millis(), 1_250);
        assert_eq!(clock.monotonic_millis(), 250);

        clock.set_time(0);
        assert_eq!(clock.current_time_millis(), 0);
        assert_eq!(clock.monotonic_millis(), 250);
    }

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let first = clock.monotonic_millis();
        let second = clock.monotonic_millis();
        assert!(second >= first);
        assert!(clock.current_time_millis() > 0);
    }
}
