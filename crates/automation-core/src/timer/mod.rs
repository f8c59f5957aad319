//! Elapsed-time accumulators for display duration tracking.
//!
//! [`ManualTimer`] runs between explicit `start`/`stop` calls.
//! [`ActiveTimer`] additionally pauses while the app is in the background.
//! Both read the clock's monotonic time, and `time()` includes the segment
//! currently running.

mod active;
mod manual;

pub use active::ActiveTimer;
pub use manual::ManualTimer;

use std::time::Duration;

pub trait Timer: Send + Sync {
    /// No-op when already started.
    fn start(&self);

    /// No-op when already stopped.
    fn stop(&self);

    /// Accumulated running time.
    fn time(&self) -> Duration;
}

/// Running total plus the start of the open segment, if any.
#[derive(Debug, Default, Clone, Copy)]
struct Accumulator {
    elapsed_ms: u64,
    running_since: Option<u64>,
}

impl Accumulator {
    fn resume(&mut self, now: u64) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    fn pause(&mut self, now: u64) {
        if let Some(since) = self.running_since.take() {
            self.elapsed_ms += now.saturating_sub(since);
        }
    }

    fn total(&self, now: u64) -> Duration {
        let open = self.running_since.map_or(0, |since| now.saturating_sub(since));
        Duration::from_millis(self.elapsed_ms + open)
    }
}
