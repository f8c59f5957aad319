use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

use super::{Accumulator, Timer};
use crate::clock::Clock;
use crate::foreground::{ForegroundListener, ForegroundMonitor};

#[derive(Debug)]
struct ActiveState {
    is_started: bool,
    is_foreground: bool,
    accumulator: Accumulator,
}

/// Timer that only runs while started and the app is foregrounded.
///
/// Registered with the monitor through a weak reference, so dropping the
/// last `Arc` unsubscribes it.
#[derive(Debug)]
pub struct ActiveTimer {
    clock: Arc<dyn Clock>,
    state: Mutex<ActiveState>,
}

impl ActiveTimer {
    pub fn new(clock: Arc<dyn Clock>, monitor: &ForegroundMonitor) -> Arc<Self> {
        let timer = Arc::new(Self {
            clock,
            state: Mutex::new(ActiveState {
                is_started: false,
                is_foreground: false,
                accumulator: Accumulator::default(),
            }),
        });
        let weak: Weak<Self> = Arc::downgrade(&timer);
        let listener: Weak<dyn ForegroundListener> = weak;
        monitor.add_listener(listener);

        // Read after subscribing: the monitor publishes before notifying, so a
        // transition racing this line is either seen here or delivered after.
        timer.state.lock().is_foreground = monitor.is_foreground();
        timer
    }
}

impl Timer for ActiveTimer {
    fn start(&self) {
        let mut state = self.state.lock();
        if state.is_started {
            return;
        }
        state.is_started = true;
        if state.is_foreground {
            state.accumulator.resume(self.clock.monotonic_millis());
        }
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        if !state.is_started {
            return;
        }
        state.is_started = false;
        state.accumulator.pause(self.clock.monotonic_millis());
    }

    fn time(&self) -> Duration {
        self.state.lock().accumulator.total(self.clock.monotonic_millis())
    }
}

impl ForegroundListener for ActiveTimer {
    fn on_foreground_changed(&self, is_foreground: bool) {
        let now = self.clock.monotonic_millis();
        let mut state = self.state.lock();
        state.is_foreground = is_foreground;
        if !state.is_started {
            return;
        }
        if is_foreground {
            state.accumulator.resume(now);
        } else {
            state.accumulator.pause(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;

    #[test]
    fn test_only_counts_foreground_time() {
        let clock = Arc::new(TestClock::new(0));
        let monitor = ForegroundMonitor::new(true);
        let timer = ActiveTimer::new(clock.clone(), &monitor);

        timer.start();
        clock.advance(100);
        assert_eq!(timer.time(), Duration::from_millis(100));

        monitor.set_foreground(false);
        clock.advance(5_000);
        assert_eq!(timer.time(), Duration::from_millis(100));

        monitor.set_foreground(true);
        clock.advance(40);
        timer.stop();
        clock.advance(40);
        assert_eq!(timer.time(), Duration::from_millis(140));
    }

    #[test]
    fn test_started_in_background_waits_for_foreground() {
        let clock = Arc::new(TestClock::new(0));
        let monitor = ForegroundMonitor::new(false);
        let timer = ActiveTimer::new(clock.clone(), &monitor);

        timer.start();
        timer.start();
        clock.advance(1_000);
        assert_eq!(timer.time(), Duration::ZERO);

        monitor.set_foreground(true);
        clock.advance(30);
        assert_eq!(timer.time(), Duration::from_millis(30));
    }

    #[test]
    fn test_foreground_changes_while_stopped_are_tracked() {
        let clock = Arc::new(TestClock::new(0));
        let monitor = ForegroundMonitor::new(false);
        let timer = ActiveTimer::new(clock.clone(), &monitor);

        monitor.set_foreground(true);
        clock.advance(500);
        assert_eq!(timer.time(), Duration::ZERO);

        timer.start();
        clock.advance(20);
        assert_eq!(timer.time(), Duration::from_millis(20));
    }

    #[test]
    fn test_tracks_transitions_from_other_threads() {
        let clock = Arc::new(TestClock::new(0));
        let monitor = ForegroundMonitor::new(false);

        let timer = std::thread::scope(|scope| {
            let _ = scope.spawn(|| monitor.set_foreground(true));
            ActiveTimer::new(clock.clone(), &monitor)
        });

        timer.start();
        clock.advance(25);
        assert_eq!(timer.time(), Duration::from_millis(25));
    }

    #[test]
    fn test_dropped_timer_unsubscribes() {
        let clock = Arc::new(TestClock::new(0));
        let monitor = ForegroundMonitor::new(true);
        let timer = ActiveTimer::new(clock, &monitor);
        drop(timer);

        monitor.set_foreground(false);
        monitor.set_foreground(true);
    }
}
