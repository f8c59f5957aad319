use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use super::{Accumulator, Timer};
use crate::clock::Clock;

/// Caller-controlled timer.
#[derive(Debug)]
pub struct ManualTimer {
    clock: Arc<dyn Clock>,
    accumulator: Mutex<Accumulator>,
}

impl ManualTimer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, accumulator: Mutex::new(Accumulator::default()) }
    }
}

impl Timer for ManualTimer {
    fn start(&self) {
        self.accumulator.lock().resume(self.clock.monotonic_millis());
    }

    fn stop(&self) {
        self.accumulator.lock().pause(self.clock.monotonic_millis());
    }

    fn time(&self) -> Duration {
        self.accumulator.lock().total(self.clock.monotonic_millis())
    }
}
