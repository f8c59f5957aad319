//! In-memory view of constraints shared by the manager and every checker.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use super::store::OccurrenceRecord;
use crate::clock::Clock;

/// A loaded constraint and every occurrence recorded for it, oldest first.
#[derive(Debug, Clone)]
pub(crate) struct ActiveConstraint {
    pub count: u32,
    pub range_ms: i64,
    pub occurrences: Vec<i64>,
}

impl ActiveConstraint {
    /// Over the limit once `count` occurrences sit inside `[now - range, now]`.
    pub fn is_over_limit(&self, now: i64) -> bool {
        let count = self.count as usize;
        if self.occurrences.len() < count {
            return false;
        }
        let window_start = self.window_start(now);
        let in_window = self.occurrences.iter().filter(|&&t| t >= window_start).count();
        in_window >= count
    }

    /// Drops occurrences that have slid out of the window. Persisted rows are untouched.
    pub fn prune(&mut self, now: i64) -> usize {
        let window_start = self.window_start(now);
        let before = self.occurrences.len();
        self.occurrences.retain(|&t| t >= window_start);
        before - self.occurrences.len()
    }

    fn window_start(&self, now: i64) -> i64 {
        now.saturating_sub(self.range_ms)
    }
}

#[derive(Debug, Default)]
pub(crate) struct LimitState {
    pub constraints: HashMap<String, ActiveConstraint>,
    /// Occurrences recorded in memory but not yet handed to the store.
    pub pending: Vec<OccurrenceRecord>,
    /// Bumped on every constraint update so concurrent loads can detect staleness.
    pub generation: u64,
}

impl LimitState {
    /// Unknown ids never count against the limit.
    pub fn is_over_limit(&self, ids: &[String], now: i64) -> bool {
        ids.iter()
            .filter_map(|id| self.constraints.get(id))
            .any(|constraint| constraint.is_over_limit(now))
    }

    pub fn prune(&mut self, ids: &[String], now: i64) {
        for id in ids {
            if let Some(constraint) = self.constraints.get_mut(id) {
                let _ = constraint.prune(now);
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct SharedLimits {
    pub clock: Arc<dyn Clock>,
    pub state: Mutex<LimitState>,
}

impl SharedLimits {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock, state: Mutex::new(LimitState::default()) }
    }

    pub fn now(&self) -> i64 {
        self.clock.current_time_millis()
    }
}
