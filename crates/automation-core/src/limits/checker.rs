//! Per-use handle for testing and recording occurrences.

use std::sync::Arc;

use super::state::SharedLimits;
use super::store::OccurrenceRecord;
use super::writer::{WriteOp, WriteQueue};

/// Checks and records occurrences against a fixed set of constraint ids.
///
/// Checkers never copy occurrence lists; they read and write the manager's
/// shared state, so two checkers on the same constraint see each other's
/// increments immediately. A constraint that disappears after the checker was
/// created is simply ignored: it never blocks and its increments are dropped.
#[derive(Debug, Clone)]
pub struct FrequencyChecker {
    shared: Arc<SharedLimits>,
    writer: WriteQueue,
    constraint_ids: Vec<String>,
}

impl FrequencyChecker {
    pub(crate) fn new(
        shared: Arc<SharedLimits>,
        writer: WriteQueue,
        constraint_ids: Vec<String>,
    ) -> Self {
        Self { shared, writer, constraint_ids }
    }

    pub fn constraint_ids(&self) -> &[String] {
        &self.constraint_ids
    }

    /// True if any bound constraint is at its limit right now.
    pub fn is_over_limit(&self) -> bool {
        let now = self.shared.now();
        let mut state = self.shared.state.lock();
        state.prune(&self.constraint_ids, now);
        state.is_over_limit(&self.constraint_ids, now)
    }

    /// Records one occurrence on every bound constraint unless any of them is
    /// over the limit. Returns whether the occurrence was recorded.
    pub fn check_and_increment(&self) -> bool {
        let now = self.shared.now();
        {
            let mut guard = self.shared.state.lock();
            guard.prune(&self.constraint_ids, now);
            if guard.is_over_limit(&self.constraint_ids, now) {
                return false;
            }

            let state = &mut *guard;
            for id in &self.constraint_ids {
                if let Some(constraint) = state.constraints.get_mut(id) {
                    constraint.occurrences.push(now);
                    state.pending.push(OccurrenceRecord {
                        parent_constraint_id: id.clone(),
                        timestamp: now,
                    });
                }
            }
        }

        if self.writer.send(WriteOp::Flush(None)).is_err() {
            tracing::warn!("Frequency limit writer is gone, occurrence kept in memory only");
        }
        true
    }
}
