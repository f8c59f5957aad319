//! Authoritative in-memory view of frequency constraints.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use automation_types::{ConstraintError, FrequencyConstraint};

use super::checker::FrequencyChecker;
use super::state::{ActiveConstraint, SharedLimits};
use super::store::{ConstraintRecord, FrequencyLimitStore};
use super::writer::{run_writer, WriteOp, WriteQueue};
use crate::clock::Clock;
use crate::error::{AppError, AppResult};

/// Owns constraint definitions and occurrence history, and mints checkers.
///
/// Reads and window math happen against shared in-memory state under a
/// short-lived lock; every write to SQLite goes through a single background
/// task so writes are ordered and never block callers.
#[derive(Debug)]
pub struct FrequencyLimitManager {
    store: FrequencyLimitStore,
    shared: Arc<SharedLimits>,
    writer: WriteQueue,
}

impl FrequencyLimitManager {
    /// Creates the manager and starts its writer task on the current Tokio runtime.
    pub fn new(store: FrequencyLimitStore, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| AppError::Storage(format!("no Tokio runtime for limit writer: {e}")))?;

        let shared = Arc::new(SharedLimits::new(clock));
        let (tx, rx) = mpsc::unbounded_channel();
        let _writer_task = handle.spawn(run_writer(store.clone(), Arc::clone(&shared), rx));

        Ok(Self { store, shared, writer: tx })
    }

    pub fn store(&self) -> &FrequencyLimitStore {
        &self.store
    }

    /// Replaces the registered constraints.
    ///
    /// - new ids are created
    /// - a changed `range` wipes that constraint's history
    /// - a changed `count` keeps history
    /// - ids absent from `constraints` are deleted with their history
    pub async fn set_constraints(&self, constraints: Vec<FrequencyConstraint>) -> AppResult<()> {
        let mut seen = HashSet::with_capacity(constraints.len());
        for constraint in &constraints {
            constraint.validate()?;
            if !seen.insert(constraint.identifier.as_str()) {
                return Err(ConstraintError::Duplicate { id: constraint.identifier.clone() }.into());
            }
        }

        let (ack, done) = oneshot::channel();
        self.writer
            .send(WriteOp::Update { constraints, ack })
            .map_err(|_| AppError::Storage("frequency limit writer stopped".to_string()))?;
        done.await
            .map_err(|_| AppError::Storage("frequency limit writer dropped update".to_string()))?
    }

    /// Returns a checker bound to `constraint_ids`, or `None` when the list is empty.
    pub async fn get_frequency_checker<I, S>(
        &self,
        constraint_ids: I,
    ) -> AppResult<Option<FrequencyChecker>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = Vec::new();
        for id in constraint_ids {
            let id = id.into();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        if ids.is_empty() {
            return Ok(None);
        }

        self.load_missing(&ids).await?;
        Ok(Some(FrequencyChecker::new(Arc::clone(&self.shared), self.writer.clone(), ids)))
    }

    /// Persists every queued occurrence. Returns once the store holds them.
    pub async fn write_pending_in_queue(&self) -> AppResult<()> {
        let (ack, done) = oneshot::channel();
        self.writer
            .send(WriteOp::Flush(Some(ack)))
            .map_err(|_| AppError::Storage("frequency limit writer stopped".to_string()))?;
        let written = done
            .await
            .map_err(|_| AppError::Storage("frequency limit writer dropped flush".to_string()))??;
        tracing::debug!(written, "Pending frequency occurrences written");
        Ok(())
    }

    /// Pulls constraints the manager has not seen yet from the store.
    async fn load_missing(&self, ids: &[String]) -> AppResult<()> {
        loop {
            let (generation, missing) = {
                let state = self.shared.state.lock();
                let missing: Vec<String> =
                    ids.iter().filter(|id| !state.constraints.contains_key(*id)).cloned().collect();
                (state.generation, missing)
            };
            if missing.is_empty() {
                return Ok(());
            }

            let store = self.store.clone();
            let now = self.shared.now();
            let loaded = tokio::task::spawn_blocking(move || load_live(&store, &missing, now))
                .await??;

            let mut state = self.shared.state.lock();
            if state.generation != generation {
                // An update landed while we were reading; the rows may be stale.
                tracing::debug!("Constraint update raced a load, reloading");
                continue;
            }
            for (record, occurrences) in loaded {
                let _ = state.constraints.entry(record.constraint_id).or_insert(ActiveConstraint {
                    count: record.count,
                    range_ms: record.range_ms,
                    occurrences,
                });
            }
            return Ok(());
        }
    }

    #[cfg(test)]
    pub(crate) fn in_memory_occurrences(&self, constraint_id: &str) -> usize {
        self.shared.state.lock().constraints.get(constraint_id).map_or(0, |c| c.occurrences.len())
    }
}

/// Reads constraints with their history, deleting rows already outside the window.
fn load_live(
    store: &FrequencyLimitStore,
    ids: &[String],
    now: i64,
) -> AppResult<Vec<(ConstraintRecord, Vec<i64>)>> {
    let mut loaded = store.get_constraints_by_ids(ids)?;
    for (record, occurrences) in &mut loaded {
        let window_start = now.saturating_sub(record.range_ms);
        let cutoff = window_start.saturating_sub(1);
        let pruned = store.prune_occurrences(&record.constraint_id, cutoff)?;
        if pruned > 0 {
            tracing::debug!(
                constraint_id = %record.constraint_id,
                pruned,
                "Pruned expired occurrences"
            );
        }
        occurrences.retain(|&t| t >= window_start);
    }
    Ok(loaded)
}
