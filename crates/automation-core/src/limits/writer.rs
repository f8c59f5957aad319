//! Serial write queue for the frequency limit store.
//!
//! Exactly one task drains this queue, so occurrence flushes and constraint
//! updates reach SQLite in submission order. Before every operation the worker
//! flushes whatever occurrences are pending, which means an update always sees
//! the increments that were recorded before it was submitted.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use automation_types::FrequencyConstraint;

use super::state::{ActiveConstraint, SharedLimits};
use super::store::{ConstraintRecord, FrequencyLimitStore};
use crate::error::{AppError, AppResult};

pub(crate) enum WriteOp {
    /// Persist pending occurrences; acknowledge when asked to.
    Flush(Option<oneshot::Sender<AppResult<usize>>>),
    /// Replace the full constraint set.
    Update { constraints: Vec<FrequencyConstraint>, ack: oneshot::Sender<AppResult<()>> },
}

pub(crate) type WriteQueue = mpsc::UnboundedSender<WriteOp>;

pub(crate) async fn run_writer(
    store: FrequencyLimitStore,
    shared: Arc<SharedLimits>,
    mut rx: mpsc::UnboundedReceiver<WriteOp>,
) {
    while let Some(op) = rx.recv().await {
        let flushed = flush_pending(&store, &shared).await;

        match op {
            WriteOp::Flush(Some(ack)) => {
                let _ = ack.send(flushed);
            },
            WriteOp::Flush(None) => {
                if let Err(e) = flushed {
                    tracing::warn!(error = %e, "Failed to persist frequency occurrences, will retry");
                }
            },
            WriteOp::Update { constraints, ack } => {
                if let Err(e) = &flushed {
                    tracing::warn!(error = %e, "Flush before constraint update failed");
                }
                let result = apply_update(&store, &shared, constraints).await;
                if let Err(e) = &result {
                    tracing::error!(error = %e, "Failed to update frequency constraints");
                }
                let _ = ack.send(result);
            },
        }
    }
    tracing::debug!("Frequency limit writer stopped");
}

async fn flush_pending(store: &FrequencyLimitStore, shared: &SharedLimits) -> AppResult<usize> {
    let pending = std::mem::take(&mut shared.state.lock().pending);
    if pending.is_empty() {
        return Ok(0);
    }

    let writer = store.clone();
    let batch = pending.clone();
    let result = tokio::task::spawn_blocking(move || writer.insert_occurrences(&batch))
        .await
        .map_err(AppError::from)
        .and_then(|inner| inner);

    match result {
        Ok(written) => {
            tracing::debug!(written, queued = pending.len(), "Flushed frequency occurrences");
            Ok(written)
        },
        Err(e) => {
            // Put the batch back in front of anything recorded meanwhile.
            let mut state = shared.state.lock();
            let newer = std::mem::replace(&mut state.pending, pending);
            state.pending.extend(newer);
            Err(e)
        },
    }
}

async fn apply_update(
    store: &FrequencyLimitStore,
    shared: &SharedLimits,
    constraints: Vec<FrequencyConstraint>,
) -> AppResult<()> {
    let in_memory: HashSet<String> = shared.state.lock().constraints.keys().cloned().collect();

    let blocking_store = store.clone();
    let incoming = constraints.clone();
    let outcome = tokio::task::spawn_blocking(move || -> AppResult<UpdateOutcome> {
        let existing: HashMap<String, ConstraintRecord> = blocking_store
            .get_constraints()?
            .into_iter()
            .map(|record| (record.constraint_id.clone(), record))
            .collect();

        let incoming_ids: HashSet<&str> = incoming.iter().map(|c| c.identifier.as_str()).collect();
        let removed: Vec<String> =
            existing.keys().filter(|id| !incoming_ids.contains(id.as_str())).cloned().collect();

        let mut cleared = Vec::new();
        let mut upserts = Vec::with_capacity(incoming.len());
        for constraint in &incoming {
            let range_ms = constraint.range_millis();
            if let Some(previous) = existing.get(&constraint.identifier) {
                if previous.range_ms != range_ms {
                    cleared.push(constraint.identifier.clone());
                }
            }
            upserts.push(ConstraintRecord {
                constraint_id: constraint.identifier.clone(),
                count: constraint.count,
                range_ms,
            });
        }

        blocking_store.apply_update(&upserts, &cleared, &removed)?;

        let not_loaded: Vec<String> = incoming
            .iter()
            .map(|c| c.identifier.clone())
            .filter(|id| !in_memory.contains(id))
            .collect();
        let loaded = blocking_store.get_constraints_by_ids(&not_loaded)?;

        Ok(UpdateOutcome { cleared, removed, loaded })
    })
    .await??;

    let mut state = shared.state.lock();
    state.generation += 1;

    let cleared: HashSet<&str> = outcome.cleared.iter().map(String::as_str).collect();
    let removed: HashSet<&str> = outcome.removed.iter().map(String::as_str).collect();
    let incoming_ids: HashSet<&str> = constraints.iter().map(|c| c.identifier.as_str()).collect();

    // Increments recorded since the flush belong to the old definition.
    state.pending.retain(|o| {
        let id = o.parent_constraint_id.as_str();
        !cleared.contains(id) && !removed.contains(id) && incoming_ids.contains(id)
    });
    state.constraints.retain(|id, _| incoming_ids.contains(id.as_str()));

    let mut loaded: HashMap<String, Vec<i64>> = outcome
        .loaded
        .into_iter()
        .map(|(record, occurrences)| (record.constraint_id, occurrences))
        .collect();

    for constraint in &constraints {
        let range_ms = constraint.range_millis();
        match state.constraints.get_mut(&constraint.identifier) {
            Some(active) => {
                if active.range_ms != range_ms || cleared.contains(constraint.identifier.as_str()) {
                    active.occurrences.clear();
                }
                active.count = constraint.count;
                active.range_ms = range_ms;
            },
            None => {
                let occurrences = loaded.remove(&constraint.identifier).unwrap_or_default();
                let _ = state.constraints.insert(
                    constraint.identifier.clone(),
                    ActiveConstraint { count: constraint.count, range_ms, occurrences },
                );
            },
        }
    }

    tracing::info!(
        total = constraints.len(),
        cleared = outcome.cleared.len(),
        removed = outcome.removed.len(),
        "Frequency constraints updated"
    );
    Ok(())
}

struct UpdateOutcome {
    cleared: Vec<String>,
    removed: Vec<String>,
    loaded: Vec<(ConstraintRecord, Vec<i64>)>,
}
