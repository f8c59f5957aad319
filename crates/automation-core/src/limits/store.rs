//! SQLite-backed persistence for frequency constraints and their occurrences.
//!
//! One connection guarded by a mutex; every multi-statement change runs in a
//! transaction so readers only ever see the full pre- or post-write state.

use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use automation_types::AutomationConfig;

use crate::error::AppResult;
use crate::utils::paths::resolve_data_dir;

const LIMITS_DB_FILE: &str = "frequency_limits.db";

/// SQLite caps bound parameters per statement; stay well below it.
const DELETE_BATCH_SIZE: usize = 500;

/// Persisted constraint definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintRecord {
    pub constraint_id: String,
    pub count: u32,
    pub range_ms: i64,
}

/// One recorded occurrence of a constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceRecord {
    pub parent_constraint_id: String,
    pub timestamp: i64,
}

#[derive(Clone)]
pub struct FrequencyLimitStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for FrequencyLimitStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrequencyLimitStore").finish_non_exhaustive()
    }
}

impl FrequencyLimitStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    /// Opens the store described by `config.storage`.
    pub fn from_config(config: &AutomationConfig) -> AppResult<Self> {
        if !config.storage.persistent {
            return Self::open_in_memory();
        }
        let dir = resolve_data_dir(config.storage.data_dir.as_deref())?;
        Self::open(&dir.join(LIMITS_DB_FILE))
    }

    fn with_connection(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE IF NOT EXISTS constraints (
                constraint_id TEXT PRIMARY KEY NOT NULL,
                count INTEGER NOT NULL,
                range_ms INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS occurrences (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_constraint_id TEXT NOT NULL
                    REFERENCES constraints (constraint_id) ON DELETE CASCADE,
                timestamp INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_occurrences_parent
                ON occurrences (parent_constraint_id, timestamp);",
        )?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn get_constraints(&self) -> AppResult<Vec<ConstraintRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT constraint_id, count, range_ms FROM constraints ORDER BY constraint_id",
        )?;
        let rows = stmt.query_map([], map_constraint)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    pub fn get_constraint(&self, constraint_id: &str) -> AppResult<Option<ConstraintRecord>> {
        let conn = self.conn.lock();
        let record = conn
            .query_row(
                "SELECT constraint_id, count, range_ms FROM constraints WHERE constraint_id = ?1",
                params![constraint_id],
                map_constraint,
            )
            .optional()?;
        Ok(record)
    }

    /// Loads definitions plus their occurrence timestamps (ascending) in one read.
    pub fn get_constraints_by_ids(
        &self,
        ids: &[String],
    ) -> AppResult<Vec<(ConstraintRecord, Vec<i64>)>> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        let mut loaded = Vec::with_capacity(ids.len());
        {
            let mut constraint_stmt = tx.prepare(
                "SELECT constraint_id, count, range_ms FROM constraints WHERE constraint_id = ?1",
            )?;
            let mut occurrence_stmt = tx.prepare(
                "SELECT timestamp FROM occurrences WHERE parent_constraint_id = ?1
                 ORDER BY timestamp ASC, id ASC",
            )?;
            for id in ids {
                let Some(record) =
                    constraint_stmt.query_row(params![id], map_constraint).optional()?
                else {
                    continue;
                };
                let timestamps = occurrence_stmt
                    .query_map(params![id], |row| row.get::<_, i64>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                loaded.push((record, timestamps));
            }
        }
        tx.commit()?;
        Ok(loaded)
    }

    pub fn upsert_constraint(&self, record: &ConstraintRecord) -> AppResult<()> {
        let conn = self.conn.lock();
        let _rows_affected: usize = conn.execute(
            "INSERT INTO constraints (constraint_id, count, range_ms) VALUES (?1, ?2, ?3)
             ON CONFLICT (constraint_id) DO UPDATE SET
                count = excluded.count,
                range_ms = excluded.range_ms",
            params![record.constraint_id, record.count, record.range_ms],
        )?;
        Ok(())
    }

    /// Deletes constraints (and, by cascade, their occurrences) in batches.
    pub fn delete_constraints(&self, ids: &[String]) -> AppResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut deleted = 0;
        for chunk in ids.chunks(DELETE_BATCH_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("DELETE FROM constraints WHERE constraint_id IN ({placeholders})");
            deleted += tx.execute(&sql, params_from_iter(chunk.iter()))?;
        }
        tx.commit()?;
        Ok(deleted)
    }

    /// Applies a full constraint update atomically.
    ///
    /// `upserts` are written, `cleared` lose their occurrence history, and
    /// `removed` are deleted together with their occurrences.
    pub fn apply_update(
        &self,
        upserts: &[ConstraintRecord],
        cleared: &[String],
        removed: &[String],
    ) -> AppResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for chunk in removed.chunks(DELETE_BATCH_SIZE) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("DELETE FROM constraints WHERE constraint_id IN ({placeholders})");
            let _rows_affected: usize = tx.execute(&sql, params_from_iter(chunk.iter()))?;
        }
        for id in cleared {
            let _rows_affected: usize = tx
                .execute("DELETE FROM occurrences WHERE parent_constraint_id = ?1", params![id])?;
        }
        for record in upserts {
            let _rows_affected: usize = tx.execute(
                "INSERT INTO constraints (constraint_id, count, range_ms) VALUES (?1, ?2, ?3)
                 ON CONFLICT (constraint_id) DO UPDATE SET
                    count = excluded.count,
                    range_ms = excluded.range_ms",
                params![record.constraint_id, record.count, record.range_ms],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Inserts occurrences in one transaction, skipping any whose constraint no
    /// longer exists. Returns the number written.
    pub fn insert_occurrences(&self, occurrences: &[OccurrenceRecord]) -> AppResult<usize> {
        if occurrences.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO occurrences (parent_constraint_id, timestamp)
                 SELECT ?1, ?2 WHERE EXISTS (SELECT 1 FROM constraints WHERE constraint_id = ?1)",
            )?;
            for occurrence in occurrences {
                written += stmt.execute(params![occurrence.parent_constraint_id, occurrence.timestamp])?;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    pub fn get_occurrences(&self, constraint_id: &str) -> AppResult<Vec<OccurrenceRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT parent_constraint_id, timestamp FROM occurrences
             WHERE parent_constraint_id = ?1 ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![constraint_id], |row| {
            Ok(OccurrenceRecord { parent_constraint_id: row.get(0)?, timestamp: row.get(1)? })
        })?;
        let mut occurrences = Vec::new();
        for row in rows {
            occurrences.push(row?);
        }
        Ok(occurrences)
    }

    pub fn delete_occurrences(&self, constraint_id: &str) -> AppResult<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM occurrences WHERE parent_constraint_id = ?1",
            params![constraint_id],
        )?;
        Ok(deleted)
    }

    /// Deletes occurrences at or before `cutoff` (they can no longer fall in any window).
    pub fn prune_occurrences(&self, constraint_id: &str, cutoff: i64) -> AppResult<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute(
            "DELETE FROM occurrences WHERE parent_constraint_id = ?1 AND timestamp <= ?2",
            params![constraint_id, cutoff],
        )?;
        Ok(deleted)
    }
}

fn map_constraint(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConstraintRecord> {
    Ok(ConstraintRecord { constraint_id: row.get(0)?, count: row.get(1)?, range_ms: row.get(2)? })
}
