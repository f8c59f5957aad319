//! Persistent TTL cache for remote resolution results.
//!
//! Entries are JSON values keyed by string. Each entry carries its expiry and
//! the app/SDK versions it was written under; an expired or version-mismatched
//! entry is deleted on read and reported as a miss.

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use automation_types::AutomationConfig;

use crate::clock::Clock;
use crate::error::AppResult;
use crate::utils::paths::resolve_data_dir;

const CACHE_DB_FILE: &str = "automation_cache.db";

#[derive(Clone)]
pub struct ResultCache {
    conn: Arc<Mutex<Connection>>,
    clock: Arc<dyn Clock>,
    app_version: String,
    sdk_version: String,
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("app_version", &self.app_version)
            .field("sdk_version", &self.sdk_version)
            .finish_non_exhaustive()
    }
}

struct CacheRow {
    data: String,
    expire_on: i64,
    app_version: String,
    sdk_version: String,
}

impl ResultCache {
    pub fn open(
        path: &Path,
        clock: Arc<dyn Clock>,
        app_version: impl Into<String>,
        sdk_version: impl Into<String>,
    ) -> AppResult<Self> {
        Self::with_connection(Connection::open(path)?, clock, app_version, sdk_version)
    }

    pub fn open_in_memory(
        clock: Arc<dyn Clock>,
        app_version: impl Into<String>,
        sdk_version: impl Into<String>,
    ) -> AppResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, clock, app_version, sdk_version)
    }

    /// Opens the cache described by `config.storage`, bound to its versions.
    pub fn from_config(config: &AutomationConfig, clock: Arc<dyn Clock>) -> AppResult<Self> {
        if !config.storage.persistent {
            return Self::open_in_memory(clock, &config.app_version, &config.sdk_version);
        }
        let dir = resolve_data_dir(config.storage.data_dir.as_deref())?;
        Self::open(&dir.join(CACHE_DB_FILE), clock, &config.app_version, &config.sdk_version)
    }

    fn with_connection(
        conn: Connection,
        clock: Arc<dyn Clock>,
        app_version: impl Into<String>,
        sdk_version: impl Into<String>,
    ) -> AppResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cache_items (
                key TEXT PRIMARY KEY NOT NULL,
                data TEXT NOT NULL,
                expire_on INTEGER NOT NULL,
                app_version TEXT NOT NULL,
                sdk_version TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_cache_items_expire_on ON cache_items (expire_on);",
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            clock,
            app_version: app_version.into(),
            sdk_version: sdk_version.into(),
        })
    }

    /// Stores `value` under `key` for `ttl`, replacing any previous entry.
    pub async fn store<T: Serialize>(&self, value: &T, key: &str, ttl: Duration) -> AppResult<()> {
        let data = serde_json::to_string(value)?;
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expire_on = self.clock.current_time_millis().saturating_add(ttl_ms);

        let conn = Arc::clone(&self.conn);
        let key_owned = key.to_string();
        let app_version = self.app_version.clone();
        let sdk_version = self.sdk_version.clone();
        tokio::task::spawn_blocking(move || -> AppResult<()> {
            let _rows_affected: usize = conn.lock().execute(
                "INSERT INTO cache_items (key, data, expire_on, app_version, sdk_version)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(key) DO UPDATE SET
                    data = excluded.data,
                    expire_on = excluded.expire_on,
                    app_version = excluded.app_version,
                    sdk_version = excluded.sdk_version",
                params![key_owned, data, expire_on, app_version, sdk_version],
            )?;
            Ok(())
        })
        .await??;

        tracing::debug!(key, expire_on, "Cached result");
        Ok(())
    }

    /// Returns the live entry for `key`, or `None` on a miss.
    pub async fn get_cached<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let conn = Arc::clone(&self.conn);
        let key_owned = key.to_string();
        let row = tokio::task::spawn_blocking(move || -> AppResult<Option<CacheRow>> {
            let row = conn
                .lock()
                .query_row(
                    "SELECT data, expire_on, app_version, sdk_version
                     FROM cache_items WHERE key = ?1",
                    params![key_owned],
                    |row| {
                        Ok(CacheRow {
                            data: row.get(0)?,
                            expire_on: row.get(1)?,
                            app_version: row.get(2)?,
                            sdk_version: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row)
        })
        .await??;

        let Some(row) = row else {
            return Ok(None);
        };

        let now = self.clock.current_time_millis();
        if row.expire_on <= now {
            tracing::debug!(key, "Cached result expired");
            self.remove(key).await?;
            return Ok(None);
        }
        if row.app_version != self.app_version || row.sdk_version != self.sdk_version {
            tracing::debug!(
                key,
                cached_app_version = %row.app_version,
                cached_sdk_version = %row.sdk_version,
                "Cached result from another version"
            );
            self.remove(key).await?;
            return Ok(None);
        }

        match serde_json::from_str(&row.data) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Unreadable cache entry, dropping");
                self.remove(key).await?;
                Ok(None)
            },
        }
    }

    pub async fn remove(&self, key: &str) -> AppResult<()> {
        let conn = Arc::clone(&self.conn);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || -> AppResult<()> {
            let _rows_affected: usize =
                conn.lock().execute("DELETE FROM cache_items WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await?
    }

    /// Deletes every expired entry. Returns how many were removed.
    pub async fn sweep_expired(&self) -> AppResult<usize> {
        let conn = Arc::clone(&self.conn);
        let now = self.clock.current_time_millis();
        let removed = tokio::task::spawn_blocking(move || -> AppResult<usize> {
            Ok(conn.lock().execute("DELETE FROM cache_items WHERE expire_on <= ?1", params![now])?)
        })
        .await??;

        if removed > 0 {
            tracing::info!(removed, "Swept expired cache entries");
        }
        Ok(removed)
    }

    pub async fn clear(&self) -> AppResult<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> AppResult<()> {
            let _rows_affected: usize = conn.lock().execute("DELETE FROM cache_items", [])?;
            Ok(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        allowed: bool,
    }

    fn cache_with(clock: &Arc<TestClock>, app_version: &str) -> ResultCache {
        ResultCache::open_in_memory(clock.clone(), app_version, "1.0.0").unwrap()
    }

    #[tokio::test]
    async fn test_hit_before_ttl_miss_after() {
        let clock = Arc::new(TestClock::new(1_000));
        let cache = cache_with(&clock, "1.0");

        cache.store(&Entry { allowed: true }, "key", Duration::from_secs(5)).await.unwrap();

        clock.advance(4_999);
        assert_eq!(cache.get_cached::<Entry>("key").await.unwrap(), Some(Entry { allowed: true }));

        clock.advance(1);
        assert_eq!(cache.get_cached::<Entry>("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_version_change_invalidates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_DB_FILE);
        let clock = Arc::new(TestClock::new(0));

        {
            let cache = ResultCache::open(&path, clock.clone(), "1.0", "1.0.0").unwrap();
            cache.store(&Entry { allowed: false }, "key", Duration::from_secs(60)).await.unwrap();
            assert!(cache.get_cached::<Entry>("key").await.unwrap().is_some());
        }

        let upgraded = ResultCache::open(&path, clock.clone(), "1.1", "1.0.0").unwrap();
        assert_eq!(upgraded.get_cached::<Entry>("key").await.unwrap(), None);

        // The stale row is gone, not just hidden.
        let same_version = ResultCache::open(&path, clock, "1.0", "1.0.0").unwrap();
        assert_eq!(same_version.get_cached::<Entry>("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_replaces_entry() {
        let clock = Arc::new(TestClock::new(0));
        let cache = cache_with(&clock, "1.0");

        cache.store(&Entry { allowed: true }, "key", Duration::from_secs(1)).await.unwrap();
        cache.store(&Entry { allowed: false }, "key", Duration::from_secs(10)).await.unwrap();

        clock.advance(5_000);
        assert_eq!(cache.get_cached::<Entry>("key").await.unwrap(), Some(Entry { allowed: false }));
    }

    #[tokio::test]
    async fn test_unparseable_entry_is_a_miss() {
        let clock = Arc::new(TestClock::new(0));
        let cache = cache_with(&clock, "1.0");

        cache.store(&"just a string", "key", Duration::from_secs(10)).await.unwrap();
        assert_eq!(cache.get_cached::<Entry>("key").await.unwrap(), None);
        assert_eq!(cache.get_cached::<String>("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sweep_remove_and_clear() {
        let clock = Arc::new(TestClock::new(0));
        let cache = cache_with(&clock, "1.0");

        cache.store(&Entry { allowed: true }, "short", Duration::from_secs(1)).await.unwrap();
        cache.store(&Entry { allowed: true }, "long", Duration::from_secs(100)).await.unwrap();
        cache.store(&Entry { allowed: true }, "other", Duration::from_secs(100)).await.unwrap();

        clock.advance(2_000);
        assert_eq!(cache.sweep_expired().await.unwrap(), 1);

        cache.remove("long").await.unwrap();
        assert_eq!(cache.get_cached::<Entry>("long").await.unwrap(), None);
        assert!(cache.get_cached::<Entry>("other").await.unwrap().is_some());

        cache.clear().await.unwrap();
        assert_eq!(cache.get_cached::<Entry>("other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_from_config() {
        let mut config = AutomationConfig::new();
        config.storage.persistent = false;
        let cache = ResultCache::from_config(&config, Arc::new(TestClock::new(0))).unwrap();

        cache.store(&Entry { allowed: true }, "key", Duration::from_secs(1)).await.unwrap();
        assert!(cache.get_cached::<Entry>("key").await.unwrap().is_some());
    }
}
