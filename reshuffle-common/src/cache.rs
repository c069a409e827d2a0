//! SQLite-backed TTL cache
//!
//! A single `kv_cache` table of `(k, v, ts)` rows. Values are JSON text and
//! `ts` is the write time in epoch seconds. The TTL is supplied by each reader,
//! not stored with the row, so the same entry may be fresh for one caller and
//! stale for another.
//!
//! Freshness: a row written at `ts` is returned for TTL `t` iff `now - ts <= t`.
//! A stale read deletes the row before reporting a miss.
//!
//! Storage errors are never masked as misses; they propagate to the caller.

use crate::time::now_epoch_seconds;
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

/// Persistent key/value cache with per-read expiry
#[derive(Debug, Clone)]
pub struct TtlCache {
    pool: SqlitePool,
}

impl TtlCache {
    /// Open (creating if needed) the cache database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect(&db_url)
            .await?;

        if newly_created {
            info!("Initialized new cache database: {}", db_path.display());
        } else {
            info!("Opened existing cache database: {}", db_path.display());
        }

        // WAL lets other processes read while one writes
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the cache table if missing
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        create_kv_cache_table(&pool).await?;
        Ok(Self { pool })
    }

    /// Look up `key`, treating entries older than `ttl_seconds` as absent
    pub async fn get<T: DeserializeOwned>(&self, key: &str, ttl_seconds: u64) -> Result<Option<T>> {
        self.get_as_of(key, ttl_seconds, now_epoch_seconds()).await
    }

    /// [`TtlCache::get`] against an explicit clock reading
    pub async fn get_as_of<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl_seconds: u64,
        now: i64,
    ) -> Result<Option<T>> {
        let row: Option<(String, i64)> = sqlx::query_as("SELECT v, ts FROM kv_cache WHERE k = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        let Some((value, written_at)) = row else {
            debug!(key, "Cache miss");
            return Ok(None);
        };

        let age = now.saturating_sub(written_at);
        if age > i64::try_from(ttl_seconds).unwrap_or(i64::MAX) {
            debug!(key, age, ttl_seconds, "Cache entry expired, evicting");
            self.delete(key).await?;
            return Ok(None);
        }

        debug!(key, age, "Cache hit");
        Ok(Some(serde_json::from_str(&value)?))
    }

    /// Upsert `key`, stamping it with the current time
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.set_as_of(key, value, now_epoch_seconds()).await
    }

    /// [`TtlCache::set`] with an explicit write time
    pub async fn set_as_of<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        written_at: i64,
    ) -> Result<()> {
        let json = serde_json::to_string(value)?;

        sqlx::query("INSERT OR REPLACE INTO kv_cache (k, v, ts) VALUES (?, ?, ?)")
            .bind(key)
            .bind(&json)
            .bind(written_at)
            .execute(&self.pool)
            .await?;

        debug!(key, bytes = json.len(), "Cache entry written");
        Ok(())
    }

    /// Remove `key`; no-op if absent
    pub async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM kv_cache WHERE k = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Raw existence check, ignoring freshness
    pub async fn contains(&self, key: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM kv_cache WHERE k = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Drop every entry older than `ttl_seconds`, returning how many went
    pub async fn purge_expired(&self, ttl_seconds: u64) -> Result<u64> {
        let cutoff = now_epoch_seconds()
            .saturating_sub(i64::try_from(ttl_seconds).unwrap_or(i64::MAX));

        let result = sqlx::query("DELETE FROM kv_cache WHERE ts < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!(removed, ttl_seconds, "Purged expired cache entries");
        }
        Ok(removed)
    }
}

async fn create_kv_cache_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kv_cache (
            k TEXT PRIMARY KEY,
            v TEXT NOT NULL,
            ts INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_kv_cache_ts ON kv_cache(ts)")
        .execute(pool)
        .await?;

    Ok(())
}
