//! SQLite-backed TTL cache.
//!
//! Values are stored as JSON text next to an absolute `expire_at`. Expired
//! rows are never swept in the background: a read that finds one deletes it
//! and reports a miss, and `flush(true)` removes the rest.

use std::path::PathBuf;
use std::time::Duration;

use rusqlite::params;
use serde_json::Value;

use super::connection::{SqliteOptions, SqliteStore};
use super::entry::{self, Entry};
use super::Cache;
use crate::Error;
use crate::config::CacheConfig;

const GET_SQL: &str = "SELECT `value`, `expire_at` FROM `entries` WHERE `key` = ?1";
const DELETE_SQL: &str = "DELETE FROM `entries` WHERE `key` = ?1";
const EXPIRE_SQL: &str = "DELETE FROM `entries` WHERE `key` = ?1 AND `expire_at` <= ?2";
const DELETE_EXPIRED_SQL: &str = "DELETE FROM `entries` WHERE `expire_at` <= ?1";
const CLEAR_SQL: &str = "DELETE FROM `entries`";
const UPSERT_SQL: &str = "INSERT INTO `entries` (`key`, `value`, `expire_at`) VALUES (?1, ?2, ?3)
     ON CONFLICT(`key`) DO UPDATE SET `value` = excluded.`value`, `expire_at` = excluded.`expire_at`";

/// Persistent TTL cache over one SQLite namespace file.
#[derive(Debug)]
pub struct SqliteCache {
    store: SqliteStore,
    ttl: Duration,
}

impl SqliteCache {
    /// Default time-to-live for entries written without one (15 minutes).
    pub const DEFAULT_TTL: Duration = Duration::from_secs(900);

    /// Cache stored in `{directory}/{name}.sqlite`.
    ///
    /// Nothing is opened until the first operation.
    pub fn new(
        directory: impl Into<PathBuf>, name: impl Into<String>, ttl: Duration, options: SqliteOptions,
    ) -> Self {
        Self::with_store(SqliteStore::new(directory, name, options), ttl)
    }

    /// Cache kept in a private in-memory database.
    pub fn in_memory(ttl: Duration) -> Self {
        Self::with_store(SqliteStore::in_memory(SqliteOptions::default()), ttl)
    }

    pub fn with_store(store: SqliteStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Build a cache from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration fails validation.
    pub fn from_config(config: &CacheConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::new(config.directory(), config.sqlite_name.clone(), config.default_ttl(), config.sqlite_options()))
    }

    pub fn default_ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// The raw row for `key`, expired or not, without touching it.
    pub fn entry(&self, key: &str) -> Result<Option<Entry>, Error> {
        self.store.query_one(GET_SQL, [key], |row| {
            Ok(Entry {
                key: key.to_string(),
                value: row.get::<_, Option<String>>(0)?.unwrap_or_else(|| "null".to_string()),
                expire_at: row.get::<_, Option<f64>>(1)?.unwrap_or(f64::INFINITY),
            })
        })
    }
}

impl Cache for SqliteCache {
    fn lookup(&self, key: &str) -> Result<Option<Value>, Error> {
        let Some(entry) = self.entry(key)? else {
            return Ok(None);
        };

        let now = entry::now();
        if entry.is_expired_at(now) {
            // Conditional on expiry so a concurrent fresh write survives.
            self.store.execute(EXPIRE_SQL, params![key, now])?;
            tracing::debug!(key, "cache entry expired");
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&entry.value)?))
    }

    fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<Value, Error> {
        let serialized = serde_json::to_string(&value)?;
        let expire_at = entry::expire_at(entry::now(), ttl.unwrap_or(self.ttl));

        self.store.execute(UPSERT_SQL, params![key, serialized, expire_at])?;

        Ok(value)
    }

    fn delete(&self, key: &str) -> Result<(), Error> {
        self.store.execute(DELETE_SQL, [key])?;
        Ok(())
    }

    fn flush(&self, expired_only: bool) -> Result<(), Error> {
        let removed = if expired_only {
            self.store.execute(DELETE_EXPIRED_SQL, [entry::now()])?
        } else {
            self.store.execute(CLEAR_SQL, [])?
        };

        tracing::debug!(removed, expired_only, "cache flushed");
        Ok(())
    }

    fn close(&self) -> Result<(), Error> {
        self.store.close()
    }
}

/// Registry constructor for the `sqlite` driver.
pub fn provide_sqlite_cache(config: &CacheConfig) -> Result<Box<dyn Cache>, Error> {
    Ok(Box::new(SqliteCache::from_config(config)?))
}
