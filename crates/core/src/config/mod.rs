//! Cache configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CACHE_*)
//! 2. TOML config file (if CACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::connection::SqliteOptions;

mod validation;

pub use validation::ConfigError;

/// Cache configuration with layered loading.
///
/// Field names match the `CACHE_` environment keys once the prefix is
/// stripped, so `CACHE_SQLITE_NAME` lands in `sqlite_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Name of the registered backend to construct.
    ///
    /// Set via CACHE_DRIVER environment variable.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Directory holding the cache files.
    ///
    /// Set via CACHE_DIR environment variable.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Default time-to-live in seconds for entries written without an explicit TTL.
    ///
    /// Set via CACHE_TTL environment variable.
    #[serde(default = "default_ttl")]
    pub ttl: u64,

    /// Namespace name; the SQLite file is `{dir}/{sqlite_name}.sqlite`.
    ///
    /// Set via CACHE_SQLITE_NAME environment variable.
    #[serde(default = "default_sqlite_name")]
    pub sqlite_name: String,

    /// Bind the connection to the thread that opened it.
    ///
    /// Set via CACHE_SQLITE_CHECK_SAME_THREAD environment variable.
    #[serde(default)]
    pub sqlite_check_same_thread: bool,

    /// Seconds to wait on a locked database before failing.
    ///
    /// Set via CACHE_SQLITE_TIMEOUT environment variable.
    #[serde(default = "default_sqlite_timeout")]
    pub sqlite_timeout: f64,

    /// Use write-ahead logging.
    ///
    /// Set via CACHE_SQLITE_WAL environment variable.
    #[serde(default)]
    pub sqlite_wal: bool,
}

fn default_driver() -> String {
    "sqlite".into()
}

fn default_dir() -> PathBuf {
    PathBuf::from("/tmp/cache")
}

fn default_ttl() -> u64 {
    900
}

fn default_sqlite_name() -> String {
    "cache".into()
}

fn default_sqlite_timeout() -> f64 {
    15.0
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            dir: default_dir(),
            ttl: default_ttl(),
            sqlite_name: default_sqlite_name(),
            sqlite_check_same_thread: false,
            sqlite_timeout: default_sqlite_timeout(),
            sqlite_wal: false,
        }
    }
}

impl CacheConfig {
    /// Default TTL as a Duration.
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl)
    }

    /// Cache directory with surrounding whitespace and trailing slashes removed.
    pub fn directory(&self) -> PathBuf {
        normalize_directory(&self.dir.to_string_lossy())
    }

    /// SQLite backend options derived from the `sqlite_*` fields.
    ///
    /// A timeout that is not a valid duration falls back to the default.
    pub fn sqlite_options(&self) -> SqliteOptions {
        SqliteOptions {
            allow_cross_thread_use: !self.sqlite_check_same_thread,
            lock_wait_timeout: Duration::try_from_secs_f64(self.sqlite_timeout)
                .unwrap_or(SqliteOptions::DEFAULT_LOCK_WAIT_TIMEOUT),
            wal_mode: self.sqlite_wal,
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CACHE_`
    /// 2. TOML file from `CACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into()),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

/// Strip whitespace and trailing slashes from a directory path.
///
/// A path made only of slashes collapses to the filesystem root.
pub fn normalize_directory(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let stripped = trimmed.trim_end_matches('/');
    if stripped.is_empty() && trimmed.starts_with('/') {
        return PathBuf::from("/");
    }
    PathBuf::from(stripped)
}
