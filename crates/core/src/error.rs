//! Unified error types for the cache.
//!
//! Messages carry an upper-snake code prefix so callers can match on the
//! category in logs without inspecting the variant.

use rusqlite::ErrorCode;

use crate::config::ConfigError;

/// Unified error type for cache stores, engines and the provider.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The cache directory or database file could not be created or opened.
    #[error("STORAGE_UNAVAILABLE: {0}")]
    StorageUnavailable(String),

    /// The lock-wait timeout elapsed while another connection held the database.
    #[error("STORE_LOCKED: {0}")]
    StoreLocked(String),

    /// A value could not be encoded to or decoded from its stored form.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),

    /// The configured driver has no constructor in the registry.
    #[error("UNKNOWN_BACKEND: {0}")]
    UnknownBackend(String),

    /// The connection was used from a thread other than the one that opened it.
    #[error("CROSS_THREAD_ACCESS: connection is bound to the thread that opened it")]
    CrossThreadAccess,

    /// Configuration could not be loaded or failed validation.
    #[error("CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    /// Any other SQLite failure.
    #[error("CACHE_ERROR: {0}")]
    Database(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => Error::StoreLocked(err.to_string()),
            Some(ErrorCode::CannotOpen | ErrorCode::PermissionDenied | ErrorCode::ReadOnly) => {
                Error::StorageUnavailable(err.to_string())
            }
            _ => Error::Database(err),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: std::ffi::c_int) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn test_error_display() {
        let err = Error::UnknownBackend("redis".to_string());
        assert!(err.to_string().contains("UNKNOWN_BACKEND"));
        assert!(err.to_string().contains("redis"));
    }

    #[test]
    fn test_busy_maps_to_store_locked() {
        let err: Error = sqlite_failure(rusqlite::ffi::SQLITE_BUSY).into();
        assert!(matches!(err, Error::StoreLocked(_)));

        let err: Error = sqlite_failure(rusqlite::ffi::SQLITE_LOCKED).into();
        assert!(matches!(err, Error::StoreLocked(_)));
    }

    #[test]
    fn test_cannot_open_maps_to_storage_unavailable() {
        let err: Error = sqlite_failure(rusqlite::ffi::SQLITE_CANTOPEN).into();
        assert!(matches!(err, Error::StorageUnavailable(_)));
    }

    #[test]
    fn test_other_failures_stay_database_errors() {
        let err: Error = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.to_string().starts_with("SERIALIZATION_ERROR"));
    }
}
