//! Configuration validation rules.
//!
//! This module provides validation logic for `CacheConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::CacheConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl CacheConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `driver` is empty
    /// - `sqlite_name` is empty or contains a path separator
    /// - `sqlite_timeout` is negative or not finite
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "driver".into(), reason: "must not be empty".into() });
        }

        if self.sqlite_name.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "sqlite_name".into(), reason: "must not be empty".into() });
        }
        if self.sqlite_name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "sqlite_name".into(),
                reason: "must not contain path separators".into(),
            });
        }

        if !self.sqlite_timeout.is_finite() || self.sqlite_timeout < 0.0 {
            return Err(ConfigError::Invalid {
                field: "sqlite_timeout".into(),
                reason: "must be a non-negative number of seconds".into(),
            });
        }

        if self.ttl == 0 {
            tracing::warn!("ttl is 0; entries written without an explicit TTL expire immediately");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_driver() {
        let config = CacheConfig { driver: "  ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "driver"));
    }

    #[test]
    fn test_validate_empty_name() {
        let config = CacheConfig { sqlite_name: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sqlite_name"));
    }

    #[test]
    fn test_validate_name_with_separator() {
        let config = CacheConfig { sqlite_name: "../escape".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sqlite_name"));
    }

    #[test]
    fn test_validate_negative_timeout() {
        let config = CacheConfig { sqlite_timeout: -1.0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "sqlite_timeout"));
    }

    #[test]
    fn test_validate_nan_timeout() {
        let config = CacheConfig { sqlite_timeout: f64::NAN, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = CacheConfig { ttl: 0, sqlite_timeout: 0.0, ..Default::default() }; // minimum valid values
        assert!(config.validate().is_ok());
    }
}
