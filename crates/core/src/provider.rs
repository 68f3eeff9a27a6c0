//! Backend selection by configuration.
//!
//! A [`Registry`] maps driver names to constructors. [`provide_cache`] looks
//! up `config.driver` and builds the cache; new backends are added by
//! registering another constructor, without touching the dispatch.

use std::collections::BTreeMap;
use std::fmt;

use crate::Error;
use crate::cache::{Cache, provide_sqlite_cache};
use crate::config::CacheConfig;

/// Builds a cache from configuration.
pub type Constructor = Box<dyn Fn(&CacheConfig) -> Result<Box<dyn Cache>, Error> + Send + Sync>;

/// Driver name to constructor mapping.
#[derive(Default)]
pub struct Registry {
    constructors: BTreeMap<String, Constructor>,
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `sqlite` driver.
    pub fn with_defaults() -> Self {
        Self::new().with("sqlite", provide_sqlite_cache)
    }

    /// Register `constructor` under `driver`, replacing any previous one.
    pub fn register<F>(&mut self, driver: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&CacheConfig) -> Result<Box<dyn Cache>, Error> + Send + Sync + 'static,
    {
        self.constructors.insert(driver.into(), Box::new(constructor));
        self
    }

    /// Builder form of [`Registry::register`].
    pub fn with<F>(mut self, driver: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&CacheConfig) -> Result<Box<dyn Cache>, Error> + Send + Sync + 'static,
    {
        self.register(driver, constructor);
        self
    }

    pub fn contains(&self, driver: &str) -> bool {
        self.constructors.contains_key(driver)
    }

    /// Registered driver names in sorted order.
    pub fn drivers(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    fn get(&self, driver: &str) -> Option<&Constructor> {
        self.constructors.get(driver)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("drivers", &self.drivers().collect::<Vec<_>>()).finish()
    }
}

/// Construct the cache named by `config.driver`.
///
/// # Errors
///
/// Returns `Error::UnknownBackend` if the driver is not registered, or the
/// constructor's own error.
pub fn provide_cache(config: &CacheConfig, registry: &Registry) -> Result<Box<dyn Cache>, Error> {
    let Some(constructor) = registry.get(&config.driver) else {
        tracing::warn!(driver = %config.driver, known = ?registry.drivers().collect::<Vec<_>>(), "unknown cache driver");
        return Err(Error::UnknownBackend(config.driver.clone()));
    };

    tracing::debug!(driver = %config.driver, "providing cache");
    constructor(config)
}
