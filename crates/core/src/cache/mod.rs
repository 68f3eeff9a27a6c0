//! TTL cache contract and its SQLite-backed implementation.
//!
//! This module provides a persistent key-value cache using SQLite through
//! rusqlite. It supports:
//!
//! - Lazy expiration: expired rows are removed when read or flushed
//! - Atomic upserts, safe for concurrent writers on one key
//! - Fallback values and producers on a miss
//! - Typed access to any serde type through [`CacheExt`]

pub mod connection;
pub mod entry;
pub mod schema;
pub mod sqlite;

use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

pub use crate::Error;

pub use connection::{SqliteOptions, SqliteStore, StoreLocation};
pub use entry::Entry;
pub use sqlite::{SqliteCache, provide_sqlite_cache};

/// A value produced on a cache miss, with an optional TTL override.
#[derive(Debug, Clone, PartialEq)]
pub struct Produced {
    pub value: Value,
    pub ttl: Option<Duration>,
}

impl Produced {
    pub fn with_ttl(value: Value, ttl: Duration) -> Self {
        Self { value, ttl: Some(ttl) }
    }
}

impl From<Value> for Produced {
    fn from(value: Value) -> Self {
        Self { value, ttl: None }
    }
}

impl From<(Value, Duration)> for Produced {
    fn from((value, ttl): (Value, Duration)) -> Self {
        Self::with_ttl(value, ttl)
    }
}

/// What [`Cache::get_or`] does on a miss.
pub enum Fallback<'a> {
    /// Return `None`.
    None,
    /// Store this value with the default TTL and return it. `null` is returned unstored.
    Value(Value),
    /// Call the producer; store and return what it yields, or return `None` if it yields nothing.
    /// A `null` value is returned unstored.
    Producer(Box<dyn FnOnce() -> Option<Produced> + 'a>),
}

impl<'a> Fallback<'a> {
    pub fn producer<F>(producer: F) -> Self
    where
        F: FnOnce() -> Option<Produced> + 'a,
    {
        Fallback::Producer(Box::new(producer))
    }
}

impl std::fmt::Debug for Fallback<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Fallback::None => f.write_str("None"),
            Fallback::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Fallback::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Key-value cache with per-entry time-to-live.
///
/// Backends implement the storage primitives; the miss policy in
/// [`Cache::get_or`] is shared by all of them.
pub trait Cache: Send + Sync {
    /// Read a live value, expiring it first if its TTL has passed.
    fn lookup(&self, key: &str) -> Result<Option<Value>, Error>;

    /// Write `value` under `key`, replacing any existing entry, and return it.
    ///
    /// `ttl` falls back to the backend's default TTL. A zero TTL writes an
    /// entry that is already expired.
    fn put(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<Value, Error>;

    /// Remove the entry for `key`. Removing a missing key is not an error.
    fn delete(&self, key: &str) -> Result<(), Error>;

    /// Remove every entry, or only the expired ones.
    fn flush(&self, expired_only: bool) -> Result<(), Error>;

    /// Release backend resources. Safe to call more than once.
    fn close(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Whether `key` holds a live, non-null value.
    fn has(&self, key: &str) -> Result<bool, Error> {
        Ok(self.get(key)?.is_some_and(|value| !value.is_null()))
    }

    fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        self.get_or(key, Fallback::None)
    }

    /// Read `key`, resolving a miss through `fallback`.
    fn get_or(&self, key: &str, fallback: Fallback<'_>) -> Result<Option<Value>, Error> {
        if let Some(value) = self.lookup(key)? {
            return Ok(Some(value));
        }

        let produced = match fallback {
            Fallback::None => return Ok(None),
            Fallback::Value(value) => Produced::from(value),
            Fallback::Producer(producer) => match producer() {
                Some(produced) => produced,
                None => return Ok(None),
            },
        };

        if produced.value.is_null() {
            return Ok(Some(Value::Null));
        }

        self.put(key, produced.value, produced.ttl).map(Some)
    }
}

/// Typed access on top of [`Cache`] for any serde type.
pub trait CacheExt: Cache {
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        match self.get(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn put_as<T: Serialize>(&self, key: &str, value: T, ttl: Option<Duration>) -> Result<T, Error> {
        let encoded = serde_json::to_value(&value)?;
        self.put(key, encoded, ttl)?;
        Ok(value)
    }

    /// Return the cached value for `key`, or compute, store and return it.
    fn remember<T, F>(&self, key: &str, ttl: Option<Duration>, producer: F) -> Result<T, Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.get_as(key)? {
            return Ok(value);
        }
        self.put_as(key, producer(), ttl)
    }
}

impl<C: Cache + ?Sized> CacheExt for C {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::collections::HashMap;

    fn cache() -> SqliteCache {
        SqliteCache::in_memory(Duration::from_secs(900))
    }

    #[test]
    fn test_get_without_fallback_misses() {
        let cache = cache();
        assert_eq!(cache.get("missing").unwrap(), None);
        assert!(!cache.has("missing").unwrap());
    }

    #[test]
    fn test_plain_fallback_is_stored() {
        let cache = cache();
        let value = cache.get_or("k", Fallback::Value(json!("fallback"))).unwrap();
        assert_eq!(value, Some(json!("fallback")));
        assert_eq!(cache.get("k").unwrap(), Some(json!("fallback")));
    }

    #[test]
    fn test_producer_result_is_cached() {
        let cache = cache();
        let calls = Cell::new(0);
        let key = "https://some.url.com/id/8b3a6052-621e-45cc-be5a-316f486c50aa";

        let produce = || {
            calls.set(calls.get() + 1);
            Some(Produced::with_ttl(json!(calls.get()), Duration::from_secs(20)))
        };

        let a = cache.get_or(key, Fallback::producer(produce)).unwrap();
        let b = cache.get(key).unwrap();

        assert_eq!(a, Some(json!(1)));
        assert_eq!(a, b);
        assert_eq!(calls.get(), 1);
        assert!(cache.has(key).unwrap());

        let remaining = cache.entry(key).unwrap().unwrap().remaining_at(entry::now());
        assert!(remaining <= Duration::from_secs(20));
        assert!(remaining > Duration::from_secs(15));
    }

    #[test]
    fn test_producer_not_called_on_hit() {
        let cache = cache();
        cache.put("k", json!("cached"), None).unwrap();

        let value = cache.get_or("k", Fallback::producer(|| panic!("producer must not run on a hit"))).unwrap();
        assert_eq!(value, Some(json!("cached")));
    }

    #[test]
    fn test_producer_yielding_nothing_is_not_stored() {
        let cache = cache();
        let value = cache.get_or("k", Fallback::producer(|| None)).unwrap();
        assert_eq!(value, None);
        assert!(cache.entry("k").unwrap().is_none());
    }

    #[test]
    fn test_null_fallback_is_not_stored() {
        let cache = cache();

        let value = cache.get_or("a", Fallback::Value(Value::Null)).unwrap();
        assert_eq!(value, Some(Value::Null));
        assert!(cache.entry("a").unwrap().is_none());
        assert!(!cache.has("a").unwrap());

        let produced = Fallback::producer(|| Some(Produced::with_ttl(Value::Null, Duration::from_secs(20))));
        let value = cache.get_or("b", produced).unwrap();
        assert_eq!(value, Some(Value::Null));
        assert!(cache.entry("b").unwrap().is_none());
        assert!(!cache.has("b").unwrap());
    }

    #[test]
    fn test_producer_without_ttl_uses_default() {
        let cache = SqliteCache::in_memory(Duration::from_secs(60));
        cache.get_or("k", Fallback::producer(|| Some(json!([1, 2]).into()))).unwrap();

        let remaining = cache.entry("k").unwrap().unwrap().remaining_at(entry::now());
        assert!(remaining > Duration::from_secs(55));
        assert!(remaining <= Duration::from_secs(60));
    }

    #[test]
    fn test_typed_round_trip() {
        #[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
        struct Token {
            subject: String,
            scopes: Vec<String>,
            claims: HashMap<String, Option<i64>>,
        }

        let cache = cache();
        let token = Token {
            subject: "svc-1".into(),
            scopes: vec!["read".into(), "write".into()],
            claims: HashMap::from([("exp".to_string(), Some(42)), ("nbf".to_string(), None)]),
        };

        let stored = cache.put_as("token", token, None).unwrap();
        let loaded: Token = cache.get_as("token").unwrap().unwrap();
        assert_eq!(loaded, stored);
    }

    #[test]
    fn test_get_as_wrong_shape_is_serialization_error() {
        let cache = cache();
        cache.put("k", json!("not a number"), None).unwrap();

        let result = cache.get_as::<u32>("k");
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_put_as_unencodable_value_fails() {
        let cache = cache();
        let bad: HashMap<Vec<u8>, i32> = HashMap::from([(vec![1], 1)]);

        let result = cache.put_as("k", bad, None);
        assert!(matches!(result, Err(Error::Serialization(_))));
        assert!(!cache.has("k").unwrap());
    }

    #[test]
    fn test_remember() {
        let cache = cache();
        let first: Vec<u32> = cache.remember("list", None, || vec![1, 2, 3]).unwrap();
        let second: Vec<u32> = cache.remember("list", None, || vec![9]).unwrap();
        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, vec![1, 2, 3]);
    }

    #[test]
    fn test_trait_object_dispatch() {
        let cache: Box<dyn Cache> = Box::new(cache());
        cache.put("k", json!({"a": 1}), None).unwrap();
        assert!(cache.has("k").unwrap());
        assert_eq!(cache.get_as::<HashMap<String, i32>>("k").unwrap().unwrap()["a"], 1);
    }
}
