//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database on first use, applying the
//! lock-wait timeout and journal pragmas, creating the schema, and running
//! single statements inside their own transaction.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, ThreadId};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, Params, Row};

use super::schema;
use crate::Error;

/// File extension of namespace databases.
pub const STORE_EXTENSION: &str = "sqlite";

/// Store-specific tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct SqliteOptions {
    /// Allow the connection to be used from threads other than the one that opened it.
    pub allow_cross_thread_use: bool,
    /// How long to wait for another connection's lock before failing with `StoreLocked`.
    pub lock_wait_timeout: Duration,
    /// Switch the journal to write-ahead logging.
    pub wal_mode: bool,
}

impl SqliteOptions {
    /// Default lock-wait timeout (15 seconds).
    pub const DEFAULT_LOCK_WAIT_TIMEOUT: Duration = Duration::from_secs(15);
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self { allow_cross_thread_use: true, lock_wait_timeout: Self::DEFAULT_LOCK_WAIT_TIMEOUT, wal_mode: false }
    }
}

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// `{directory}/{name}.sqlite`, with the directory created on first open.
    File { directory: PathBuf, name: String },
    /// A private in-memory database, discarded on close.
    Memory,
}

impl StoreLocation {
    /// Path of the database file, if any.
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            StoreLocation::File { directory, name } => Some(directory.join(format!("{name}.{STORE_EXTENSION}"))),
            StoreLocation::Memory => None,
        }
    }
}

#[derive(Debug)]
struct Handle {
    conn: Connection,
    owner: ThreadId,
}

/// Lazily opened SQLite handle for one cache namespace.
///
/// The connection is opened on first use and reused afterwards. The mutex
/// serializes both the first open and every statement, so the handle can be
/// shared between threads when the options allow it.
#[derive(Debug)]
pub struct SqliteStore {
    location: StoreLocation,
    options: SqliteOptions,
    handle: Mutex<Option<Handle>>,
}

impl SqliteStore {
    /// Create a store for `{directory}/{name}.sqlite`. Nothing touches the disk until first use.
    pub fn new(directory: impl Into<PathBuf>, name: impl Into<String>, options: SqliteOptions) -> Self {
        Self::with_location(StoreLocation::File { directory: directory.into(), name: name.into() }, options)
    }

    /// Create a store backed by a private in-memory database.
    pub fn in_memory(options: SqliteOptions) -> Self {
        Self::with_location(StoreLocation::Memory, options)
    }

    pub fn with_location(location: StoreLocation, options: SqliteOptions) -> Self {
        Self { location, options, handle: Mutex::new(None) }
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    /// Whether a connection is currently open.
    pub fn is_open(&self) -> bool {
        self.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Run `f` against the live connection, opening it first if needed.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the database cannot be opened,
    /// `CrossThreadAccess` if the handle is bound to another thread, or
    /// whatever `f` returns.
    pub fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T, Error>) -> Result<T, Error> {
        let mut guard = self.lock()?;

        let handle = match guard.take() {
            Some(handle) => handle,
            None => self.open()?,
        };
        let handle = guard.insert(handle);

        if !self.options.allow_cross_thread_use && handle.owner != thread::current().id() {
            return Err(Error::CrossThreadAccess);
        }

        f(&mut handle.conn)
    }

    /// Execute one statement in its own transaction.
    ///
    /// Commits on success; the transaction rolls back when dropped on error.
    /// Returns the number of rows changed.
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize, Error> {
        self.with_connection(|conn| {
            let tx = conn.transaction()?;
            let changed = tx.execute(sql, params)?;
            tx.commit()?;
            Ok(changed)
        })
    }

    /// Run a query expected to return at most one row.
    ///
    /// "No rows" is `Ok(None)`, not an error.
    pub fn query_one<T, P, F>(&self, sql: &str, params: P, map: F) -> Result<Option<T>, Error>
    where
        P: Params,
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_connection(|conn| Ok(conn.query_row(sql, params, map).optional()?))
    }

    /// Close the connection if it is open. Calling it again is a no-op.
    ///
    /// A later operation reopens the database.
    pub fn close(&self) -> Result<(), Error> {
        let Some(handle) = self.lock()?.take() else {
            return Ok(());
        };

        handle.conn.close().map_err(|(_, e)| Error::from(e))?;
        tracing::debug!(location = ?self.location, "cache store closed");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Handle>>, Error> {
        self.handle.lock().map_err(|e| Error::StorageUnavailable(format!("connection mutex poisoned: {e}")))
    }

    fn open(&self) -> Result<Handle, Error> {
        let mut conn = match &self.location {
            StoreLocation::File { directory, name } => {
                create_directory(directory)?;
                let path = directory.join(format!("{name}.{STORE_EXTENSION}"));
                Connection::open(&path).map_err(|e| {
                    Error::StorageUnavailable(format!("failed to open cache database {}: {e}", path.display()))
                })?
            }
            StoreLocation::Memory => Connection::open_in_memory()?,
        };

        conn.busy_timeout(self.options.lock_wait_timeout)?;

        if self.options.wal_mode {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;",
            )?;
        }

        schema::ensure(&mut conn)?;

        tracing::debug!(
            location = ?self.location,
            cross_thread = self.options.allow_cross_thread_use,
            wal = self.options.wal_mode,
            "cache store opened"
        );

        Ok(Handle { conn, owner: thread::current().id() })
    }
}

fn create_directory(directory: &Path) -> Result<(), Error> {
    std::fs::create_dir_all(directory).map_err(|e| {
        Error::StorageUnavailable(format!("failed to create cache directory {}: {e}", directory.display()))
    })
}
