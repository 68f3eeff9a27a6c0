//! Entries table schema.
//!
//! The table and index names match existing cache files so a store can open
//! files written by earlier versions. Every statement uses `IF NOT EXISTS`.

use rusqlite::Connection;

use crate::Error;

/// Schema statements, applied in order on every fresh connection.
///
/// `keyname_index` duplicates the primary key index. It is kept so the file
/// layout stays identical to existing caches.
const SCHEMA: &[(&str, &str)] = &[
    (
        "entries",
        "CREATE TABLE IF NOT EXISTS `entries` (`key` VARCHAR PRIMARY KEY, `value` VARCHAR, `expire_at` INTEGER)",
    ),
    ("keyname_index", "CREATE INDEX IF NOT EXISTS `keyname_index` ON `entries` (`key`)"),
];

/// Create the entries table and its index if they do not exist yet.
///
/// # Errors
///
/// Returns an error if a statement fails to execute.
pub fn ensure(conn: &mut Connection) -> Result<(), Error> {
    let tx = conn.transaction()?;
    for (name, sql) in SCHEMA {
        tx.execute(sql, [])?;
        tracing::trace!(object = name, "schema object ensured");
    }
    tx.commit()?;
    Ok(())
}
