//! Versioned schema for the watch-list database.
//!
//! Each table keeps `seq` as an autoincrement primary key so enumeration and
//! ordinal removal follow insertion order, never id order. `id` carries the
//! provider identifier and is unique within its kind.

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Current schema version, stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

const CREATE_TABLES: &[&str] = &[
    "CREATE TABLE artists (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        last_checked_at INTEGER
    )",
    "CREATE TABLE albums (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        last_checked_at INTEGER
    )",
    "CREATE TABLE tracks (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        album TEXT NOT NULL,
        last_checked_at INTEGER
    )",
];

/// Create or migrate the schema as needed. Idempotent.
pub fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating watch-list db schema at version {}", SCHEMA_VERSION);
        let tx = conn.transaction()?;
        for create in CREATE_TABLES {
            tx.execute(create, [])?;
        }
        tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tx.commit()?;
        return Ok(());
    }

    if db_version >= SCHEMA_VERSION {
        return Ok(());
    }

    // No migrations yet beyond the initial schema; future versions chain
    // their ALTERs here the same way.
    let tx = conn.transaction()?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}
