//! SQLite-backed entry store.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use rusqlite::{params, Connection};
use thiserror::Error;
use tracing::{info, warn};

use super::models::{AlbumEntry, ArtistEntry, Entry, EntryKind, TrackEntry};
use super::schema::migrate_if_needed;

/// Errors surfaced by store operations. Failed mutations never change state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Value cannot be empty.")]
    EmptyId,
    #[error("{} already present.", .0.label())]
    AlreadyExists(EntryKind),
    #[error("Entry not found.")]
    NotFound,
    #[error("storage failure: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Watch-list store over a single SQLite database.
///
/// All operations serialize on one connection, which makes concurrent
/// add/remove calls against the same kind linearizable without any further
/// coordination.
#[derive(Clone)]
pub struct SqliteEntryStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEntryStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> anyhow::Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .context("Failed to open watch-list database")?;
        migrate_if_needed(&mut conn)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn map_insert_error(err: rusqlite::Error, kind: EntryKind) -> StoreError {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::AlreadyExists(kind)
            }
            _ => StoreError::Database(err),
        }
    }

    fn trimmed_id(raw: &str) -> Result<&str, StoreError> {
        let id = raw.trim();
        if id.is_empty() {
            return Err(StoreError::EmptyId);
        }
        Ok(id)
    }

    /// Insert a new artist. The display name falls back to the id when blank.
    pub fn add_artist(&self, id: &str, name: &str) -> Result<ArtistEntry, StoreError> {
        let id = Self::trimmed_id(id)?;
        let name = if name.trim().is_empty() {
            id
        } else {
            name.trim()
        };

        let conn = self.lock();
        conn.execute(
            "INSERT INTO artists (id, name) VALUES (?1, ?2)",
            params![id, name],
        )
        .map_err(|e| Self::map_insert_error(e, EntryKind::Artist))?;

        Ok(ArtistEntry {
            id: id.to_string(),
            name: name.to_string(),
            last_checked_at: None,
        })
    }

    pub fn add_album(
        &self,
        id: &str,
        title: &str,
        artist: &str,
    ) -> Result<AlbumEntry, StoreError> {
        let id = Self::trimmed_id(id)?;
        let title = if title.trim().is_empty() {
            id
        } else {
            title.trim()
        };

        let conn = self.lock();
        conn.execute(
            "INSERT INTO albums (id, title, artist) VALUES (?1, ?2, ?3)",
            params![id, title, artist.trim()],
        )
        .map_err(|e| Self::map_insert_error(e, EntryKind::Album))?;

        Ok(AlbumEntry {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.trim().to_string(),
            last_checked_at: None,
        })
    }

    pub fn add_track(
        &self,
        id: &str,
        title: &str,
        artist: &str,
        album: &str,
    ) -> Result<TrackEntry, StoreError> {
        let id = Self::trimmed_id(id)?;
        let title = if title.trim().is_empty() {
            id
        } else {
            title.trim()
        };

        let conn = self.lock();
        conn.execute(
            "INSERT INTO tracks (id, title, artist, album) VALUES (?1, ?2, ?3, ?4)",
            params![id, title, artist.trim(), album.trim()],
        )
        .map_err(|e| Self::map_insert_error(e, EntryKind::Track))?;

        Ok(TrackEntry {
            id: id.to_string(),
            title: title.to_string(),
            artist: artist.trim().to_string(),
            album: album.trim().to_string(),
            last_checked_at: None,
        })
    }

    /// Enumerate a kind in insertion order.
    pub fn list(&self, kind: EntryKind) -> Result<Vec<Entry>, StoreError> {
        let conn = self.lock();
        Self::list_locked(&conn, kind)
    }

    fn list_locked(conn: &Connection, kind: EntryKind) -> Result<Vec<Entry>, StoreError> {
        let entries = match kind {
            EntryKind::Artist => {
                let mut stmt = conn.prepare_cached(
                    "SELECT id, name, last_checked_at FROM artists ORDER BY seq",
                )?;
                let rows = stmt.query_map([], |r| {
                    Ok(Entry::Artist(ArtistEntry {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        last_checked_at: r.get(2)?,
                    }))
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            EntryKind::Album => {
                let mut stmt = conn.prepare_cached(
                    "SELECT id, title, artist, last_checked_at FROM albums ORDER BY seq",
                )?;
                let rows = stmt.query_map([], |r| {
                    Ok(Entry::Album(AlbumEntry {
                        id: r.get(0)?,
                        title: r.get(1)?,
                        artist: r.get(2)?,
                        last_checked_at: r.get(3)?,
                    }))
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            EntryKind::Track => {
                let mut stmt = conn.prepare_cached(
                    "SELECT id, title, artist, album, last_checked_at FROM tracks ORDER BY seq",
                )?;
                let rows = stmt.query_map([], |r| {
                    Ok(Entry::Track(TrackEntry {
                        id: r.get(0)?,
                        title: r.get(1)?,
                        artist: r.get(2)?,
                        album: r.get(3)?,
                        last_checked_at: r.get(4)?,
                    }))
                })?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(entries)
    }

    /// Remove the entry at `index` in the `list(kind)` ordering, returning
    /// the removed row. Out-of-range indices fail without mutating.
    pub fn remove_at(&self, kind: EntryKind, index: usize) -> Result<Entry, StoreError> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        let table = Self::table_name(kind);
        let seq: i64 = {
            let mut stmt = tx.prepare_cached(&format!(
                "SELECT seq FROM {table} ORDER BY seq LIMIT 1 OFFSET ?1"
            ))?;
            match stmt.query_row(params![index as i64], |r| r.get(0)) {
                Ok(seq) => seq,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Err(StoreError::NotFound),
                Err(e) => return Err(e.into()),
            }
        };

        let entry = Self::row_by_seq(&tx, kind, seq)?;
        tx.execute(
            &format!("DELETE FROM {table} WHERE seq = ?1"),
            params![seq],
        )?;
        tx.commit()?;
        Ok(entry)
    }

    fn row_by_seq(conn: &Connection, kind: EntryKind, seq: i64) -> Result<Entry, StoreError> {
        let entry = match kind {
            EntryKind::Artist => conn.query_row(
                "SELECT id, name, last_checked_at FROM artists WHERE seq = ?1",
                params![seq],
                |r| {
                    Ok(Entry::Artist(ArtistEntry {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        last_checked_at: r.get(2)?,
                    }))
                },
            )?,
            EntryKind::Album => conn.query_row(
                "SELECT id, title, artist, last_checked_at FROM albums WHERE seq = ?1",
                params![seq],
                |r| {
                    Ok(Entry::Album(AlbumEntry {
                        id: r.get(0)?,
                        title: r.get(1)?,
                        artist: r.get(2)?,
                        last_checked_at: r.get(3)?,
                    }))
                },
            )?,
            EntryKind::Track => conn.query_row(
                "SELECT id, title, artist, album, last_checked_at FROM tracks WHERE seq = ?1",
                params![seq],
                |r| {
                    Ok(Entry::Track(TrackEntry {
                        id: r.get(0)?,
                        title: r.get(1)?,
                        artist: r.get(2)?,
                        album: r.get(3)?,
                        last_checked_at: r.get(4)?,
                    }))
                },
            )?,
        };
        Ok(entry)
    }

    pub fn count(&self, kind: EntryKind) -> Result<usize, StoreError> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", Self::table_name(kind)),
            [],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    /// Record a completed periodic re-check for an entry. Returns false when
    /// no row matched.
    pub fn touch_checked(&self, kind: EntryKind, id: &str) -> Result<bool, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let conn = self.lock();
        let updated = conn.execute(
            &format!(
                "UPDATE {} SET last_checked_at = ?1 WHERE id = ?2",
                Self::table_name(kind)
            ),
            params![now, id.trim()],
        )?;
        Ok(updated > 0)
    }

    /// One-time import of a legacy flat artist list (one bare id per line).
    ///
    /// Only runs against an empty artists table; identifiers are preserved
    /// and the display name defaults to the id. The flat file is deleted
    /// afterwards, best-effort.
    pub fn import_legacy_artists<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<usize> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(0);
        }
        if self.count(EntryKind::Artist)? > 0 {
            return Ok(0);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read legacy list {}", path.display()))?;

        let mut imported = 0;
        {
            let mut conn = self.lock();
            let tx = conn.transaction()?;
            for line in content.lines() {
                let id = line.trim();
                if id.is_empty() {
                    continue;
                }
                imported += tx.execute(
                    "INSERT OR IGNORE INTO artists (id, name) VALUES (?1, ?1)",
                    params![id],
                )?;
            }
            tx.commit()?;
        }

        info!(
            "Migrated {} artist entries from legacy list {}",
            imported,
            path.display()
        );
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove legacy list {}: {}", path.display(), e);
        }
        Ok(imported)
    }

    fn table_name(kind: EntryKind) -> &'static str {
        match kind {
            EntryKind::Artist => "artists",
            EntryKind::Album => "albums",
            EntryKind::Track => "tracks",
        }
    }
}
