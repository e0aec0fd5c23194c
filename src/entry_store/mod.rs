//! Durable watch-list entry storage.
//!
//! One SQLite table per entry kind (artist/album/track), with per-kind
//! uniqueness on the provider id and stable insertion ordering for
//! enumeration and ordinal removal.

mod models;
mod schema;
mod store;

pub use models::{AlbumEntry, ArtistEntry, Entry, EntryKind, TrackEntry};
pub use store::{SqliteEntryStore, StoreError};
