//! Listarr Watch-List Library
//!
//! Persists a watch-list of artists, albums and tracks, runs the external
//! downloader for new entries one job at a time, and cleans up on-disk media
//! when entries are removed.

pub mod config;
pub mod entry_store;
pub mod fetch;
pub mod jobs;
pub mod mailbox;
pub mod media_cleaner;
pub mod photo_cache;
pub mod sanitize;
pub mod search_provider;
pub mod service;
pub mod webhook;

// Re-export commonly used types for convenience
pub use config::{AppConfig, EnvConfig, FileConfig};
pub use entry_store::{Entry, EntryKind, SqliteEntryStore, StoreError};
pub use mailbox::{Mailbox, PendingMessage};
pub use search_provider::{NoOpSearchProvider, SearchProvider};
pub use service::WatchlistService;
