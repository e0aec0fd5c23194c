//! Watch-list service: the seam between callers and the moving parts.
//!
//! Adds persist first, then hand a fetch to the background queue; removals
//! persist first, then attempt on-disk cleanup. Callers always get a short
//! human-readable message back immediately, and anything that finishes later
//! reports through the mailbox.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::entry_store::{Entry, EntryKind, SqliteEntryStore, StoreError};
use crate::fetch::{CommandFetchExecutor, FailureReason, FetchExecutor, FetchOutcome, FetchTarget};
use crate::jobs::JobQueue;
use crate::mailbox::{Mailbox, PendingMessage};
use crate::media_cleaner::{CleanOutcome, MediaCleaner};
use crate::photo_cache::PhotoCache;
use crate::sanitize::{normalize_identifier, sanitize_entry_value};
use crate::webhook::{Severity, WebhookNotifier};

pub struct WatchlistService {
    store: SqliteEntryStore,
    mailbox: Arc<Mailbox>,
    jobs: Arc<JobQueue>,
    cleaner: Arc<MediaCleaner>,
    photos: Arc<PhotoCache>,
    webhook: Arc<WebhookNotifier>,
    executor: Option<Arc<dyn FetchExecutor>>,
}

impl WatchlistService {
    pub fn new(
        store: SqliteEntryStore,
        mailbox: Arc<Mailbox>,
        cleaner: Arc<MediaCleaner>,
        photos: Arc<PhotoCache>,
        webhook: Arc<WebhookNotifier>,
        executor: Option<Arc<dyn FetchExecutor>>,
    ) -> Self {
        Self {
            store,
            mailbox,
            jobs: Arc::new(JobQueue::new()),
            cleaner,
            photos,
            webhook,
            executor,
        }
    }

    /// Wire the service up from resolved configuration, running the one-time
    /// legacy list import along the way.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let store = SqliteEntryStore::new(config.watchlist_db_path())?;
        store.import_legacy_artists(config.legacy_artists_path())?;

        let mailbox = Arc::new(Mailbox::new());
        let cleaner = Arc::new(MediaCleaner::new(
            config.media_root.clone(),
            mailbox.clone(),
        ));
        let photos = Arc::new(PhotoCache::new(config.photo_cache_dir.clone())?);
        let webhook = Arc::new(WebhookNotifier::new(config.webhook_url.clone()));

        let executor: Option<Arc<dyn FetchExecutor>> =
            match (config.fetch.enabled, &config.fetch.program) {
                (true, Some(program)) => Some(Arc::new(CommandFetchExecutor::new(
                    program.clone(),
                    config.fetch.workdir.clone(),
                    config.fetch.source.clone(),
                ))),
                _ => None,
            };

        Ok(Self::new(store, mailbox, cleaner, photos, webhook, executor))
    }

    pub fn add_artist(&self, id: &str, name: &str) -> Result<String, StoreError> {
        let artist = self.store.add_artist(id, name)?;
        info!("Added artist '{}' ({})", artist.name, artist.id);
        Ok(self.start_fetch(
            EntryKind::Artist,
            &artist.id,
            &artist.name,
            format!("Added artist '{}'", artist.name),
        ))
    }

    pub fn add_album(&self, id: &str, title: &str, artist: &str) -> Result<String, StoreError> {
        let album = self.store.add_album(id, title, artist)?;
        info!("Added album '{}' ({})", album.title, album.id);
        Ok(self.start_fetch(
            EntryKind::Album,
            &album.id,
            &album.title,
            format!("Added album '{}'", album.title),
        ))
    }

    pub fn add_track(
        &self,
        id: &str,
        title: &str,
        artist: &str,
        album: &str,
    ) -> Result<String, StoreError> {
        let track = self.store.add_track(id, title, artist, album)?;
        info!("Added track '{}' ({})", track.title, track.id);
        Ok(self.start_fetch(
            EntryKind::Track,
            &track.id,
            &track.title,
            format!("Added track '{}'", track.title),
        ))
    }

    /// Queue a best-match fetch for a free-text query, without storing
    /// anything. Used for manual one-off downloads.
    pub fn request_search_fetch(&self, kind: EntryKind, query: &str) -> String {
        let query = match sanitize_entry_value(query) {
            Some(query) => query,
            None => return "Nothing to fetch.".to_string(),
        };
        let label = query.clone();
        self.enqueue_fetch(
            FetchTarget::BySearch { kind, query },
            format!("{} '{}'", kind.label(), label),
        );
        format!("Queued download for {} '{}'.", kind.as_str(), label)
    }

    /// Remove the entry at `index` in `list(kind)` order and clean up its
    /// media. Cleanup problems never undo the removal; they surface in the
    /// returned message and the mailbox.
    pub fn remove_entry(&self, kind: EntryKind, index: usize) -> Result<String, StoreError> {
        let removed = self.store.remove_at(kind, index)?;
        info!("Removed {} '{}'", kind.as_str(), removed.display_label());

        let outcome = match &removed {
            Entry::Artist(a) => self.cleaner.remove_artist_media(&a.name),
            Entry::Album(a) => self.cleaner.remove_album_media(&a.artist, &a.title),
            Entry::Track(t) => self.cleaner.remove_track_media(&t.artist, &t.album, &t.title),
        };

        let label = removed.display_label();
        let message = match outcome {
            CleanOutcome::Removed(_) => {
                format!("Removed {} '{}' and deleted its media.", kind.as_str(), label)
            }
            CleanOutcome::NothingToClean => {
                format!("Removed {} '{}'.", kind.as_str(), label)
            }
            CleanOutcome::Ambiguous(_) => format!(
                "Removed {} '{}', but its media was left on disk: multiple matches.",
                kind.as_str(),
                label
            ),
            CleanOutcome::Failed(reason) => format!(
                "Removed {} '{}', but deleting its media failed: {}",
                kind.as_str(),
                label,
                reason
            ),
        };
        Ok(message)
    }

    pub fn list(&self, kind: EntryKind) -> Result<Vec<Entry>, StoreError> {
        self.store.list(kind)
    }

    /// Read-and-clear the pending notifications.
    pub fn drain_messages(&self) -> Vec<PendingMessage> {
        self.mailbox.drain()
    }

    pub fn entry_photo(&self, kind: EntryKind, id: &str) -> Option<PathBuf> {
        self.photos.cached_path(kind, id)
    }

    /// Cache an entry's image, downloading it when missing. A failed download
    /// is reported through the mailbox rather than returned as an error; a
    /// malformed id is a logged refusal, never a user-facing message.
    pub fn prime_photo(&self, kind: EntryKind, id: &str, url: Option<&str>) -> Option<PathBuf> {
        if normalize_identifier(id).is_none() {
            warn!("Refusing photo cache for malformed {} id {:?}", kind.as_str(), id);
            return None;
        }
        let cached = self.photos.ensure_cached(kind, id, url);
        if cached.is_none() && url.is_some() {
            self.mailbox.publish(
                format!("Could not fetch the image for {} {}.", kind.as_str(), id),
                true,
            );
        }
        cached
    }

    pub fn purge_photos(&self) -> usize {
        self.photos.purge_all()
    }

    /// Persisted-but-not-fetched values start with `#`; everything else gets
    /// a background fetch job.
    fn start_fetch(&self, kind: EntryKind, id: &str, label: &str, added_message: String) -> String {
        if sanitize_entry_value(id).is_none() {
            let message = format!("{}; it is marked as ignored and will not be fetched.", added_message);
            self.mailbox.publish(message.clone(), false);
            return message;
        }
        if self.executor.is_none() {
            let message = format!("{}; downloads are not configured.", added_message);
            self.mailbox.publish(message.clone(), false);
            return message;
        }
        self.enqueue_fetch(
            FetchTarget::ById {
                kind,
                id: id.to_string(),
            },
            format!("{} '{}'", kind.label(), label),
        );
        format!("{} and started the download.", added_message)
    }

    fn enqueue_fetch(&self, target: FetchTarget, described: String) {
        let executor = match &self.executor {
            Some(executor) => executor.clone(),
            None => {
                self.mailbox.publish(
                    format!("Download skipped for {}: downloads are not configured.", described),
                    false,
                );
                return;
            }
        };
        let mailbox = self.mailbox.clone();
        let webhook = self.webhook.clone();
        let label = format!("fetch {}", described);
        self.jobs.enqueue(label, move || {
            let outcome = executor.run(&target);
            match outcome {
                FetchOutcome::Success => {
                    let message = format!("Download finished for {}.", described);
                    mailbox.publish(message.clone(), false);
                    webhook.send(Severity::Success, &message, None);
                }
                FetchOutcome::Failure(FailureReason::ExitCode(code)) => {
                    let message = match code {
                        Some(code) => format!(
                            "Download failed for {} (exit code {}).",
                            described, code
                        ),
                        None => format!("Download failed for {} (killed by signal).", described),
                    };
                    mailbox.publish(message.clone(), true);
                    webhook.send(Severity::Error, &message, None);
                }
                FetchOutcome::Failure(FailureReason::Launch(err)) => {
                    let message =
                        format!("Could not start the download for {}: {}", described, err);
                    mailbox.publish(message.clone(), true);
                    webhook.send(Severity::Error, &message, None);
                }
            }
        });
    }
}
