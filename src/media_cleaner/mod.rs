//! Best-effort removal of on-disk media for deleted entries.
//!
//! The downloader writes `<root>/<Artist>/<Album>/<track files>` with names it
//! chooses itself, so cleanup works by fuzzy name matching: case, diacritics
//! and punctuation are ignored, and a substring hit counts. Anything outside
//! the configured media root is never touched.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use walkdir::WalkDir;

use crate::mailbox::Mailbox;
use crate::sanitize::is_within_root;

const AUDIO_EXTENSIONS: &[&str] = &[
    "flac", "mp3", "m4a", "ogg", "opus", "wav", "aac", "wma", "alac", "aiff",
];

/// Result of a cleanup attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    /// The matching media was deleted.
    Removed(PathBuf),
    /// Nothing on disk matched; already-clean counts as success.
    NothingToClean,
    /// Multiple candidates matched, so nothing was deleted.
    Ambiguous(Vec<PathBuf>),
    /// An I/O error stopped the deletion.
    Failed(String),
}

impl CleanOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CleanOutcome::Removed(_) | CleanOutcome::NothingToClean)
    }
}

/// Fold a name to its comparable form: NFKD, combining marks stripped,
/// lowercased, non-alphanumerics dropped.
pub fn normalize_name(raw: &str) -> String {
    raw.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

fn name_matches(target_normalized: &str, candidate: &str) -> bool {
    if target_normalized.is_empty() {
        return false;
    }
    normalize_name(candidate).contains(target_normalized)
}

/// Deletes media directories and files under a single configured root.
pub struct MediaCleaner {
    media_root: PathBuf,
    mailbox: Arc<Mailbox>,
}

impl MediaCleaner {
    pub fn new(media_root: PathBuf, mailbox: Arc<Mailbox>) -> Self {
        Self { media_root, mailbox }
    }

    /// Delete `<root>/<artist_name>` if it exists. A missing path is treated
    /// as already clean.
    pub fn remove_artist_media(&self, artist_name: &str) -> CleanOutcome {
        let path = self.media_root.join(artist_name);
        if !path.exists() {
            return CleanOutcome::NothingToClean;
        }
        if !is_within_root(&self.media_root, &path) {
            return CleanOutcome::NothingToClean;
        }
        match remove_path(&path) {
            Ok(()) => {
                info!("Removed artist media at {:?}", path);
                CleanOutcome::Removed(path)
            }
            Err(e) => {
                let msg = format!("Could not delete media for artist '{}': {}", artist_name, e);
                warn!("{}", msg);
                self.mailbox.publish(msg.clone(), true);
                CleanOutcome::Failed(msg)
            }
        }
    }

    /// Find and delete the single album directory matching `album_title`.
    ///
    /// Candidates are narrowed to artist directories matching `artist_name`
    /// first; when no artist directory matches, the whole root is scanned.
    pub fn remove_album_media(&self, artist_name: &str, album_title: &str) -> CleanOutcome {
        let mut matches = self.find_album_dirs(artist_name, album_title);
        if matches.is_empty() {
            return CleanOutcome::NothingToClean;
        }
        if matches.len() > 1 {
            return self.refuse_ambiguous("album", album_title, matches);
        }
        let path = matches.remove(0);
        if !is_within_root(&self.media_root, &path) {
            return CleanOutcome::NothingToClean;
        }
        match remove_path(&path) {
            Ok(()) => {
                info!("Removed album media at {:?}", path);
                CleanOutcome::Removed(path)
            }
            Err(e) => {
                let msg = format!("Could not delete media for album '{}': {}", album_title, e);
                warn!("{}", msg);
                self.mailbox.publish(msg.clone(), true);
                CleanOutcome::Failed(msg)
            }
        }
    }

    /// Find and delete the single audio file matching `track_title` inside
    /// the matched album directory. When the deletion leaves the album
    /// directory with no audio files, the directory is removed too;
    /// a failure there is a secondary warning, not a failure of the track
    /// deletion.
    pub fn remove_track_media(
        &self,
        artist_name: &str,
        album_title: &str,
        track_title: &str,
    ) -> CleanOutcome {
        let mut album_dirs = self.find_album_dirs(artist_name, album_title);
        if album_dirs.is_empty() {
            return CleanOutcome::NothingToClean;
        }
        if album_dirs.len() > 1 {
            return self.refuse_ambiguous("album", album_title, album_dirs);
        }
        let album_dir = album_dirs.remove(0);

        let target = normalize_name(track_title);
        let mut matches: Vec<PathBuf> = audio_files_under(&album_dir)
            .into_iter()
            .filter(|p| file_stem_matches(&target, p))
            .collect();

        if matches.is_empty() {
            return CleanOutcome::NothingToClean;
        }
        if matches.len() > 1 {
            return self.refuse_ambiguous("track", track_title, matches);
        }
        let path = matches.remove(0);
        if !is_within_root(&self.media_root, &path) {
            return CleanOutcome::NothingToClean;
        }
        if let Err(e) = fs::remove_file(&path) {
            let msg = format!("Could not delete media for track '{}': {}", track_title, e);
            warn!("{}", msg);
            self.mailbox.publish(msg.clone(), true);
            return CleanOutcome::Failed(msg);
        }
        info!("Removed track media at {:?}", path);
        if audio_files_under(&album_dir).is_empty() {
            self.remove_emptied_album_dir(&album_dir, album_title);
        }
        CleanOutcome::Removed(path)
    }

    fn remove_emptied_album_dir(&self, album_dir: &Path, album_title: &str) {
        if !is_within_root(&self.media_root, album_dir) {
            return;
        }
        match fs::remove_dir_all(album_dir) {
            Ok(()) => info!("Removed emptied album directory {:?}", album_dir),
            Err(e) => {
                let msg = format!(
                    "Track deleted, but the emptied album folder '{}' could not be removed: {}",
                    album_title, e
                );
                warn!("{}", msg);
                self.mailbox.publish(msg, true);
            }
        }
    }

    fn refuse_ambiguous(&self, what: &str, title: &str, matches: Vec<PathBuf>) -> CleanOutcome {
        let names: Vec<String> = matches
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        let msg = format!(
            "Not deleting media for {} '{}': multiple matches on disk ({})",
            what,
            title,
            names.join(", ")
        );
        warn!("{}", msg);
        self.mailbox.publish(msg, true);
        CleanOutcome::Ambiguous(matches)
    }

    /// Directories under the root whose name matches `album_title`, searched
    /// inside artist directories matching `artist_name` when any exist.
    fn find_album_dirs(&self, artist_name: &str, album_title: &str) -> Vec<PathBuf> {
        let artist_target = normalize_name(artist_name);
        let album_target = normalize_name(album_title);

        let artist_dirs: Vec<PathBuf> = subdirectories(&self.media_root)
            .into_iter()
            .filter(|p| dir_name_matches(&artist_target, p))
            .collect();

        let parents = if artist_dirs.is_empty() {
            subdirectories(&self.media_root)
        } else {
            artist_dirs
        };

        parents
            .iter()
            .flat_map(|parent| subdirectories(parent))
            .filter(|p| dir_name_matches(&album_target, p))
            .collect()
    }
}

fn remove_path(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect()
}

fn dir_name_matches(target_normalized: &str, path: &Path) -> bool {
    path.file_name()
        .map(|n| name_matches(target_normalized, &n.to_string_lossy()))
        .unwrap_or(false)
}

fn file_stem_matches(target_normalized: &str, path: &Path) -> bool {
    path.file_stem()
        .map(|n| name_matches(target_normalized, &n.to_string_lossy()))
        .unwrap_or(false)
}

fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let lower = e.to_lowercase();
            AUDIO_EXTENSIONS.contains(&lower.as_str())
        })
        .unwrap_or(false)
}

fn audio_files_under(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_audio_file(p))
        .collect()
}
