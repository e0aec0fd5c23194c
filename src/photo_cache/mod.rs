//! Content-addressed cover art cache.
//!
//! One file per cache key, flat under the cache directory. Writes go through
//! a temp file in the same directory followed by a rename, so readers never
//! observe a partially downloaded image.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::entry_store::EntryKind;
use crate::sanitize::normalize_identifier;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// Filesystem cache of remote images, keyed by `(kind, id)`.
pub struct PhotoCache {
    cache_dir: PathBuf,
    http: reqwest::blocking::Client,
    write_lock: Mutex<()>,
}

impl PhotoCache {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create photo cache dir {:?}", cache_dir))?;
        let http = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("Failed to build photo http client")?;
        Ok(Self {
            cache_dir,
            http,
            write_lock: Mutex::new(()),
        })
    }

    /// Cache key for an entry, or None when the id cannot be made into a
    /// safe filename. Kind prefix keeps album and artist keys apart.
    fn cache_key(kind: EntryKind, id: &str) -> Option<String> {
        let key = normalize_identifier(id)?;
        Some(format!("{}-{}", kind.as_str(), key))
    }

    fn path_for(&self, kind: EntryKind, id: &str) -> Option<PathBuf> {
        Some(self.cache_dir.join(Self::cache_key(kind, id)?))
    }

    /// Path of the cached image, if present and non-empty. No network I/O.
    pub fn cached_path(&self, kind: EntryKind, id: &str) -> Option<PathBuf> {
        let path = self.path_for(kind, id)?;
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Some(path),
            _ => None,
        }
    }

    /// Return the cached image, downloading it first when missing.
    ///
    /// Returns None when no url is available or the download fails; failures
    /// leave no file behind.
    pub fn ensure_cached(
        &self,
        kind: EntryKind,
        id: &str,
        remote_url: Option<&str>,
    ) -> Option<PathBuf> {
        if let Some(existing) = self.cached_path(kind, id) {
            return Some(existing);
        }
        let url = remote_url?;
        let path = self.path_for(kind, id)?;

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        // Another caller may have filled the slot while we waited.
        if let Some(existing) = self.cached_path(kind, id) {
            return Some(existing);
        }

        match self.download_to(url, &path) {
            Ok(()) => {
                info!("Cached photo {:?} from {}", path.file_name(), url);
                Some(path)
            }
            Err(e) => {
                warn!("Photo download failed for {}: {:#}", url, e);
                None
            }
        }
    }

    fn download_to(&self, url: &str, path: &Path) -> Result<()> {
        let response = self.http.get(url).send()?.error_for_status()?;
        let bytes = response.bytes()?;
        if bytes.is_empty() {
            anyhow::bail!("empty response body");
        }
        let mut tmp = NamedTempFile::new_in(&self.cache_dir)
            .context("Failed to create temp file in cache dir")?;
        tmp.write_all(&bytes)?;
        tmp.persist(path)
            .with_context(|| format!("Failed to move photo into place at {:?}", path))?;
        Ok(())
    }

    /// Delete every file directly under the cache directory. Best-effort,
    /// returns the number of files removed.
    pub fn purge_all(&self) -> usize {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Photo cache dir not readable, nothing to purge: {}", e);
                return 0;
            }
        };
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to purge cached photo {:?}: {}", path, e),
            }
        }
        info!("Purged {} cached photos", removed);
        removed
    }
}

/// Sniff the content type of a cached image from its magic bytes.
pub fn sniff_mime(path: &Path) -> Option<&'static str> {
    let bytes = fs::read(path).ok()?;
    infer::get(&bytes).map(|t| t.mime_type())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn cache() -> (TempDir, PhotoCache) {
        let dir = TempDir::new().unwrap();
        let cache = PhotoCache::new(dir.path().to_path_buf()).unwrap();
        (dir, cache)
    }

    /// Minimal http server handing out `body` on every request.
    fn serve_bytes(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let mut stream = match stream {
                    Ok(stream) => stream,
                    Err(_) => break,
                };
                let mut request = [0u8; 1024];
                let _ = stream.read(&mut request);
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(header.as_bytes());
                let _ = stream.write_all(&body);
            }
        });
        format!("http://{}/photo.png", addr)
    }

    #[test]
    fn test_cache_key_includes_kind() {
        assert_eq!(
            PhotoCache::cache_key(EntryKind::Artist, "abc-1"),
            Some("artist-abc-1".to_string())
        );
        assert_eq!(
            PhotoCache::cache_key(EntryKind::Album, "abc-1"),
            Some("album-abc-1".to_string())
        );
    }

    #[test]
    fn test_cache_key_rejects_traversal() {
        assert_eq!(PhotoCache::cache_key(EntryKind::Artist, "../etc"), None);
        assert_eq!(PhotoCache::cache_key(EntryKind::Artist, "a/b"), None);
        assert_eq!(PhotoCache::cache_key(EntryKind::Artist, ".hidden"), None);
        assert_eq!(PhotoCache::cache_key(EntryKind::Artist, "  "), None);
    }

    #[test]
    fn test_cached_path_requires_non_empty_file() {
        let (dir, cache) = cache();
        assert_eq!(cache.cached_path(EntryKind::Artist, "a1"), None);

        fs::write(dir.path().join("artist-a1"), b"").unwrap();
        assert_eq!(cache.cached_path(EntryKind::Artist, "a1"), None);

        fs::write(dir.path().join("artist-a1"), b"png-ish bytes").unwrap();
        assert_eq!(
            cache.cached_path(EntryKind::Artist, "a1"),
            Some(dir.path().join("artist-a1"))
        );
    }

    #[test]
    fn test_ensure_cached_returns_existing_without_url() {
        let (dir, cache) = cache();
        fs::write(dir.path().join("album-x"), b"data").unwrap();
        assert_eq!(
            cache.ensure_cached(EntryKind::Album, "x", None),
            Some(dir.path().join("album-x"))
        );
    }

    #[test]
    fn test_ensure_cached_without_url_or_file_is_none() {
        let (_dir, cache) = cache();
        assert_eq!(cache.ensure_cached(EntryKind::Album, "x", None), None);
    }

    #[test]
    fn test_ensure_cached_bad_url_leaves_no_file() {
        let (dir, cache) = cache();
        let result = cache.ensure_cached(
            EntryKind::Artist,
            "a1",
            Some("http://127.0.0.1:1/photo.jpg"),
        );
        assert_eq!(result, None);
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_ensure_cached_downloads_and_stores_full_body() {
        let (dir, cache) = cache();
        let body = vec![0x42u8; 8192];
        let url = serve_bytes(body.clone());

        let path = cache
            .ensure_cached(EntryKind::Artist, "a1", Some(&url))
            .unwrap();
        assert_eq!(path, dir.path().join("artist-a1"));
        assert_eq!(fs::read(&path).unwrap(), body);

        // No temp file left behind next to the published one.
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_concurrent_ensure_cached_yields_one_complete_file() {
        let (dir, cache) = cache();
        let cache = Arc::new(cache);
        let body = vec![0xA7u8; 16384];
        let url = serve_bytes(body.clone());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let cache = cache.clone();
                let url = url.clone();
                thread::spawn(move || cache.ensure_cached(EntryKind::Album, "alb-1", Some(&url)))
            })
            .collect();

        let expected = dir.path().join("album-alb-1");
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(expected.clone()));
        }

        assert_eq!(fs::read(&expected).unwrap(), body);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_purge_all_counts_and_empties() {
        let (dir, cache) = cache();
        for name in ["artist-a", "artist-b", "album-c"] {
            fs::write(dir.path().join(name), b"img").unwrap();
        }
        assert_eq!(cache.purge_all(), 3);
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
        assert_eq!(cache.purge_all(), 0);
    }

    #[test]
    fn test_sniff_mime_detects_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artist-p");
        fs::write(&path, b"\x89PNG\r\n\x1a\n00000000").unwrap();
        assert_eq!(sniff_mime(&path), Some("image/png"));
    }
}
