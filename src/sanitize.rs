//! Identifier and path sanitization.
//!
//! Every filesystem write or delete driven by external input goes through one
//! of these checks first. A failed check is a logged refusal, not an error
//! surfaced to the caller: a traversal-shaped identifier means malicious or
//! buggy input, not a normal failure mode.

use std::path::{Component, Path, PathBuf};

use tracing::warn;

/// Normalize an externally supplied identifier for use as a filename.
///
/// Returns `None` when the value is empty after trimming, starts with a dot,
/// or contains path separators or parent-directory segments.
pub fn normalize_identifier(raw: &str) -> Option<String> {
    let normalized = raw.trim();
    if normalized.is_empty() {
        return None;
    }
    if normalized.starts_with('.')
        || normalized.contains('/')
        || normalized.contains('\\')
        || normalized.contains("..")
    {
        return None;
    }
    Some(normalized.to_string())
}

/// Apply the downloader scheduler's entry filtering: trim, and drop values
/// starting with `#` (the convention for entries kept in the list but never
/// fetched).
pub fn sanitize_entry_value(raw: &str) -> Option<String> {
    let sanitized = raw.trim();
    if sanitized.is_empty() || sanitized.starts_with('#') {
        return None;
    }
    Some(sanitized.to_string())
}

/// Resolve a path lexically: apply `.` and `..` components without touching
/// the filesystem, so the check also holds for paths that do not exist yet.
fn resolve_lexically(path: &Path) -> PathBuf {
    let mut resolved = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    resolved
}

/// Check that `candidate` is a strict descendant of `root`.
///
/// Both paths are canonicalized when they exist (following symlinks) and
/// resolved lexically otherwise. `candidate == root` is rejected: deleting
/// the root itself is never a valid cleanup.
pub fn is_within_root(root: &Path, candidate: &Path) -> bool {
    let root_resolved = root
        .canonicalize()
        .unwrap_or_else(|_| resolve_lexically(root));
    let candidate_resolved = candidate
        .canonicalize()
        .unwrap_or_else(|_| resolve_lexically(candidate));

    if candidate_resolved == root_resolved {
        warn!(
            "Refusing path equal to its configured root: {}",
            candidate_resolved.display()
        );
        return false;
    }
    if !candidate_resolved.starts_with(&root_resolved) {
        warn!(
            "Refusing path outside configured root {}: {}",
            root_resolved.display(),
            candidate_resolved.display()
        );
        return false;
    }
    true
}
