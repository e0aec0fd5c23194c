//! Search provider boundary.
//!
//! The music service client lives outside this crate; all we rely on is a
//! list of loosely-typed candidate records per kind. Helpers here mine those
//! records for the few fields we store, tolerating whatever shape a given
//! provider returns.

use anyhow::Result;
use serde_json::Value;

use crate::entry_store::EntryKind;

/// One candidate returned by a provider search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: String,
    pub name: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub image_url: Option<String>,
}

/// An injected search backend, resolved at startup.
pub trait SearchProvider: Send + Sync {
    fn search(&self, kind: EntryKind, query: &str) -> Result<Vec<SearchHit>>;
}

/// Provider used when no search backend is configured.
pub struct NoOpSearchProvider;

impl SearchProvider for NoOpSearchProvider {
    fn search(&self, _kind: EntryKind, _query: &str) -> Result<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}

/// First non-empty string found under any of `keys`, top level only.
pub fn pick_first_str(record: &Value, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(s) = record.get(key).and_then(Value::as_str) {
            let s = s.trim();
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

/// First http(s) url found under any of `keys`. A key may hold the url
/// directly or an object whose values include one (providers nest image
/// variants under size labels).
pub fn pick_first_url(record: &Value, keys: &[&str]) -> Option<String> {
    fn as_url(value: &Value) -> Option<String> {
        let s = value.as_str()?.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            Some(s.to_string())
        } else {
            None
        }
    }

    for key in keys {
        match record.get(key) {
            Some(v @ Value::String(_)) => {
                if let Some(url) = as_url(v) {
                    return Some(url);
                }
            }
            Some(Value::Object(map)) => {
                if let Some(url) = map.values().find_map(as_url) {
                    return Some(url);
                }
            }
            _ => {}
        }
    }
    None
}

/// Build a `SearchHit` from a loosely-typed provider record.
pub fn hit_from_record(record: &Value) -> Option<SearchHit> {
    let id = pick_first_str(record, &["id", "qobuz_id", "track_id"])?;
    let name = pick_first_str(record, &["name", "title"]).unwrap_or_else(|| id.clone());
    let artist = record
        .get("artist")
        .or_else(|| record.get("performer"))
        .and_then(|a| pick_first_str(a, &["name"]).or_else(|| a.as_str().map(str::to_string)));
    let album = record
        .get("album")
        .and_then(|a| pick_first_str(a, &["title", "name"]).or_else(|| a.as_str().map(str::to_string)));
    let image_url = pick_first_url(record, &["image", "picture", "cover", "cover_art"]);
    Some(SearchHit {
        id,
        name,
        artist,
        album,
        image_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pick_first_str_skips_empty_and_missing() {
        let record = json!({"name": "  ", "title": "Ocean Eyes"});
        assert_eq!(
            pick_first_str(&record, &["name", "title"]),
            Some("Ocean Eyes".to_string())
        );
        assert_eq!(pick_first_str(&record, &["label"]), None);
    }

    #[test]
    fn test_pick_first_url_direct_and_nested() {
        let direct = json!({"picture": "https://img.example/a.jpg"});
        assert_eq!(
            pick_first_url(&direct, &["image", "picture"]),
            Some("https://img.example/a.jpg".to_string())
        );

        let nested = json!({"image": {"small": "not-a-url", "large": "https://img.example/l.jpg"}});
        assert_eq!(
            pick_first_url(&nested, &["image"]),
            Some("https://img.example/l.jpg".to_string())
        );

        let none = json!({"image": {"large": 42}});
        assert_eq!(pick_first_url(&none, &["image"]), None);
    }

    #[test]
    fn test_hit_from_record_track_shape() {
        let record = json!({
            "id": "tr-9",
            "title": "Fireflies",
            "performer": {"name": "Owl City"},
            "album": {"title": "Ocean Eyes"},
            "image": {"large": "https://img.example/c.jpg"}
        });
        let hit = hit_from_record(&record).unwrap();
        assert_eq!(hit.id, "tr-9");
        assert_eq!(hit.name, "Fireflies");
        assert_eq!(hit.artist.as_deref(), Some("Owl City"));
        assert_eq!(hit.album.as_deref(), Some("Ocean Eyes"));
        assert_eq!(hit.image_url.as_deref(), Some("https://img.example/c.jpg"));
    }

    #[test]
    fn test_hit_from_record_requires_id() {
        assert_eq!(hit_from_record(&json!({"name": "x"})), None);
    }
}
