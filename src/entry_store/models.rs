//! Entry data models.

use serde::{Deserialize, Serialize};

/// The three kinds of watch-list entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Artist,
    Album,
    Track,
}

impl EntryKind {
    /// Lowercase singular name, matching the wire/list naming convention.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Artist => "artist",
            EntryKind::Album => "album",
            EntryKind::Track => "track",
        }
    }

    /// Capitalized singular label for user-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Artist => "Artist",
            EntryKind::Album => "Album",
            EntryKind::Track => "Track",
        }
    }

    /// Parse a kind from a loose user-supplied string ("artist", "Albums"...).
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        let key = key.strip_suffix('s').unwrap_or(&key);
        match key {
            "artist" => Some(EntryKind::Artist),
            "album" => Some(EntryKind::Album),
            "track" => Some(EntryKind::Track),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A watched artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistEntry {
    pub id: String,
    pub name: String,
    pub last_checked_at: Option<i64>,
}

/// A watched album.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumEntry {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub last_checked_at: Option<i64>,
}

/// A watched track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub last_checked_at: Option<i64>,
}

/// Any persisted entry. Callers always receive owned copies, never live
/// references into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entry {
    Artist(ArtistEntry),
    Album(AlbumEntry),
    Track(TrackEntry),
}

impl Entry {
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Artist(_) => EntryKind::Artist,
            Entry::Album(_) => EntryKind::Album,
            Entry::Track(_) => EntryKind::Track,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Entry::Artist(a) => &a.id,
            Entry::Album(a) => &a.id,
            Entry::Track(t) => &t.id,
        }
    }

    /// Human-readable label for messages, falling back to the id when the
    /// display field is blank.
    pub fn display_label(&self) -> &str {
        let label = match self {
            Entry::Artist(a) => a.name.as_str(),
            Entry::Album(a) => a.title.as_str(),
            Entry::Track(t) => t.title.as_str(),
        };
        if label.trim().is_empty() {
            self.id()
        } else {
            label
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(EntryKind::parse("artist"), Some(EntryKind::Artist));
        assert_eq!(EntryKind::parse("Artists"), Some(EntryKind::Artist));
        assert_eq!(EntryKind::parse(" albums "), Some(EntryKind::Album));
        assert_eq!(EntryKind::parse("track"), Some(EntryKind::Track));
        assert_eq!(EntryKind::parse("playlist"), None);
        assert_eq!(EntryKind::parse(""), None);
    }

    #[test]
    fn test_display_label_falls_back_to_id() {
        let entry = Entry::Artist(ArtistEntry {
            id: "123".to_string(),
            name: "  ".to_string(),
            last_checked_at: None,
        });
        assert_eq!(entry.display_label(), "123");
    }

    #[test]
    fn test_entry_serialization_tags_kind() {
        let entry = Entry::Album(AlbumEntry {
            id: "alb-1".to_string(),
            title: "Ocean Eyes".to_string(),
            artist: "Owl City".to_string(),
            last_checked_at: Some(1700000000),
        });
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"kind\":\"album\""));
        let back: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
