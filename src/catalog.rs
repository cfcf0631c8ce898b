//! # Catalog View
//!
//! Read-only snapshot of every track the daemon knows about, in the daemon's
//! canonical order, together with the stored playlists. The catalog is built
//! by the daemon client (or restored from the cache) and never mutated by the
//! expression engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Tags a tag filter can select on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Artist,
    AlbumArtist,
    Album,
    Title,
    Track,
    /// The track's file path.
    File,
    /// The file name suffix, e.g. `flac`.
    Extension,
}

/// How a tag compares its value against a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    /// Case-insensitive substring.
    Contains,
    /// Leading number equality, falling back to case-insensitive equality.
    TrackNumber,
    /// Case-insensitive suffix of the file name.
    Suffix,
}

impl Tag {
    pub const ALL: [Tag; 7] = [
        Tag::Artist,
        Tag::AlbumArtist,
        Tag::Album,
        Tag::Title,
        Tag::Track,
        Tag::File,
        Tag::Extension,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Artist => "artist",
            Tag::AlbumArtist => "albumartist",
            Tag::Album => "album",
            Tag::Title => "title",
            Tag::Track => "track",
            Tag::File => "file",
            Tag::Extension => "extension",
        }
    }

    /// Looks a tag up by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Tag> {
        Tag::ALL.into_iter().find(|tag| tag.as_str().eq_ignore_ascii_case(name))
    }

    pub fn policy(&self) -> MatchPolicy {
        match self {
            Tag::Track => MatchPolicy::TrackNumber,
            Tag::Extension => MatchPolicy::Suffix,
            _ => MatchPolicy::Contains,
        }
    }

    /// Whether `track`'s value for this tag matches `pattern`.
    pub fn matches(&self, track: &Track, pattern: &str) -> bool {
        let value = match self {
            Tag::Artist => &track.tags.artist,
            Tag::AlbumArtist => &track.tags.albumartist,
            Tag::Album => &track.tags.album,
            Tag::Title => &track.tags.title,
            Tag::Track => &track.tags.track,
            Tag::File | Tag::Extension => &track.file,
        };

        match self.policy() {
            MatchPolicy::Contains => value.to_lowercase().contains(&pattern.to_lowercase()),
            MatchPolicy::TrackNumber => match (leading_number(value), leading_number(pattern)) {
                (Some(a), Some(b)) => a == b,
                _ => value.trim().eq_ignore_ascii_case(pattern.trim()),
            },
            MatchPolicy::Suffix => {
                let suffix = pattern.strip_prefix('.').unwrap_or(pattern).to_lowercase();
                !suffix.is_empty() && value.to_lowercase().ends_with(&format!(".{suffix}"))
            }
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the digits a track number starts with: `"03"`, `"3/12"` → `3`.
fn leading_number(value: &str) -> Option<u32> {
    let digits: String = value.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Fixed-shape tag record. Absent tags are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub artist: String,
    pub albumartist: String,
    pub album: String,
    pub title: String,
    pub track: String,
}

impl TagRecord {
    /// `(name, value)` pairs in a stable order.
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("artist", self.artist.as_str()),
            ("albumartist", self.albumartist.as_str()),
            ("album", self.album.as_str()),
            ("title", self.title.as_str()),
            ("track", self.track.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Path relative to the daemon's music directory; the track id.
    pub file: String,
    pub tags: TagRecord,
}

impl Track {
    pub fn new(file: impl Into<String>, tags: TagRecord) -> Self {
        Self { file: file.into(), tags }
    }
}

/// Stored playlist name → ordered track ids.
pub type Playlists = BTreeMap<String, Vec<String>>;

/// Tracks in canonical order plus stored playlists.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
    positions: HashMap<String, usize>,
    playlists: Playlists,
}

impl Catalog {
    /// Builds a catalog from tracks in canonical order. A file listed twice
    /// keeps its first position.
    pub fn new(tracks: Vec<Track>, playlists: Playlists) -> Self {
        let mut unique = Vec::with_capacity(tracks.len());
        let mut positions = HashMap::with_capacity(tracks.len());
        for track in tracks {
            if positions.contains_key(&track.file) {
                log::debug!("Ignoring duplicate catalog entry {}", track.file);
                continue;
            }
            positions.insert(track.file.clone(), unique.len());
            unique.push(track);
        }
        Self { tracks: unique, positions, playlists }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, position: usize) -> Option<&Track> {
        self.tracks.get(position)
    }

    pub fn get(&self, file: &str) -> Option<&Track> {
        self.position(file).and_then(|p| self.tracks.get(p))
    }

    /// Canonical position of a track id.
    pub fn position(&self, file: &str) -> Option<usize> {
        self.positions.get(file).copied()
    }

    pub fn playlists(&self) -> &Playlists {
        &self.playlists
    }

    pub fn playlist(&self, name: &str) -> Option<&[String]> {
        self.playlists.get(name).map(Vec::as_slice)
    }

    pub fn set_playlists(&mut self, playlists: Playlists) {
        self.playlists = playlists;
    }
}
