//! Background track catalog.
//!
//! The catalog is loaded once at startup and never changes afterwards. Track
//! identifiers are the only values accepted as a track selection.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Short identifier of a catalog entry (e.g. "2").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One selectable background track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    /// Identifier used as the selection value
    pub id: TrackId,
    /// Name shown on the choice menu
    pub name: String,
    /// Where the audio is fetched from
    pub url: String,
}

impl Track {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(id),
            name: name.into(),
            url: url.into(),
        }
    }

    /// File extension of the audio locator, if it has one.
    pub fn file_extension(&self) -> Option<String> {
        let url = Url::parse(&self.url).ok()?;
        let last = url.path_segments()?.next_back()?;
        let (_, ext) = last.rsplit_once('.')?;
        if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

/// Catalog loading errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Track catalog is empty")]
    Empty,

    #[error("Duplicate track id: {0}")]
    DuplicateId(String),

    #[error("Track {id} has an invalid audio locator: {reason}")]
    InvalidLocator { id: String, reason: String },

    #[error("Failed to read track catalog: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse track catalog: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Static, read-only list of background tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TrackCatalog {
    tracks: Vec<Track>,
}

impl TrackCatalog {
    /// Build a catalog, rejecting empty lists, duplicate ids and
    /// locators that are not http(s) URLs.
    pub fn new(tracks: Vec<Track>) -> Result<Self, CatalogError> {
        if tracks.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for track in &tracks {
            if !seen.insert(track.id.as_str()) {
                return Err(CatalogError::DuplicateId(track.id.to_string()));
            }
            let url = Url::parse(&track.url).map_err(|e| CatalogError::InvalidLocator {
                id: track.id.to_string(),
                reason: e.to_string(),
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(CatalogError::InvalidLocator {
                    id: track.id.to_string(),
                    reason: format!("unsupported scheme '{}'", url.scheme()),
                });
            }
        }

        Ok(Self { tracks })
    }

    /// The three tracks the bot ships with.
    pub fn builtin() -> Self {
        Self {
            tracks: vec![
                Track::new(
                    "1",
                    "Calm Piano",
                    "https://cdn.pixabay.com/download/audio/2022/02/22/audio_d1659fc8c9.mp3",
                ),
                Track::new(
                    "2",
                    "Ambient",
                    "https://cdn.pixabay.com/download/audio/2022/03/15/audio_c8c8395384.mp3",
                ),
                Track::new(
                    "3",
                    "Peaceful",
                    "https://cdn.pixabay.com/download/audio/2022/01/18/audio_d0c6ff1bcc.mp3",
                ),
            ],
        }
    }

    /// Parse a JSON array of `{id, name, url}` objects.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let tracks: Vec<Track> = serde_json::from_str(json)?;
        Self::new(tracks)
    }

    /// Load a catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Look up a track by identifier.
    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id.as_str() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}
