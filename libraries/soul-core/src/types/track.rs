/// Track domain type
use crate::types::TrackId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the audio for a track comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceRef {
    /// Directly playable URL
    Direct {
        /// Stream URL
        url: String,
    },

    /// Storage key that must be exchanged for a short-lived signed URL
    Indirect {
        /// Catalog storage key
        key: String,
    },
}

impl SourceRef {
    /// Direct source
    pub fn direct(url: impl Into<String>) -> Self {
        Self::Direct { url: url.into() }
    }

    /// Indirect source
    pub fn indirect(key: impl Into<String>) -> Self {
        Self::Indirect { key: key.into() }
    }

    /// Whether the catalog has to resolve this source before loading
    pub fn needs_resolution(&self) -> bool {
        matches!(self, Self::Indirect { .. })
    }
}

/// Playable track descriptor
///
/// Immutable once it leaves the library cache; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier
    pub id: TrackId,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name
    pub album: Option<String>,

    /// Track duration in seconds (catalog metadata, refined once loaded)
    pub duration: f64,

    /// Artwork reference (URL or storage key)
    pub artwork: Option<String>,

    /// Playable source
    pub source: SourceRef,

    /// Genre
    pub genre: Option<String>,
}

impl Track {
    /// Create a track with minimal metadata and a direct source derived from the id
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            source: SourceRef::direct(format!("memory://{id}")),
            id: TrackId::new(id),
            title: title.into(),
            artist: artist.into(),
            album: None,
            duration: 0.0,
            artwork: None,
            genre: None,
        }
    }

    /// Set the album name
    #[must_use]
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        self.album = Some(album.into());
        self
    }

    /// Set the duration in seconds
    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration = seconds.max(0.0);
        self
    }

    /// Set the genre
    #[must_use]
    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    /// Set the artwork reference
    #[must_use]
    pub fn with_artwork(mut self, artwork: impl Into<String>) -> Self {
        self.artwork = Some(artwork.into());
        self
    }

    /// Set the playable source
    #[must_use]
    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.source = source;
        self
    }

    /// Whether both tracks share a (known) genre
    pub fn same_genre(&self, other: &Track) -> bool {
        match (&self.genre, &other.genre) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

/// Short-lived playable URL returned by the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// The playable URL
    pub url: String,

    /// How long the URL stays valid
    pub expires_in: Duration,
}
