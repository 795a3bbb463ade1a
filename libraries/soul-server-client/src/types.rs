//! Types for the library API requests and responses.

use serde::{Deserialize, Serialize};
use soul_core::{Album, AlbumId, SignedUrl, SourceRef, Track, TrackId};
use std::time::Duration;

/// Configuration for connecting to a library server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL of the server (e.g., "https://music.example.com")
    pub url: String,
    /// Bearer token sent with every request, if any
    pub access_token: Option<String>,
    /// Total request timeout
    pub timeout: Duration,
}

impl ServerConfig {
    /// Create a new server config with just the URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            access_token: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Create a config with an existing access token.
    pub fn with_token(url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..Self::new(url)
        }
    }

    /// Override the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// =============================================================================
// Library Types
// =============================================================================

/// A track as returned by the server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerTrack {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub duration_seconds: Option<f64>,
    pub cover_art_url: Option<String>,
    /// Publicly reachable stream URL, when the server exposes one
    pub stream_url: Option<String>,
    /// Storage key to exchange for a signed URL
    pub storage_key: Option<String>,
}

impl ServerTrack {
    /// Convert into the engine's track descriptor.
    ///
    /// A public `stream_url` wins; otherwise the track resolves through its
    /// storage key, falling back to the track id.
    pub fn into_track(self) -> Track {
        let source = match (self.stream_url, self.storage_key) {
            (Some(url), _) => SourceRef::direct(url),
            (None, Some(key)) => SourceRef::indirect(key),
            (None, None) => SourceRef::indirect(self.id.clone()),
        };

        Track {
            id: TrackId::new(self.id),
            title: self.title,
            artist: self.artist.unwrap_or_else(|| "Unknown Artist".to_string()),
            album: self.album,
            duration: self.duration_seconds.unwrap_or(0.0).max(0.0),
            artwork: self.cover_art_url,
            source,
            genre: self.genre,
        }
    }
}

/// Album as returned by the server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerAlbum {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub cover_art_url: Option<String>,
    #[serde(default)]
    pub track_ids: Vec<String>,
}

impl ServerAlbum {
    /// Convert into the engine's album grouping.
    pub fn into_album(self) -> Album {
        Album {
            id: AlbumId::new(self.id),
            title: self.title,
            artist: self.artist.unwrap_or_else(|| "Unknown Artist".to_string()),
            artwork: self.cover_art_url,
            track_ids: self.track_ids.into_iter().map(TrackId::new).collect(),
        }
    }
}

/// Streaming URL response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamUrlResponse {
    pub url: String,
    /// URL validity in seconds
    pub expires_in: u64,
}

impl From<StreamUrlResponse> for SignedUrl {
    fn from(resp: StreamUrlResponse) -> Self {
        SignedUrl {
            url: resp.url,
            expires_in: Duration::from_secs(resp.expires_in),
        }
    }
}
