//! Error types for playback management

use soul_core::{SoulError, TrackId};
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The catalog could not produce a playable source
    #[error("Could not resolve source for {track_id}: {message}")]
    Resolution { track_id: TrackId, message: String },

    /// The resolved source could not be opened or decoded
    #[error("Could not load {track_id}: {message}")]
    Load { track_id: TrackId, message: String },

    /// The platform refused to start playback
    #[error("Playback failed: {0}")]
    Play(String),

    /// No track is currently loaded
    #[error("No track loaded")]
    NoTrackLoaded,

    /// Queue is empty
    #[error("Queue is empty")]
    QueueEmpty,

    /// Index out of bounds
    #[error("Index out of bounds: {index} (queue length {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Key-value storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] SoulError),

    /// Snapshot or preference could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Sync channel failure
    #[error("Sync error: {0}")]
    Sync(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The engine task has stopped
    #[error("Playback engine is closed")]
    EngineClosed,
}

impl PlaybackError {
    /// Whether this error belongs on the user-visible error field
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::Resolution { .. } | Self::Load { .. } | Self::Play(_)
        )
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
