//! Shared playback types

use serde::{Deserialize, Serialize};
use soul_core::{RepeatMode, Track};

/// Transport status of the controller
///
/// `Idle -> Loading -> Playing <-> Paused -> Ended`, with `Error` reachable
/// from any load or transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportStatus {
    /// Nothing loaded
    #[default]
    Idle,
    /// Resolving or opening a source
    Loading,
    /// Audio is running
    Playing,
    /// Loaded, not running
    Paused,
    /// Transport stopped at the end of the queue
    Ended,
    /// Last load or play attempt failed
    Error,
}

impl TransportStatus {
    /// Whether a sound instance is expected to exist
    pub fn has_sound(self) -> bool {
        matches!(self, Self::Playing | Self::Paused | Self::Ended)
    }
}

/// Read-only view of the controller's state
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PlaybackSnapshot {
    pub status: TransportStatus,
    /// Position in the queue, `None` when nothing is selected
    pub current_index: Option<usize>,
    pub current_track: Option<Track>,
    pub queue_len: usize,
    /// Seconds
    pub elapsed: f64,
    /// Seconds
    pub duration: f64,
    /// 0.0 - 1.0
    pub volume: f32,
    pub shuffle: bool,
    pub repeat: RepeatMode,
    /// Last user-visible error
    pub error: Option<String>,
}

impl PlaybackSnapshot {
    /// Whether audio is running
    pub fn is_playing(&self) -> bool {
        self.status == TransportStatus::Playing
    }
}
