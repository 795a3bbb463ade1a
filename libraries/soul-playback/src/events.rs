//! Playback events
//!
//! Emitted by the controller after each state change and fanned out to UI
//! subscribers by the engine.

use crate::types::TransportStatus;
use serde::Serialize;
use soul_core::{EqualizerSettings, RepeatMode, Track, TrackId};

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// Transport status changed
    StateChanged { status: TransportStatus },

    /// A different queue entry is now loaded (or nothing is)
    TrackChanged {
        index: Option<usize>,
        track: Option<Track>,
    },

    /// Periodic progress while playing
    PositionUpdate { elapsed: f64, duration: f64 },

    /// Duration became known after load
    DurationChanged { duration: f64 },

    VolumeChanged { volume: f32 },

    /// Queue contents or order changed
    QueueChanged { len: usize },

    ShuffleChanged { enabled: bool },

    RepeatChanged { mode: RepeatMode },

    EqualizerChanged { settings: EqualizerSettings },

    LikedChanged { track_id: TrackId, liked: bool },

    /// Stored session was restored (transport not started)
    SessionRestored { index: usize },

    /// User-visible error
    Error { message: String },

    ErrorCleared,
}
