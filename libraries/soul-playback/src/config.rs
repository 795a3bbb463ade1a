//! Engine configuration

use crate::error::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Playback engine configuration
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Maximum entries kept in the recently played log
    pub history_capacity: usize,

    pub shuffle: ShuffleWeights,

    /// Fade-in after a new sound becomes ready (milliseconds)
    pub fade_in_ms: u64,

    /// `prev()` restarts the current track past this point (milliseconds)
    pub restart_threshold_ms: u64,

    pub session: SessionSettings,

    /// Progress polling period while playing (milliseconds)
    pub progress_poll_ms: u64,

    pub sync: SyncSettings,

    pub graph: GraphConfig,
}

/// Smart shuffle tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShuffleWeights {
    /// Number of most recent history entries excluded from candidates
    pub recent_window: usize,
    pub same_artist: f64,
    pub same_genre: f64,
    pub liked: f64,
    /// Width of the final uniform pick
    pub top_k: usize,
}

/// Session persistence timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Key holding the session snapshot
    pub key: String,
    /// Coalescing window for snapshot writes (milliseconds)
    pub debounce_ms: u64,
    /// Period of elapsed-time updates while playing (milliseconds)
    pub progress_interval_ms: u64,
}

/// Sync channel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub room: String,
    /// Ask peers for their state after joining
    pub request_state_on_join: bool,
}

/// Signal graph layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Low-shelf corner (Hz)
    pub bass_hz: f32,
    /// Peaking center (Hz)
    pub mid_hz: f32,
    /// High-shelf corner (Hz)
    pub treble_hz: f32,
    pub mid_q: f32,
    /// Analysis window, must be a power of two
    pub fft_size: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            shuffle: ShuffleWeights::default(),
            fade_in_ms: 500,
            restart_threshold_ms: 3_000,
            session: SessionSettings::default(),
            progress_poll_ms: 16,
            sync: SyncSettings::default(),
            graph: GraphConfig::default(),
        }
    }
}

impl Default for ShuffleWeights {
    fn default() -> Self {
        Self {
            recent_window: 10,
            same_artist: 0.3,
            same_genre: 0.2,
            liked: 0.2,
            top_k: 3,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            key: "playback.session".to_string(),
            debounce_ms: 500,
            progress_interval_ms: 5_000,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            room: "global".to_string(),
            request_state_on_join: true,
        }
    }
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            bass_hz: 320.0,
            mid_hz: 1_000.0,
            treble_hz: 3_200.0,
            mid_q: 0.5,
            fft_size: 2048,
        }
    }
}

impl PlaybackConfig {
    /// Load configuration from `playback.toml` (optional) and environment
    pub fn load() -> Result<Self> {
        Self::load_from("playback.toml")
    }

    /// Load configuration from the given file (optional) and environment
    ///
    /// Environment variables use the `SOUL_PLAYBACK_` prefix and `__` between
    /// nesting levels, e.g. `SOUL_PLAYBACK_SYNC__ROOM=party`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        let path = path.as_ref();
        if path.exists() {
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SOUL_PLAYBACK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings
            .build()
            .map_err(|e| PlaybackError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| PlaybackError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.history_capacity == 0 {
            return Err(PlaybackError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.shuffle.top_k == 0 {
            return Err(PlaybackError::Config(
                "shuffle.top_k must be at least 1".to_string(),
            ));
        }
        if self.session.debounce_ms == 0
            || self.session.progress_interval_ms == 0
            || self.progress_poll_ms == 0
        {
            return Err(PlaybackError::Config(
                "timer intervals must be positive".to_string(),
            ));
        }
        if self.session.key.is_empty() {
            return Err(PlaybackError::Config("session.key is empty".to_string()));
        }
        if self.sync.room.is_empty() {
            return Err(PlaybackError::Config("sync.room is empty".to_string()));
        }
        if !self.graph.fft_size.is_power_of_two() || self.graph.fft_size < 32 {
            return Err(PlaybackError::Config(format!(
                "graph.fft_size must be a power of two >= 32, got {}",
                self.graph.fft_size
            )));
        }
        for (name, hz) in [
            ("bass_hz", self.graph.bass_hz),
            ("mid_hz", self.graph.mid_hz),
            ("treble_hz", self.graph.treble_hz),
        ] {
            if !(hz > 0.0) {
                return Err(PlaybackError::Config(format!("graph.{name} must be positive")));
            }
        }
        if !(self.graph.mid_q > 0.0) {
            return Err(PlaybackError::Config("graph.mid_q must be positive".to_string()));
        }
        Ok(())
    }

    pub fn fade_in(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }

    pub fn restart_threshold(&self) -> Duration {
        Duration::from_millis(self.restart_threshold_ms)
    }

    pub fn progress_poll(&self) -> Duration {
        Duration::from_millis(self.progress_poll_ms)
    }
}

impl SessionSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}
