//! Independently persisted preferences
//!
//! Each preference lives under its own key and is written on its own change,
//! separate from the session snapshot. Values are JSON.

use crate::error::Result;
use crate::history::PlayedEntry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use soul_core::{EqualizerSettings, KeyValueStore, RepeatMode, TrackId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;

pub const VOLUME_KEY: &str = "audio.volume";
pub const SHUFFLE_KEY: &str = "audio.shuffle";
pub const REPEAT_KEY: &str = "audio.repeat";
pub const EQUALIZER_KEY: &str = "audio.equalizer";
pub const LIKED_KEY: &str = "library.liked";
pub const RECENTLY_PLAYED_KEY: &str = "library.recently_played";
pub const THEME_KEY: &str = "ui.theme";

/// Everything read at engine start
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredPreferences {
    pub volume: Option<f32>,
    pub shuffle: Option<bool>,
    pub repeat: Option<RepeatMode>,
    pub equalizer: Option<EqualizerSettings>,
    pub liked: HashSet<TrackId>,
    pub recently_played: Vec<PlayedEntry>,
    pub theme: Option<String>,
}

/// Typed access to preference keys
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read a preference; unreadable values count as unset
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "Ignoring malformed preference");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Could not read preference");
                None
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json)?;
        Ok(())
    }

    /// Read every preference the engine uses
    pub fn load(&self) -> StoredPreferences {
        StoredPreferences {
            volume: self.get(VOLUME_KEY),
            shuffle: self.get(SHUFFLE_KEY),
            repeat: self.get(REPEAT_KEY),
            equalizer: self.get(EQUALIZER_KEY),
            liked: self.get(LIKED_KEY).unwrap_or_default(),
            recently_played: self.get(RECENTLY_PLAYED_KEY).unwrap_or_default(),
            theme: self.get(THEME_KEY),
        }
    }

    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.set(VOLUME_KEY, &volume)
    }

    pub fn set_shuffle(&self, shuffle: bool) -> Result<()> {
        self.set(SHUFFLE_KEY, &shuffle)
    }

    pub fn set_repeat(&self, repeat: RepeatMode) -> Result<()> {
        self.set(REPEAT_KEY, &repeat)
    }

    pub fn set_equalizer(&self, settings: &EqualizerSettings) -> Result<()> {
        self.set(EQUALIZER_KEY, settings)
    }

    /// Stored sorted, so the value is stable across runs
    pub fn set_liked(&self, liked: &HashSet<TrackId>) -> Result<()> {
        let mut ids: Vec<&TrackId> = liked.iter().collect();
        ids.sort();
        self.set(LIKED_KEY, &ids)
    }

    pub fn set_recently_played(&self, entries: &[PlayedEntry]) -> Result<()> {
        self.set(RECENTLY_PLAYED_KEY, entries)
    }

    pub fn theme(&self) -> Option<String> {
        self.get(THEME_KEY)
    }

    pub fn set_theme(&self, theme: &str) -> Result<()> {
        self.set(THEME_KEY, theme)
    }
}
