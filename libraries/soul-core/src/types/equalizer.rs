/// Equalizer settings
use serde::{Deserialize, Serialize};

/// Three-band equalizer plus preamp, all in signed decibels
///
/// Independent of any track; the default is flat (all zero).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EqualizerSettings {
    /// Low-shelf gain (dB)
    pub bass: f32,
    /// Peaking gain (dB)
    pub mid: f32,
    /// High-shelf gain (dB)
    pub treble: f32,
    /// Gain applied before the filters (dB)
    pub preamp: f32,
}

impl EqualizerSettings {
    /// Flat response
    pub const FLAT: Self = Self {
        bass: 0.0,
        mid: 0.0,
        treble: 0.0,
        preamp: 0.0,
    };

    /// Create settings from band gains with no preamp
    pub fn new(bass: f32, mid: f32, treble: f32) -> Self {
        Self {
            bass,
            mid,
            treble,
            preamp: 0.0,
        }
    }

    /// Set the preamp gain
    #[must_use]
    pub fn with_preamp(mut self, preamp: f32) -> Self {
        self.preamp = preamp;
        self
    }

    /// Whether every gain is zero
    pub fn is_flat(&self) -> bool {
        *self == Self::FLAT
    }
}
