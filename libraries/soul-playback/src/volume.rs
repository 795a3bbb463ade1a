//! Output volume and the fade-in ramp
//!
//! Volume is a linear 0.0-1.0 gain handed to the sound instance. New sounds
//! start muted and ramp up along an S-curve so the first samples never pop.

use std::time::Duration;
use tokio::time::Instant;

/// Output volume level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Volume {
    level: f32,
}

impl Volume {
    /// Create new volume, clamped to 0.0-1.0
    pub fn new(level: f32) -> Self {
        Self {
            level: clamp_level(level),
        }
    }

    /// Set volume level (0.0-1.0)
    pub fn set_level(&mut self, level: f32) {
        self.level = clamp_level(level);
    }

    /// Gain to hand to the sound instance
    pub fn level(&self) -> f32 {
        self.level
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn clamp_level(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

/// Time-based fade from silence to full gain
#[derive(Debug, Clone, Copy)]
pub struct FadeRamp {
    started: Instant,
    duration: Duration,
}

impl FadeRamp {
    pub fn new(started: Instant, duration: Duration) -> Self {
        Self { started, duration }
    }

    /// Gain multiplier at `now`, 0.0 at start and 1.0 once complete
    ///
    /// S-curve: `(1 - cos(π·t)) / 2`, smooth at both ends.
    pub fn factor(&self, now: Instant) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(self.started);
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        if t >= 1.0 {
            return 1.0;
        }
        (1.0 - (std::f32::consts::PI * t).cos()) * 0.5
    }

    pub fn is_complete(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started) >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_clamped() {
        let mut vol = Volume::new(1.5);
        assert_eq!(vol.level(), 1.0);

        vol.set_level(-0.2);
        assert_eq!(vol.level(), 0.0);

        vol.set_level(f32::NAN);
        assert_eq!(vol.level(), 0.0);
    }

    #[test]
    fn fade_follows_s_curve() {
        let start = Instant::now();
        let fade = FadeRamp::new(start, Duration::from_millis(500));

        assert_eq!(fade.factor(start), 0.0);
        assert!((fade.factor(start + Duration::from_millis(250)) - 0.5).abs() < 1e-4);
        assert!(fade.factor(start + Duration::from_millis(100)) < 0.2);
        assert_eq!(fade.factor(start + Duration::from_millis(500)), 1.0);
        assert_eq!(fade.factor(start + Duration::from_secs(2)), 1.0);
        assert!(fade.is_complete(start + Duration::from_millis(500)));
        assert!(!fade.is_complete(start + Duration::from_millis(499)));
    }

    #[test]
    fn zero_length_fade_is_immediate() {
        let start = Instant::now();
        let fade = FadeRamp::new(start, Duration::ZERO);
        assert_eq!(fade.factor(start), 1.0);
    }
}
