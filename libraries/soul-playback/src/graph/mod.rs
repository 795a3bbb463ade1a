//! Audio graph manager
//!
//! Owns the processing chain that sits between the platform's decoded output
//! and the destination:
//!
//! ```text
//! source -> preamp -> low-shelf -> peaking -> high-shelf -> analysis tap -> output
//! ```
//!
//! The chain is built at most once per engine. After that only the filter
//! gains change.

mod analysis;
mod biquad;

pub use analysis::{AnalysisTap, MIN_DECIBELS};
pub use biquad::{Biquad, FilterKind, MAX_GAIN_DB, SHELF_Q};

use crate::config::GraphConfig;
use crate::error::Result;
use crate::sound::OutputContext;
use soul_core::EqualizerSettings;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Current gains of the live filters (dB)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterGains {
    pub preamp: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
}

struct SignalChain {
    preamp_db: f32,
    preamp_gain: f32,
    bass: Biquad,
    mid: Biquad,
    treble: Biquad,
    tap: AnalysisTap,
}

impl SignalChain {
    fn new(config: &GraphConfig, sample_rate: u32) -> Self {
        let rate = sample_rate as f32;
        Self {
            preamp_db: 0.0,
            preamp_gain: 1.0,
            bass: Biquad::new(FilterKind::LowShelf, rate, config.bass_hz, SHELF_Q),
            mid: Biquad::new(FilterKind::Peaking, rate, config.mid_hz, config.mid_q),
            treble: Biquad::new(FilterKind::HighShelf, rate, config.treble_hz, SHELF_Q),
            tap: AnalysisTap::new(config.fft_size, sample_rate),
        }
    }

    fn apply(&mut self, settings: &EqualizerSettings) {
        self.bass.set_gain_db(settings.bass);
        self.mid.set_gain_db(settings.mid);
        self.treble.set_gain_db(settings.treble);

        self.preamp_db = if settings.preamp.is_finite() {
            settings.preamp.clamp(-MAX_GAIN_DB, MAX_GAIN_DB)
        } else {
            0.0
        };
        self.preamp_gain = 10.0_f32.powf(self.preamp_db / 20.0);
    }

    fn gains(&self) -> FilterGains {
        FilterGains {
            preamp: self.preamp_db,
            bass: self.bass.gain_db(),
            mid: self.mid.gain_db(),
            treble: self.treble.gain_db(),
        }
    }

    fn process(&mut self, buffer: &mut [f32]) {
        let mut mono = Vec::with_capacity(buffer.len() / 2);
        for frame in buffer.chunks_exact_mut(2) {
            let (l, r) = (frame[0] * self.preamp_gain, frame[1] * self.preamp_gain);
            let (l, r) = self.bass.process_frame(l, r);
            let (l, r) = self.mid.process_frame(l, r);
            let (l, r) = self.treble.process_frame(l, r);
            frame[0] = l;
            frame[1] = r;
            mono.push((l + r) * 0.5);
        }
        self.tap.write(mono);
    }
}

/// Shared handle the platform output callback runs audio through
#[derive(Clone)]
pub struct GraphProcessor {
    chain: Arc<Mutex<SignalChain>>,
}

impl GraphProcessor {
    /// Filter interleaved stereo samples in place and feed the analysis tap
    pub fn process(&self, buffer: &mut [f32]) {
        self.chain
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .process(buffer);
    }
}

/// Builds and owns the equalizer graph
pub struct AudioGraphManager {
    config: GraphConfig,
    output: Arc<dyn OutputContext>,
    chain: Option<Arc<Mutex<SignalChain>>>,
    settings: EqualizerSettings,
}

impl AudioGraphManager {
    pub fn new(config: GraphConfig, output: Arc<dyn OutputContext>) -> Self {
        Self {
            config,
            output,
            chain: None,
            settings: EqualizerSettings::FLAT,
        }
    }

    /// Build the chain; later calls are no-ops
    ///
    /// Returns `true` when this call built the graph. A suspended output is
    /// left alone here and resumed on the first user-initiated play.
    pub fn build(&mut self) -> bool {
        if self.chain.is_some() {
            debug!("Audio graph already built");
            return false;
        }

        let sample_rate = self.output.sample_rate();
        let mut chain = SignalChain::new(&self.config, sample_rate);
        chain.apply(&self.settings);
        self.chain = Some(Arc::new(Mutex::new(chain)));

        info!(
            sample_rate,
            bass_hz = self.config.bass_hz,
            mid_hz = self.config.mid_hz,
            treble_hz = self.config.treble_hz,
            "Audio graph built"
        );
        true
    }

    pub fn is_built(&self) -> bool {
        self.chain.is_some()
    }

    /// Set the filter gains from `settings`
    ///
    /// Idempotent. Before the graph exists the settings are only remembered
    /// and take effect when it is built.
    pub fn apply_equalizer(&mut self, settings: EqualizerSettings) {
        self.settings = settings;
        if let Some(chain) = &self.chain {
            chain
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .apply(&settings);
            debug!(?settings, "Equalizer applied");
        }
    }

    pub fn settings(&self) -> EqualizerSettings {
        self.settings
    }

    /// Live filter gains, `None` before the graph is built
    pub fn filter_gains(&self) -> Option<FilterGains> {
        self.chain
            .as_ref()
            .map(|c| c.lock().unwrap_or_else(PoisonError::into_inner).gains())
    }

    /// Resume the platform output if it is suspended
    pub fn ensure_output_running(&self) -> Result<()> {
        if self.output.is_suspended() {
            info!("Resuming suspended audio output");
            if let Err(e) = self.output.resume() {
                warn!(error = %e, "Failed to resume audio output");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Read-only handle for visualization
    pub fn analysis_tap(&self) -> Option<AnalysisTap> {
        self.chain.as_ref().map(|c| {
            c.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .tap
                .clone()
        })
    }

    /// Handle for the platform output callback
    pub fn processor(&self) -> Option<GraphProcessor> {
        self.chain.as_ref().map(|chain| GraphProcessor {
            chain: Arc::clone(chain),
        })
    }
}
