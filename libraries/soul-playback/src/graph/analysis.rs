//! Spectrum analysis tap
//!
//! Collects the most recent mono-mixed samples leaving the filter chain and
//! serves them to visualizers. Consumers get read access only.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Magnitude floor for empty bins (dB)
pub const MIN_DECIBELS: f32 = -100.0;

struct TapBuffer {
    samples: VecDeque<f32>,
}

/// Read-only handle on the analysis tap
#[derive(Clone)]
pub struct AnalysisTap {
    buffer: Arc<Mutex<TapBuffer>>,
    fft: Arc<dyn Fft<f32>>,
    window: Arc<[f32]>,
    fft_size: usize,
    sample_rate: u32,
}

impl std::fmt::Debug for AnalysisTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisTap")
            .field("fft_size", &self.fft_size)
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

impl AnalysisTap {
    pub(crate) fn new(fft_size: usize, sample_rate: u32) -> Self {
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let denom = (fft_size.max(2) - 1) as f32;
        let window: Arc<[f32]> = (0..fft_size)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / denom).cos())
            .collect();

        Self {
            buffer: Arc::new(Mutex::new(TapBuffer {
                samples: VecDeque::with_capacity(fft_size),
            })),
            fft,
            window,
            fft_size,
            sample_rate,
        }
    }

    /// Append samples, keeping only the newest `fft_size`
    pub(crate) fn write(&self, samples: impl IntoIterator<Item = f32>) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        for sample in samples {
            if buffer.samples.len() == self.fft_size {
                buffer.samples.pop_front();
            }
            buffer.samples.push_back(sample);
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of frequency bins returned by [`Self::frequency_data`]
    pub fn bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Center frequency of a bin (Hz)
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.fft_size as f32
    }

    /// Latest `fft_size` samples, oldest first, zero padded at the front
    pub fn time_domain_data(&self) -> Vec<f32> {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = vec![0.0; self.fft_size - buffer.samples.len()];
        out.extend(buffer.samples.iter().copied());
        out
    }

    /// Hann-windowed magnitude spectrum in dB, `fft_size / 2` bins
    pub fn frequency_data(&self) -> Vec<f32> {
        let mut spectrum: Vec<Complex<f32>> = self
            .time_domain_data()
            .into_iter()
            .zip(self.window.iter())
            .map(|(s, w)| Complex::new(s * w, 0.0))
            .collect();

        self.fft.process(&mut spectrum);

        // Hann window has a coherent gain of 0.5
        let scale = 2.0 / (self.fft_size as f32 * 0.5);
        spectrum
            .iter()
            .take(self.bin_count())
            .map(|c| {
                let magnitude = c.norm() * scale;
                if magnitude > 0.0 {
                    (20.0 * magnitude.log10()).max(MIN_DECIBELS)
                } else {
                    MIN_DECIBELS
                }
            })
            .collect()
    }
}
