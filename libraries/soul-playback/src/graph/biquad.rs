//! RBJ biquad filters for the three equalizer bands

/// Gain range accepted by every band (dB)
pub const MAX_GAIN_DB: f32 = 12.0;

/// Shelf slope used for both shelving bands
pub const SHELF_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowShelf,
    Peaking,
    HighShelf,
}

#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

/// Stereo biquad filter with a fixed corner and adjustable gain
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    sample_rate: f32,
    frequency: f32,
    q: f32,
    gain_db: f32,

    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    left: ChannelState,
    right: ChannelState,
}

impl Biquad {
    /// Create a filter at 0 dB (pass-through)
    pub fn new(kind: FilterKind, sample_rate: f32, frequency: f32, q: f32) -> Self {
        let mut filter = Self {
            kind,
            sample_rate,
            frequency,
            q,
            gain_db: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            left: ChannelState::default(),
            right: ChannelState::default(),
        };
        filter.update_coefficients();
        filter
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Set the band gain, clamped to ±12 dB
    pub fn set_gain_db(&mut self, gain_db: f32) {
        let gain_db = if gain_db.is_finite() {
            gain_db.clamp(-MAX_GAIN_DB, MAX_GAIN_DB)
        } else {
            0.0
        };
        if gain_db == self.gain_db {
            return;
        }
        self.gain_db = gain_db;
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        // Flat bands are exact pass-through
        if self.gain_db == 0.0 || self.sample_rate < 1.0 {
            self.set_normalized(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);
            return;
        }

        let a = 10.0_f32.powf(self.gain_db / 40.0);
        // Keep the corner away from Nyquist
        let frequency = self.frequency.min(self.sample_rate * 0.45);
        let omega = 2.0 * std::f32::consts::PI * frequency / self.sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();

        match self.kind {
            FilterKind::Peaking => {
                let alpha = sin_omega / (2.0 * self.q);
                self.set_normalized(
                    1.0 + alpha * a,
                    -2.0 * cos_omega,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_omega,
                    1.0 - alpha / a,
                );
            }
            FilterKind::LowShelf => {
                let alpha =
                    sin_omega / 2.0 * ((a + 1.0 / a) * (1.0 / self.q - 1.0) + 2.0).sqrt();
                let beta = 2.0 * a.sqrt() * alpha;
                self.set_normalized(
                    a * ((a + 1.0) - (a - 1.0) * cos_omega + beta),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
                    a * ((a + 1.0) - (a - 1.0) * cos_omega - beta),
                    (a + 1.0) + (a - 1.0) * cos_omega + beta,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
                    (a + 1.0) + (a - 1.0) * cos_omega - beta,
                );
            }
            FilterKind::HighShelf => {
                let alpha =
                    sin_omega / 2.0 * ((a + 1.0 / a) * (1.0 / self.q - 1.0) + 2.0).sqrt();
                let beta = 2.0 * a.sqrt() * alpha;
                self.set_normalized(
                    a * ((a + 1.0) + (a - 1.0) * cos_omega + beta),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
                    a * ((a + 1.0) + (a - 1.0) * cos_omega - beta),
                    (a + 1.0) - (a - 1.0) * cos_omega + beta,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
                    (a + 1.0) - (a - 1.0) * cos_omega - beta,
                );
            }
        }
    }

    fn set_normalized(&mut self, b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) {
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    /// Process one stereo frame
    #[inline]
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        let coeffs = (self.b0, self.b1, self.b2, self.a1, self.a2);
        (
            run(&mut self.left, coeffs, left),
            run(&mut self.right, coeffs, right),
        )
    }

    /// Clear filter memory (coefficients are kept)
    pub fn reset(&mut self) {
        self.left = ChannelState::default();
        self.right = ChannelState::default();
    }

    /// Magnitude response at `frequency` in dB
    pub fn response_db(&self, frequency: f32) -> f32 {
        let omega = 2.0 * std::f32::consts::PI * frequency / self.sample_rate;
        let (c1, s1) = (omega.cos(), omega.sin());
        let (c2, s2) = ((2.0 * omega).cos(), (2.0 * omega).sin());

        let num_re = self.b0 + self.b1 * c1 + self.b2 * c2;
        let num_im = -(self.b1 * s1 + self.b2 * s2);
        let den_re = 1.0 + self.a1 * c1 + self.a2 * c2;
        let den_im = -(self.a1 * s1 + self.a2 * s2);

        let num = (num_re * num_re + num_im * num_im).sqrt();
        let den = (den_re * den_re + den_im * den_im).sqrt();
        20.0 * (num / den).log10()
    }
}

#[inline]
fn run(state: &mut ChannelState, (b0, b1, b2, a1, a2): (f32, f32, f32, f32, f32), x: f32) -> f32 {
    let mut y = b0 * x + b1 * state.x1 + b2 * state.x2 - a1 * state.y1 - a2 * state.y2;

    // Flush denormals
    if y.abs() < 1e-15 {
        y = 0.0;
    }

    state.x2 = state.x1;
    state.x1 = x;
    state.y2 = state.y1;
    state.y1 = y;
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_filter_is_pass_through() {
        let mut filter = Biquad::new(FilterKind::Peaking, 48_000.0, 1_000.0, 0.5);
        for x in [0.5, -0.25, 0.75, 0.0] {
            assert_eq!(filter.process_frame(x, -x), (x, -x));
        }
    }

    #[test]
    fn gain_is_clamped() {
        let mut filter = Biquad::new(FilterKind::LowShelf, 48_000.0, 320.0, SHELF_Q);
        filter.set_gain_db(30.0);
        assert_eq!(filter.gain_db(), MAX_GAIN_DB);
        filter.set_gain_db(-30.0);
        assert_eq!(filter.gain_db(), -MAX_GAIN_DB);
        filter.set_gain_db(f32::NAN);
        assert_eq!(filter.gain_db(), 0.0);
    }

    #[test]
    fn peaking_boost_at_center() {
        let mut filter = Biquad::new(FilterKind::Peaking, 48_000.0, 1_000.0, 0.5);
        filter.set_gain_db(6.0);
        assert!((filter.response_db(1_000.0) - 6.0).abs() < 0.1);
        assert!(filter.response_db(20.0).abs() < 0.5);
    }

    #[test]
    fn shelves_affect_their_side() {
        let mut low = Biquad::new(FilterKind::LowShelf, 48_000.0, 320.0, SHELF_Q);
        low.set_gain_db(9.0);
        assert!((low.response_db(30.0) - 9.0).abs() < 0.5);
        assert!(low.response_db(15_000.0).abs() < 0.5);

        let mut high = Biquad::new(FilterKind::HighShelf, 48_000.0, 3_200.0, SHELF_Q);
        high.set_gain_db(-9.0);
        assert!((high.response_db(18_000.0) + 9.0).abs() < 0.5);
        assert!(high.response_db(50.0).abs() < 0.5);
    }
}
