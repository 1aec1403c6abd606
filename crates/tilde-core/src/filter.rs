//! Runtime-controllable biquad filter.
//!
//! [`Filter`] wraps one [`BiquadState`] with a design ([`FilterType`]), a
//! resonance parameterisation ([`ResonanceMode`]) and a coefficient cache.
//! Frequency, resonance and gain may change every sample; coefficients are
//! only redesigned when one of them actually differs from the cached value.

use crate::biquad::{
    BiquadCoeffs, BiquadState, MIN_Q, allpass_coefficients, bandpass_coefficients, bandstop_coefficients,
    bandwidth_to_q, high_shelf_coefficients, highpass_coefficients, low_shelf_coefficients, lowpass_coefficients,
    omega, peaking_coefficients, resonant_coefficients, t60_to_q,
};
use crate::kernel::{ControlEvents, Kernel, KernelCategory, Signal, input_at};

/// Distance kept from 0 Hz and Nyquist by most designs.
const FREQ_MARGIN: f64 = 1e-6;
/// Distance kept by the EQ and shelf designs.
const EQ_FREQ_MARGIN: f64 = 0.1;

/// Filter design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterType {
    /// 12 dB/oct low-pass.
    #[default]
    Lowpass,
    /// 12 dB/oct high-pass.
    Highpass,
    /// Band-pass, 0 dB peak.
    Bandpass,
    /// Notch.
    Bandstop,
    /// Phase-only all-pass.
    Allpass,
    /// Band-pass whose peak gain rises with Q.
    Resonant,
    /// Parametric bell (uses gain).
    Peaking,
    /// Low shelf (resonance is the shelf slope, uses gain).
    LowShelf,
    /// High shelf (resonance is the shelf slope, uses gain).
    HighShelf,
}

impl FilterType {
    /// Returns `true` for designs that read the dB gain input.
    pub const fn uses_gain(self) -> bool {
        matches!(self, FilterType::Peaking | FilterType::LowShelf | FilterType::HighShelf)
    }

    /// Returns `true` for shelf designs, whose resonance is a slope.
    pub const fn is_shelf(self) -> bool {
        matches!(self, FilterType::LowShelf | FilterType::HighShelf)
    }

    /// Lower-case name as used in configuration files.
    pub const fn name(self) -> &'static str {
        match self {
            FilterType::Lowpass => "lowpass",
            FilterType::Highpass => "highpass",
            FilterType::Bandpass => "bandpass",
            FilterType::Bandstop => "bandstop",
            FilterType::Allpass => "allpass",
            FilterType::Resonant => "resonant",
            FilterType::Peaking => "eq",
            FilterType::LowShelf => "lowshelf",
            FilterType::HighShelf => "highshelf",
        }
    }
}

/// How the resonance input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResonanceMode {
    /// Q directly.
    #[default]
    Q,
    /// Bandwidth in octaves.
    Bandwidth,
    /// Decay time to -60 dB in milliseconds.
    T60,
}

/// Biquad filter with lazy coefficient recomputation.
///
/// ## Parameters
///
/// - `frequency`: Hz, clamped just inside `(0, nyquist)` (default 1000.0)
/// - `resonance`: Q, octaves or ms depending on [`ResonanceMode`] (default 0.707)
/// - `gain_db`: dB, only read by peaking and shelf designs (default 0.0)
///
/// # Example
///
/// ```rust
/// use tilde_core::{Filter, FilterType};
///
/// let mut lp = Filter::new(48000.0, FilterType::Lowpass);
/// lp.set_frequency(500.0);
/// let y = lp.process(1.0);
/// assert!(y > 0.0 && y < 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Filter {
    filter_type: FilterType,
    mode: ResonanceMode,
    coeffs: BiquadCoeffs,
    state: BiquadState,
    sample_rate: f64,
    nyquist: f64,
    frequency: f64,
    resonance: f64,
    gain_db: f64,
    cached: (f64, f64, f64),
    bypass: bool,
    updates: u64,
}

impl Default for Filter {
    fn default() -> Self {
        Self::new(48000.0, FilterType::Lowpass)
    }
}

impl Filter {
    /// Create a filter with default parameters.
    pub fn new(sample_rate: f64, filter_type: FilterType) -> Self {
        let sample_rate = if sample_rate > 0.0 { sample_rate } else { 48000.0 };
        let mut filter = Self {
            filter_type,
            mode: ResonanceMode::Q,
            coeffs: BiquadCoeffs::BYPASS,
            state: BiquadState::new(),
            sample_rate,
            nyquist: sample_rate / 2.0,
            frequency: 1000.0,
            resonance: if filter_type.is_shelf() { 1.0 } else { 0.707 },
            gain_db: 0.0,
            cached: (f64::NAN, f64::NAN, f64::NAN),
            bypass: false,
            updates: 0,
        };
        filter.redesign(filter.frequency, filter.resonance, filter.gain_db);
        filter
    }

    /// Design in use.
    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    /// Change the design. History is kept; coefficients are redesigned.
    pub fn set_filter_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
        self.redesign(self.cached.0, self.cached.1, self.cached.2);
    }

    /// Set the default frequency in Hz, used when no frequency input is given.
    pub fn set_frequency(&mut self, hz: f64) {
        if hz.is_finite() {
            self.frequency = hz;
        }
    }

    /// Default frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Set the default resonance (meaning depends on the mode).
    pub fn set_resonance(&mut self, resonance: f64) {
        if resonance.is_finite() {
            #[cfg(feature = "tracing")]
            {
                if self.mode == ResonanceMode::Q && resonance < MIN_Q && !self.filter_type.uses_gain() {
                    tracing::debug!(resonance, filter = self.filter_type.name(), "degenerate Q, filter passes input through");
                }
            }
            self.resonance = resonance;
        }
    }

    /// Default resonance.
    pub fn resonance(&self) -> f64 {
        self.resonance
    }

    /// Set the default gain in dB.
    pub fn set_gain_db(&mut self, db: f64) {
        if db.is_finite() {
            self.gain_db = db;
        }
    }

    /// Default gain in dB.
    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    /// Switch resonance parameterisation. Coefficients follow immediately.
    pub fn set_resonance_mode(&mut self, mode: ResonanceMode) {
        if mode != self.mode {
            #[cfg(feature = "tracing")]
            tracing::debug!(?mode, filter = self.filter_type.name(), "resonance mode changed");
            self.mode = mode;
            self.redesign(self.cached.0, self.cached.1, self.cached.2);
        }
    }

    /// Current resonance parameterisation.
    pub fn resonance_mode(&self) -> ResonanceMode {
        self.mode
    }

    /// When set, input is copied to output and history freezes.
    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    /// Returns `true` when bypassed.
    pub fn bypass(&self) -> bool {
        self.bypass
    }

    /// Zero the history, keeping coefficients.
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// Coefficients currently in use.
    pub fn coefficients(&self) -> BiquadCoeffs {
        self.coeffs
    }

    /// Number of coefficient redesigns so far.
    pub fn coefficient_updates(&self) -> u64 {
        self.updates
    }

    /// History of the single section.
    pub fn state(&self) -> &BiquadState {
        &self.state
    }

    /// Process one sample with the default parameters.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.process_with(input, self.frequency, self.resonance, self.gain_db)
    }

    /// Process one sample with explicit control values.
    #[inline]
    pub fn process_with(&mut self, input: f32, frequency: f64, resonance: f64, gain_db: f64) -> f32 {
        if self.bypass {
            return input;
        }
        let f = self.clamp_frequency(frequency);
        let reson = self.clamp_resonance(resonance);
        let db = if self.filter_type.uses_gain() && gain_db.is_finite() { gain_db } else { 0.0 };
        if f != self.cached.0 || reson != self.cached.1 || db != self.cached.2 {
            self.redesign(f, reson, db);
        }
        self.state.process(&self.coeffs, f64::from(input)) as f32
    }

    fn clamp_frequency(&self, frequency: f64) -> f64 {
        let margin = if self.filter_type.uses_gain() { EQ_FREQ_MARGIN } else { FREQ_MARGIN };
        // at very low rates the margin shrinks to keep the range non-empty
        let margin = margin.min(self.nyquist * 0.5);
        let f = if frequency.is_nan() { margin } else { frequency };
        f.max(margin).min(self.nyquist - margin)
    }

    fn clamp_resonance(&self, resonance: f64) -> f64 {
        if resonance.is_nan() {
            return 0.0;
        }
        if self.filter_type == FilterType::Peaking && resonance < MIN_Q {
            return MIN_Q;
        }
        resonance
    }

    /// Recompute coefficients and remember the parameters they were built
    /// from.
    fn redesign(&mut self, frequency: f64, resonance: f64, gain_db: f64) {
        let f = self.clamp_frequency(frequency);
        let reson = self.clamp_resonance(resonance);
        let db = if gain_db.is_finite() { gain_db } else { 0.0 };
        self.cached = (f, reson, db);
        self.updates += 1;

        let nyq = self.nyquist;
        self.coeffs = if self.filter_type.is_shelf() {
            match self.filter_type {
                FilterType::LowShelf => low_shelf_coefficients(f, reson, db, nyq),
                _ => high_shelf_coefficients(f, reson, db, nyq),
            }
        } else {
            let q = match self.mode {
                ResonanceMode::Q => reson,
                ResonanceMode::Bandwidth => bandwidth_to_q(reson, omega(f, nyq)),
                ResonanceMode::T60 => t60_to_q(f, reson),
            };
            match self.filter_type {
                FilterType::Lowpass => lowpass_coefficients(f, q, nyq),
                FilterType::Highpass => highpass_coefficients(f, q, nyq),
                FilterType::Bandpass => bandpass_coefficients(f, q, nyq),
                FilterType::Bandstop => bandstop_coefficients(f, q, nyq),
                FilterType::Allpass => allpass_coefficients(f, q, nyq),
                FilterType::Resonant => resonant_coefficients(f, q, nyq),
                FilterType::Peaking => peaking_coefficients(f, q, db, nyq),
                FilterType::LowShelf | FilterType::HighShelf => BiquadCoeffs::BYPASS,
            }
        };
    }
}

impl Kernel for Filter {
    fn category(&self) -> KernelCategory {
        KernelCategory::Filter
    }

    fn input_names(&self) -> &'static [&'static str] {
        if self.filter_type.uses_gain() {
            &["signal", "frequency", "resonance", "gain"]
        } else {
            &["signal", "frequency", "resonance"]
        }
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        let (freq, reson, db) = (self.frequency as f32, self.resonance as f32, self.gain_db as f32);
        for (n, out) in output.iter_mut().enumerate() {
            *out = self.process_with(
                input_at(inputs, 0, n, 0.0),
                f64::from(input_at(inputs, 1, n, freq)),
                f64::from(input_at(inputs, 2, n, reson)),
                f64::from(input_at(inputs, 3, n, db)),
            );
        }
        self.state.flush_denormals();
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate.is_nan() || sample_rate <= 0.0 {
            return;
        }
        let nyquist = sample_rate / 2.0;
        self.sample_rate = sample_rate;
        if nyquist != self.nyquist {
            self.nyquist = nyquist;
            self.redesign(self.cached.0, self.cached.1, self.cached.2);
        }
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bypass_passes_input() {
        let mut f = Filter::new(44100.0, FilterType::Resonant);
        f.set_resonance(20.0);
        f.process(1.0);
        let before = *f.state();
        f.set_bypass(true);
        for x in [0.3, -0.7, 1.0, 0.0] {
            assert_eq!(f.process(x), x);
        }
        assert_eq!(*f.state(), before, "history freezes while bypassed");
    }

    #[test]
    fn test_lazy_recompute() {
        let mut f = Filter::new(48000.0, FilterType::Lowpass);
        let start = f.coefficient_updates();
        for _ in 0..64 {
            f.process_with(0.5, 800.0, 1.0, 0.0);
        }
        assert_eq!(f.coefficient_updates(), start + 1);
        f.process_with(0.5, 801.0, 1.0, 0.0);
        assert_eq!(f.coefficient_updates(), start + 2);
        // Gain is ignored by designs that do not use it
        f.process_with(0.5, 801.0, 1.0, 6.0);
        assert_eq!(f.coefficient_updates(), start + 2);
    }

    #[test]
    fn test_degenerate_q_passthrough() {
        let mut f = Filter::new(48000.0, FilterType::Lowpass);
        f.set_resonance(1e-9);
        for x in [0.1, 0.9, -0.4, 0.25] {
            assert_eq!(f.process(x), x);
        }
        assert!(f.coefficients().is_bypass());
    }

    #[test]
    fn test_t60_zero_is_bypass() {
        let mut f = Filter::new(48000.0, FilterType::Resonant);
        f.set_resonance_mode(ResonanceMode::T60);
        f.set_resonance(0.0);
        assert_eq!(f.process(0.5), 0.5);
    }

    #[test]
    fn test_frequency_clamped() {
        let mut f = Filter::new(48000.0, FilterType::Lowpass);
        let y = f.process_with(1.0, 1e9, 0.707, 0.0);
        assert!(y.is_finite());
        let y = f.process_with(1.0, -50.0, 0.707, 0.0);
        assert!(y.is_finite());
        let y = f.process_with(1.0, f64::NAN, f64::NAN, 0.0);
        assert!(y.is_finite());
    }

    #[test]
    fn test_clear_keeps_coefficients() {
        let mut f = Filter::new(48000.0, FilterType::Bandpass);
        for _ in 0..10 {
            f.process(1.0);
        }
        let coeffs = f.coefficients();
        f.clear();
        assert_eq!(f.state().history(), [0.0; 4]);
        assert_eq!(f.coefficients(), coeffs);
    }

    #[test]
    fn test_sample_rate_change_redesigns() {
        let mut f = Filter::new(48000.0, FilterType::Lowpass);
        f.process(0.0);
        let before = f.coefficients();
        f.set_sample_rate(96000.0);
        assert_ne!(f.coefficients(), before);
        assert_eq!(f.coefficients(), lowpass_coefficients(1000.0, 0.707, 48000.0));
    }

    #[test]
    fn test_frequency_clamp_at_tiny_sample_rate() {
        for filter_type in [FilterType::Peaking, FilterType::LowShelf, FilterType::Lowpass] {
            let mut f = Filter::new(0.1, filter_type);
            for freq in [-1.0, 0.0, 0.02, 1000.0, f64::NAN] {
                let y = f.process_with(1.0, freq, 0.707, 6.0);
                assert!(y.is_finite(), "{filter_type:?} at {freq} Hz gave {y}");
                let used = f.cached.0;
                assert!(used > 0.0 && used < 0.05, "{filter_type:?} clamped {freq} Hz to {used}");
            }
        }
    }

    #[test]
    fn test_bandwidth_mode() {
        let mut f = Filter::new(48000.0, FilterType::Bandpass);
        f.set_resonance_mode(ResonanceMode::Bandwidth);
        f.set_resonance(1.0);
        f.process(0.0);
        let q = bandwidth_to_q(1.0, omega(1000.0, 24000.0));
        assert_eq!(f.coefficients(), bandpass_coefficients(1000.0, q, 24000.0));
    }

    #[test]
    fn test_kernel_block() {
        let mut f = Filter::new(48000.0, FilterType::Highpass);
        let input = [1.0f32; 256];
        let mut out = [0.0f32; 256];
        let mut events = ControlEvents::new();
        f.process_block(&[Signal::Audio(&input), Signal::Scalar(200.0)], &mut out, &mut events);
        // High-pass removes DC
        assert!(out[255].abs() < 0.05, "residual {}", out[255]);
        assert!(events.is_empty());
    }
}
