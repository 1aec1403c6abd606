//! State Variable Filter.
//!
//! Produces lowpass, highpass, bandpass and notch from one set of state, and
//! stays well-behaved under fast cutoff modulation.
//!
//! # Topology
//!
//! Topology-Preserving Transform (TPT) SVF after Zavalishin, "The Art of VA
//! Filter Design". The trapezoidal integrators keep the analog prototype's
//! response, so cutoff can be swept every sample.
//!
//! Coefficients (`g = tan(PI * f / sr)`, `k = 1 / Q`) follow the same lazy
//! policy as [`Filter`](crate::Filter): they are only recomputed when the
//! frequency or Q input changes. A Q below [`MIN_Q`] bypasses the filter.

use core::f64::consts::PI;
use libm::tan;

use crate::biquad::MIN_Q;
use crate::kernel::{ControlEvents, Kernel, KernelCategory, Signal, input_at};
use crate::math::flush_denormal;

/// Which SVF response [`StateVariableFilter::process`] returns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SvfOutput {
    /// Low-pass response.
    #[default]
    Lowpass,
    /// High-pass response.
    Highpass,
    /// Band-pass response.
    Bandpass,
    /// Band-reject response.
    Notch,
}

/// All four SVF responses for one sample.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SvfFrame {
    /// Low-pass.
    pub lowpass: f64,
    /// High-pass.
    pub highpass: f64,
    /// Band-pass.
    pub bandpass: f64,
    /// Notch.
    pub notch: f64,
}

/// TPT state variable filter (2-pole, 12 dB/oct).
///
/// # Example
///
/// ```rust
/// use tilde_core::{StateVariableFilter, SvfOutput};
///
/// let mut svf = StateVariableFilter::new(48000.0);
/// svf.set_frequency(800.0);
/// svf.set_q(2.0);
/// svf.set_output(SvfOutput::Bandpass);
/// let y = svf.process(0.5);
/// assert!(y.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct StateVariableFilter {
    ic1eq: f64,
    ic2eq: f64,
    g: f64,
    k: f64,
    sample_rate: f64,
    frequency: f64,
    q: f64,
    cached: (f64, f64),
    output: SvfOutput,
    bypass: bool,
}

impl Default for StateVariableFilter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl StateVariableFilter {
    /// Create with cutoff 1000 Hz, Q 0.707, lowpass output.
    pub fn new(sample_rate: f64) -> Self {
        let mut svf = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            g: 0.0,
            k: 0.0,
            sample_rate: if sample_rate > 0.0 { sample_rate } else { 48000.0 },
            frequency: 1000.0,
            q: 0.707,
            cached: (f64::NAN, f64::NAN),
            output: SvfOutput::Lowpass,
            bypass: false,
        };
        svf.update_coefficients(svf.frequency, svf.q);
        svf
    }

    /// Set the default cutoff in Hz.
    pub fn set_frequency(&mut self, hz: f64) {
        if hz.is_finite() {
            self.frequency = hz;
        }
    }

    /// Default cutoff in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Set the default Q.
    pub fn set_q(&mut self, q: f64) {
        if q.is_finite() {
            self.q = q;
        }
    }

    /// Default Q.
    pub fn q(&self) -> f64 {
        self.q
    }

    /// Choose the response returned by [`process`](Self::process).
    pub fn set_output(&mut self, output: SvfOutput) {
        self.output = output;
    }

    /// Response returned by [`process`](Self::process).
    pub fn output(&self) -> SvfOutput {
        self.output
    }

    /// When set, input is copied to output and state freezes.
    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    /// Returns `true` when bypassed.
    pub fn bypass(&self) -> bool {
        self.bypass
    }

    /// Zero the integrator state.
    pub fn clear(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    fn update_coefficients(&mut self, frequency: f64, q: f64) {
        let nyquist = self.sample_rate / 2.0;
        let f = if frequency.is_nan() { 1e-6 } else { frequency.max(1e-6).min(nyquist - 1e-6) };
        self.cached = (frequency, q);
        self.g = tan(PI * f / self.sample_rate);
        self.k = if q >= MIN_Q { 1.0 / q } else { 0.0 };
    }

    /// Process one sample with explicit controls, returning every response.
    ///
    /// With a degenerate Q every response equals the input.
    #[inline]
    pub fn process_all(&mut self, input: f64, frequency: f64, q: f64) -> SvfFrame {
        let degenerate = q.is_nan() || q < MIN_Q;
        if self.bypass || degenerate {
            return SvfFrame {
                lowpass: input,
                highpass: input,
                bandpass: input,
                notch: input,
            };
        }
        if frequency != self.cached.0 || q != self.cached.1 {
            self.update_coefficients(frequency, q);
        }

        let v3 = input - self.ic2eq;
        let v1 = (self.g * v3 + self.ic1eq) / (1.0 + self.g * (self.g + self.k));
        let v2 = self.ic2eq + self.g * v1;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        let lowpass = v2;
        let highpass = input - self.k * v1 - v2;
        SvfFrame {
            lowpass,
            highpass,
            bandpass: v1,
            notch: lowpass + highpass,
        }
    }

    /// Process one sample with the default controls and selected output.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let frame = self.process_all(f64::from(input), self.frequency, self.q);
        self.select(&frame) as f32
    }

    fn select(&self, frame: &SvfFrame) -> f64 {
        match self.output {
            SvfOutput::Lowpass => frame.lowpass,
            SvfOutput::Highpass => frame.highpass,
            SvfOutput::Bandpass => frame.bandpass,
            SvfOutput::Notch => frame.notch,
        }
    }
}

impl Kernel for StateVariableFilter {
    fn category(&self) -> KernelCategory {
        KernelCategory::Filter
    }

    fn input_names(&self) -> &'static [&'static str] {
        &["signal", "frequency", "q"]
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        let (freq, q) = (self.frequency as f32, self.q as f32);
        for (n, out) in output.iter_mut().enumerate() {
            let frame = self.process_all(
                f64::from(input_at(inputs, 0, n, 0.0)),
                f64::from(input_at(inputs, 1, n, freq)),
                f64::from(input_at(inputs, 2, n, q)),
            );
            *out = self.select(&frame) as f32;
        }
        self.ic1eq = flush_denormal(self.ic1eq);
        self.ic2eq = flush_denormal(self.ic2eq);
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        if sample_rate.is_nan() || sample_rate <= 0.0 || sample_rate == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        self.update_coefficients(self.cached.0, self.cached.1);
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn reset(&mut self) {
        self.clear();
    }
}
