//! Wrap-driven generators: a one-sample impulse train and a phasor that
//! reports its wraps.

use tilde_core::{
    ControlEvents, Kernel, KernelCategory, PhaseAccumulator, PhaseStep, Signal, StepLimit, input_at, midi_to_hz,
};

/// Impulse train: `1.0` on every sample where the phase wraps, else `0.0`.
///
/// Uses the full `±1` step clamp, so at the sample rate every sample is an
/// impulse. A fresh impulse fires on its first sample.
///
/// # Example
///
/// ```rust
/// use tilde_osc::Impulse;
///
/// let mut imp = Impulse::new(8.0);
/// imp.set_frequency(2.0);
/// let out: Vec<f32> = (0..8).map(|_| imp.advance()).collect();
/// assert_eq!(out, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Impulse {
    phase: PhaseAccumulator,
    frequency: f32,
}

impl Impulse {
    /// Create an impulse train at 0 Hz, primed to fire immediately.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            phase: PhaseAccumulator::new(sample_rate, StepLimit::Full).with_phase(0.0),
            frequency: 0.0,
        }
    }

    /// Set the block-constant frequency in Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Block-constant frequency input.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set the phase absolutely. Phase 0 fires on the next sample.
    pub fn set_phase(&mut self, phase: f64) {
        self.phase.set_phase(phase);
    }

    /// Underlying phase accumulator.
    pub fn accumulator(&self) -> &PhaseAccumulator {
        &self.phase
    }

    /// Generate one sample at the stored frequency.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        impulse(self.phase.advance(f64::from(self.frequency)))
    }

    /// Generate one sample from per-sample inputs.
    #[inline]
    pub fn process(&mut self, frequency: f64, offset: f64, trigger: f64) -> f32 {
        impulse(self.phase.step(frequency, offset, trigger))
    }
}

#[inline]
fn impulse(step: PhaseStep) -> f32 {
    if step.wrapped { 1.0 } else { 0.0 }
}

impl Kernel for Impulse {
    fn category(&self) -> KernelCategory {
        KernelCategory::Oscillator
    }

    fn input_names(&self) -> &'static [&'static str] {
        &["frequency", "sync", "phase"]
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        let freq = self.frequency;
        for (n, out) in output.iter_mut().enumerate() {
            *out = self.process(
                f64::from(input_at(inputs, 0, n, freq)),
                f64::from(input_at(inputs, 2, n, 0.0)),
                f64::from(input_at(inputs, 1, n, 0.0)),
            );
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.phase.set_sample_rate(sample_rate);
    }

    fn sample_rate(&self) -> f64 {
        self.phase.sample_rate()
    }

    fn reset(&mut self) {
        self.phase.reset();
    }
}

/// One phasor sample: the ramp and whether it wrapped on this sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhasorOutput {
    /// Phase in `[0, 1)` forward or `(0, 1]` backward.
    pub ramp: f32,
    /// `true` on the sample the ramp wrapped.
    pub wrapped: bool,
}

/// Phasor with a second, impulse-style wrap output.
///
/// The ramp goes to the kernel output buffer. Each wrap is also pushed to
/// the block's [`ControlEvents`] with value `1.0`, the kernel-level form of
/// the second outlet.
///
/// # Example
///
/// ```rust
/// use tilde_osc::Phasor;
///
/// let mut ph = Phasor::new(4.0);
/// ph.set_frequency(1.0);
/// let out: Vec<_> = (0..5).map(|_| ph.advance()).collect();
/// assert_eq!(out[1].ramp, 0.25);
/// assert!(out[4].wrapped);
/// ```
#[derive(Debug, Clone)]
pub struct Phasor {
    phase: PhaseAccumulator,
    frequency: f32,
    midi: bool,
}

impl Phasor {
    /// Create a phasor at 0 Hz starting from phase 0.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            phase: PhaseAccumulator::new(sample_rate, StepLimit::Full),
            frequency: 0.0,
            midi: false,
        }
    }

    /// Set the block-constant frequency (Hz, or note number in MIDI mode).
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Block-constant frequency input.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Interpret the frequency input as a MIDI note number.
    pub fn set_midi_mode(&mut self, midi: bool) {
        self.midi = midi;
    }

    /// Returns `true` in MIDI mode.
    pub fn midi_mode(&self) -> bool {
        self.midi
    }

    /// Set the phase absolutely.
    pub fn set_phase(&mut self, phase: f64) {
        self.phase.set_phase(phase);
    }

    /// Sync triggers flip direction instead of resetting phase.
    pub fn set_soft_sync(&mut self, soft: bool) {
        self.phase.set_soft_sync(soft);
    }

    #[inline]
    fn output(step: PhaseStep) -> PhasorOutput {
        PhasorOutput {
            ramp: step.phase as f32,
            wrapped: step.wrapped,
        }
    }

    #[inline]
    fn hz(&self, input: f64) -> f64 {
        if self.midi { midi_to_hz(input) } else { input }
    }

    /// Generate one sample at the stored frequency.
    #[inline]
    pub fn advance(&mut self) -> PhasorOutput {
        Self::output(self.phase.advance(self.hz(f64::from(self.frequency))))
    }

    /// Generate one sample from per-sample inputs.
    #[inline]
    pub fn process(&mut self, frequency: f64, offset: f64, trigger: f64) -> PhasorOutput {
        Self::output(self.phase.step(self.hz(frequency), offset, trigger))
    }
}

impl Kernel for Phasor {
    fn category(&self) -> KernelCategory {
        KernelCategory::Oscillator
    }

    fn input_names(&self) -> &'static [&'static str] {
        &["frequency", "sync", "phase"]
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], events: &mut ControlEvents) {
        let freq = self.frequency;
        for (n, out) in output.iter_mut().enumerate() {
            let frame = self.process(
                f64::from(input_at(inputs, 0, n, freq)),
                f64::from(input_at(inputs, 2, n, 0.0)),
                f64::from(input_at(inputs, 1, n, 0.0)),
            );
            if frame.wrapped {
                events.push(n, 1.0);
            }
            *out = frame.ramp;
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.phase.set_sample_rate(sample_rate);
    }

    fn sample_rate(&self) -> f64 {
        self.phase.sample_rate()
    }

    fn reset(&mut self) {
        self.phase.reset();
    }
}
