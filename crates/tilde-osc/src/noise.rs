//! Random generators: white noise, interpolated random and random pulses.
//!
//! Each generator owns its own [`XorShift`] and remembers its seed, so
//! [`reset`](Kernel::reset) replays the same sequence. Default seeds come
//! from a [`SeedSource`](tilde_core::SeedSource) held by whoever constructs
//! the generators.

use tilde_core::{ControlEvents, Kernel, KernelCategory, PhaseAccumulator, Signal, StepLimit, XorShift, input_at};

/// Uniform white noise in `[-1, 1)`.
///
/// # Example
///
/// ```rust
/// use tilde_osc::WhiteNoise;
///
/// let mut a = WhiteNoise::new(48000.0, 7);
/// let mut b = WhiteNoise::new(48000.0, 7);
/// assert_eq!(a.next_sample(), b.next_sample());
/// ```
#[derive(Debug, Clone)]
pub struct WhiteNoise {
    rng: XorShift,
    seed: u32,
    sample_rate: f64,
}

impl WhiteNoise {
    /// Create a generator with the given seed.
    pub fn new(sample_rate: f64, seed: u32) -> Self {
        Self {
            rng: XorShift::new(seed),
            seed,
            sample_rate,
        }
    }

    /// Restart the sequence from `seed`.
    pub fn set_seed(&mut self, seed: u32) {
        self.seed = seed;
        self.rng.set_seed(seed);
    }

    /// Seed the current sequence started from.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Next sample.
    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        self.rng.next_f32()
    }
}

impl Kernel for WhiteNoise {
    fn category(&self) -> KernelCategory {
        KernelCategory::Noise
    }

    fn input_names(&self) -> &'static [&'static str] {
        &[]
    }

    fn process_block(&mut self, _inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        for out in output.iter_mut() {
            *out = self.rng.next_f32();
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn reset(&mut self) {
        self.rng.set_seed(self.seed);
    }
}

/// How [`RandomInterp`] moves between random targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Hold each value for a full period (sample and hold).
    Step,
    /// Straight line from the current value to the next.
    #[default]
    Linear,
}

/// A random segment source: the current value, the next one, and a phase
/// that draws a new value at every wrap.
#[derive(Debug, Clone)]
struct RandomRamp {
    rng: XorShift,
    seed: u32,
    phase: PhaseAccumulator,
    current: f32,
    next: f32,
}

impl RandomRamp {
    fn new(sample_rate: f64, seed: u32) -> Self {
        let mut ramp = Self {
            rng: XorShift::new(seed),
            seed,
            // primed so the first sample draws a fresh target
            phase: PhaseAccumulator::new(sample_rate, StepLimit::Full).with_phase(0.0),
            current: 0.0,
            next: 0.0,
        };
        ramp.reseed(seed);
        ramp
    }

    fn reseed(&mut self, seed: u32) {
        self.seed = seed;
        self.rng.set_seed(seed);
        self.current = self.rng.next_f32();
        self.next = self.rng.next_f32();
        self.phase.reset();
    }

    /// Advance one sample, returning the fraction of the way from `current`
    /// to `next`.
    #[inline]
    fn tick(&mut self, hz: f64) -> f32 {
        let step = self.phase.advance(hz);
        if step.wrapped {
            self.current = self.next;
            self.next = self.rng.next_f32();
        }
        let frac = if step.increment >= 0.0 { step.phase } else { 1.0 - step.phase };
        frac as f32
    }

    #[inline]
    fn linear(&self, frac: f32) -> f32 {
        self.current + (self.next - self.current) * frac
    }
}

/// Low-frequency random signal: a new random target every period, held or
/// linearly interpolated. Negative frequencies run the interpolation
/// backwards.
///
/// # Example
///
/// ```rust
/// use tilde_osc::{Interpolation, RandomInterp};
///
/// let mut lfo = RandomInterp::new(48000.0, 3, Interpolation::Step);
/// lfo.set_frequency(10.0);
/// let first = lfo.advance();
/// assert_eq!(lfo.advance(), first);
/// ```
#[derive(Debug, Clone)]
pub struct RandomInterp {
    ramp: RandomRamp,
    mode: Interpolation,
    frequency: f32,
}

impl RandomInterp {
    /// Create a generator at 0 Hz.
    pub fn new(sample_rate: f64, seed: u32, mode: Interpolation) -> Self {
        Self {
            ramp: RandomRamp::new(sample_rate, seed),
            mode,
            frequency: 0.0,
        }
    }

    /// Restart the sequence from `seed`.
    pub fn set_seed(&mut self, seed: u32) {
        self.ramp.reseed(seed);
    }

    /// Seed the current sequence started from.
    pub fn seed(&self) -> u32 {
        self.ramp.seed
    }

    /// Switch between held and interpolated output.
    pub fn set_interpolation(&mut self, mode: Interpolation) {
        self.mode = mode;
    }

    /// Current interpolation mode.
    pub fn interpolation(&self) -> Interpolation {
        self.mode
    }

    /// Set the block-constant rate in Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Block-constant rate input.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Generate one sample at the stored rate.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.process(f64::from(self.frequency))
    }

    /// Generate one sample at rate `hz`.
    #[inline]
    pub fn process(&mut self, hz: f64) -> f32 {
        let frac = self.ramp.tick(hz);
        match self.mode {
            Interpolation::Step => self.ramp.current,
            Interpolation::Linear => self.ramp.linear(frac),
        }
    }
}

impl Kernel for RandomInterp {
    fn category(&self) -> KernelCategory {
        KernelCategory::Noise
    }

    fn input_names(&self) -> &'static [&'static str] {
        &["frequency"]
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        let freq = self.frequency;
        for (n, out) in output.iter_mut().enumerate() {
            *out = self.process(f64::from(input_at(inputs, 0, n, freq)));
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.ramp.phase.set_sample_rate(sample_rate);
    }

    fn sample_rate(&self) -> f64 {
        self.ramp.phase.sample_rate()
    }

    fn reset(&mut self) {
        self.ramp.reseed(self.ramp.seed);
    }
}

/// Random gate: follows an interpolated random signal and opens when it
/// turns positive, closes when it turns negative.
///
/// An open gate outputs `1.0`, or a random amplitude in `[-1, 1)` drawn at
/// the opening when random mode is on.
#[derive(Debug, Clone)]
pub struct RandomPulse {
    ramp: RandomRamp,
    random_amplitude: bool,
    frequency: f32,
    output: f32,
}

impl RandomPulse {
    /// Create a generator at 0 Hz with fixed amplitude.
    pub fn new(sample_rate: f64, seed: u32) -> Self {
        Self {
            ramp: RandomRamp::new(sample_rate, seed),
            random_amplitude: false,
            frequency: 0.0,
            output: 0.0,
        }
    }

    /// Restart the sequence from `seed` with the gate closed.
    pub fn set_seed(&mut self, seed: u32) {
        self.output = 0.0;
        self.ramp.reseed(seed);
    }

    /// Seed the current sequence started from.
    pub fn seed(&self) -> u32 {
        self.ramp.seed
    }

    /// Draw a random amplitude at each opening instead of `1.0`.
    pub fn set_random_amplitude(&mut self, random: bool) {
        self.random_amplitude = random;
    }

    /// Returns `true` in random-amplitude mode.
    pub fn random_amplitude(&self) -> bool {
        self.random_amplitude
    }

    /// Set the block-constant rate in Hz.
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Block-constant rate input.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Generate one sample at the stored rate.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.process(f64::from(self.frequency))
    }

    /// Generate one sample at rate `hz`.
    #[inline]
    pub fn process(&mut self, hz: f64) -> f32 {
        let frac = self.ramp.tick(hz);
        let level = self.ramp.linear(frac);
        if level > 0.0 && self.output == 0.0 {
            self.output = if self.random_amplitude { self.ramp.rng.next_f32() } else { 1.0 };
        } else if level < 0.0 {
            self.output = 0.0;
        }
        self.output
    }
}

impl Kernel for RandomPulse {
    fn category(&self) -> KernelCategory {
        KernelCategory::Noise
    }

    fn input_names(&self) -> &'static [&'static str] {
        &["frequency"]
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        let freq = self.frequency;
        for (n, out) in output.iter_mut().enumerate() {
            *out = self.process(f64::from(input_at(inputs, 0, n, freq)));
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.ramp.phase.set_sample_rate(sample_rate);
    }

    fn sample_rate(&self) -> f64 {
        self.ramp.phase.sample_rate()
    }

    fn reset(&mut self) {
        self.set_seed(self.ramp.seed);
    }
}
