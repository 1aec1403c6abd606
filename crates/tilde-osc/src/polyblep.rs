//! Band-limited oscillators using PolyBLEP and PolyBLAMP corrections.
//!
//! Each shape evaluates a naive waveform at the current phase and adds a
//! polynomial residual near every discontinuity: a BLEP for jumps in value
//! (saw, square) and a BLAMP for jumps in slope (triangle, variable saw).
//! The residual is one sample wide on each side of the edge.
//!
//! Reference: Kleimola, Lazzarini, Timoney and Välimäki, "Phaseshaping
//! Oscillator Algorithms for Musical Sound Synthesis", SMC 2010.

use tilde_core::{
    ControlEvents, Kernel, KernelCategory, PhaseAccumulator, PhaseStep, Signal, StepLimit, input_at, midi_to_hz,
    wrap_unit,
};

/// Narrowest pulse width accepted by the square and variable-saw shapes.
pub const MIN_PULSE_WIDTH: f64 = 0.0001;
/// Widest pulse width accepted by the square and variable-saw shapes.
pub const MAX_PULSE_WIDTH: f64 = 0.9999;

/// Waveforms produced by [`BlepOscillator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlepShape {
    /// Falling sawtooth, `1 - 2p` with a BLEP at the wrap.
    #[default]
    Saw,
    /// Bipolar pulse with a BLEP at both edges.
    Square,
    /// Triangle starting at 0 and rising, BLAMP corrected at both corners.
    Triangle,
    /// Triangle-to-saw morph controlled by pulse width.
    VariableSaw,
}

impl BlepShape {
    /// Returns `true` if pulse width changes the waveform.
    pub fn uses_pulse_width(self) -> bool {
        matches!(self, BlepShape::Square | BlepShape::VariableSaw)
    }

    /// Short lowercase name, as used in creation arguments.
    pub fn name(self) -> &'static str {
        match self {
            BlepShape::Saw => "saw",
            BlepShape::Square => "square",
            BlepShape::Triangle => "tri",
            BlepShape::VariableSaw => "vsaw",
        }
    }

    /// Parse a shape from its [`name`](Self::name).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "saw" => Some(BlepShape::Saw),
            "square" => Some(BlepShape::Square),
            "tri" => Some(BlepShape::Triangle),
            "vsaw" => Some(BlepShape::VariableSaw),
            _ => None,
        }
    }
}

/// Two-sided polynomial band-limited step residual.
///
/// `p` is the distance past the discontinuity in cycles, `dt` the per-sample
/// phase increment. Zero outside one sample of the edge, and zero
/// everywhere when `dt` is not positive.
#[inline]
pub fn poly_blep(p: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    if p < dt {
        let t = p / dt - 1.0;
        -(t * t)
    } else if p > 1.0 - dt {
        let t = (p - 1.0) / dt + 1.0;
        t * t
    } else {
        0.0
    }
}

/// Integrated [`poly_blep`]: the residual for a corner (slope discontinuity).
#[inline]
pub fn poly_blamp(p: f64, dt: f64) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }
    if p < dt {
        let t = p / dt - 1.0;
        -1.0 / 3.0 * t * t * t
    } else if p > 1.0 - dt {
        let t = (p - 1.0) / dt + 1.0;
        1.0 / 3.0 * t * t * t
    } else {
        0.0
    }
}

/// Evaluate `shape` at phase `p` in `[0, 1)` with correction width `dt`.
///
/// `pulse_width` must already be clamped to
/// [`MIN_PULSE_WIDTH`]..=[`MAX_PULSE_WIDTH`].
#[inline]
pub fn render(shape: BlepShape, p: f64, dt: f64, pulse_width: f64) -> f64 {
    match shape {
        BlepShape::Saw => 1.0 - 2.0 * p + poly_blep(p, dt),
        BlepShape::Square => {
            let naive = if p < pulse_width { 1.0 } else { -1.0 };
            // falling edge sits at p == pulse_width
            naive + poly_blep(p, dt) - poly_blep(wrap_unit(p + 1.0 - pulse_width), dt)
        }
        BlepShape::Triangle => {
            let mut y = p * 2.0;
            if y >= 1.5 {
                y = (y - 2.0) * 2.0;
            } else if y >= 0.5 {
                y = 1.0 - (y - 0.5) * 2.0;
            } else {
                y *= 2.0;
            }
            y + dt * 4.0 * (poly_blamp(wrap_unit(p + 0.25), dt) - poly_blamp(wrap_unit(p + 1.0 - 0.25), dt))
        }
        BlepShape::VariableSaw => {
            let pw = pulse_width;
            let t1 = wrap_unit(p + 0.5 * pw);
            let t2 = wrap_unit(p + 1.0 - 0.5 * pw);
            let mut y = p * 2.0;
            if y >= 2.0 - pw {
                y = (y - 2.0) / pw;
            } else if y >= pw {
                y = 1.0 - (y - pw) / (1.0 - pw);
            } else {
                y /= pw;
            }
            y + dt / (pw - pw * pw) * (poly_blamp(t1, dt) - poly_blamp(t2, dt))
        }
    }
}

/// Clamp a pulse width into the legal range. NaN maps to 0.5.
#[inline]
pub fn clamp_pulse_width(pulse_width: f64) -> f64 {
    if pulse_width.is_nan() {
        0.5
    } else {
        pulse_width.clamp(MIN_PULSE_WIDTH, MAX_PULSE_WIDTH)
    }
}

/// Alias-reduced saw, square, triangle and variable-saw oscillator.
///
/// Phase comes from a [`PhaseAccumulator`] with the full `±1` step clamp, so
/// the oscillator supports negative frequencies, phase-offset modulation,
/// hard sync and soft sync. In MIDI mode the frequency input is a note
/// number.
///
/// # Example
///
/// ```rust
/// use tilde_osc::{BlepOscillator, BlepShape};
///
/// let mut osc = BlepOscillator::new(48000.0, BlepShape::Square);
/// osc.set_frequency(220.0);
/// osc.set_pulse_width(0.25);
/// let block: Vec<f32> = (0..64).map(|_| osc.advance()).collect();
/// assert!(block.iter().all(|y| y.abs() <= 1.0));
/// ```
#[derive(Debug, Clone)]
pub struct BlepOscillator {
    shape: BlepShape,
    phase: PhaseAccumulator,
    frequency: f32,
    pulse_width: f32,
    midi: bool,
}

impl BlepOscillator {
    /// Create an oscillator at 0 Hz with a pulse width of 0.5.
    pub fn new(sample_rate: f64, shape: BlepShape) -> Self {
        Self {
            shape,
            phase: PhaseAccumulator::new(sample_rate, StepLimit::Full),
            frequency: 0.0,
            pulse_width: 0.5,
            midi: false,
        }
    }

    /// Change the waveform. Phase is kept.
    pub fn set_shape(&mut self, shape: BlepShape) {
        self.shape = shape;
    }

    /// Current waveform.
    pub fn shape(&self) -> BlepShape {
        self.shape
    }

    /// Set the block-constant frequency (Hz, or note number in MIDI mode).
    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency;
    }

    /// Block-constant frequency input.
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    /// Set the block-constant pulse width (square and variable saw only).
    pub fn set_pulse_width(&mut self, pulse_width: f32) {
        self.pulse_width = pulse_width;
    }

    /// Block-constant pulse width input.
    pub fn pulse_width(&self) -> f32 {
        self.pulse_width
    }

    /// Interpret the frequency input as a MIDI note number.
    pub fn set_midi_mode(&mut self, midi: bool) {
        self.midi = midi;
    }

    /// Returns `true` in MIDI mode.
    pub fn midi_mode(&self) -> bool {
        self.midi
    }

    /// Sync triggers flip direction instead of resetting phase.
    pub fn set_soft_sync(&mut self, soft: bool) {
        self.phase.set_soft_sync(soft);
    }

    /// Returns `true` in soft-sync mode.
    pub fn soft_sync(&self) -> bool {
        self.phase.soft_sync()
    }

    /// Set the phase absolutely.
    pub fn set_phase(&mut self, phase: f64) {
        self.phase.set_phase(phase);
    }

    /// Underlying phase accumulator.
    pub fn accumulator(&self) -> &PhaseAccumulator {
        &self.phase
    }

    #[inline]
    fn hz(&self, input: f64) -> f64 {
        if self.midi { midi_to_hz(input) } else { input }
    }

    #[inline]
    fn shape_step(&self, step: PhaseStep, pulse_width: f64) -> f32 {
        let p = wrap_unit(step.phase);
        // residual windows on either side of an edge must not overlap
        let dt = step.increment.abs().min(0.5);
        render(self.shape, p, dt, clamp_pulse_width(pulse_width)) as f32
    }

    /// Generate one sample from the stored frequency and pulse width.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        let step = self.phase.advance(self.hz(f64::from(self.frequency)));
        self.shape_step(step, f64::from(self.pulse_width))
    }

    /// Generate one sample from per-sample inputs.
    ///
    /// # Arguments
    ///
    /// * `frequency` - Hz, or a note number in MIDI mode
    /// * `pulse_width` - Duty cycle, clamped to `[0.0001, 0.9999]`
    /// * `offset` - Phase-offset input in cycles
    /// * `trigger` - Sync input
    #[inline]
    pub fn process(&mut self, frequency: f64, pulse_width: f64, offset: f64, trigger: f64) -> f32 {
        let step = self.phase.step(self.hz(frequency), offset, trigger);
        self.shape_step(step, pulse_width)
    }
}

impl Kernel for BlepOscillator {
    fn category(&self) -> KernelCategory {
        KernelCategory::Oscillator
    }

    fn input_names(&self) -> &'static [&'static str] {
        &["frequency", "width", "sync", "phase"]
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        let (freq, width) = (self.frequency, self.pulse_width);
        for (n, out) in output.iter_mut().enumerate() {
            *out = self.process(
                f64::from(input_at(inputs, 0, n, freq)),
                f64::from(input_at(inputs, 1, n, width)),
                f64::from(input_at(inputs, 3, n, 0.0)),
                f64::from(input_at(inputs, 2, n, 0.0)),
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

#[cfg(test)]
mod tests {
    use super::*;

    fn run(osc: &mut BlepOscillator, n: usize) -> Vec<f32> {
        (0..n).map(|_| osc.advance()).collect()
    }

    #[test]
    fn test_blep_is_zero_away_from_edges() {
        assert_eq!(poly_blep(0.5, 0.01), 0.0);
        assert_eq!(poly_blamp(0.5, 0.01), 0.0);
        assert_eq!(poly_blep(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_blep_edge_values() {
        // right at the edge the residual cancels half the jump
        assert_eq!(poly_blep(0.0, 0.1), -1.0);
        assert!((poly_blep(0.999_999, 0.1) - 1.0).abs() < 1e-4);
        assert!((poly_blamp(0.0, 0.1) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_saw_at_zero_hz_is_dc() {
        let mut osc = BlepOscillator::new(48000.0, BlepShape::Saw);
        let out = run(&mut osc, 32);
        assert!(out.iter().all(|&y| y == out[0]));
        assert_eq!(out[0], 1.0);
    }

    #[test]
    fn test_saw_falls_and_wraps() {
        let mut osc = BlepOscillator::new(8.0, BlepShape::Saw);
        osc.set_frequency(1.0);
        let out = run(&mut osc, 9);
        // dt = 1/8: corrections only touch the first and last sample of a cycle
        assert!((out[4] - 0.0).abs() < 1e-6);
        assert!(out[2] > out[3] && out[3] > out[4]);
        assert_eq!(out[0], out[8]);
    }

    #[test]
    fn test_square_duty_cycle() {
        let mut osc = BlepOscillator::new(48000.0, BlepShape::Square);
        osc.set_frequency(100.0);
        osc.set_pulse_width(0.25);
        let out = run(&mut osc, 4800);
        let mean: f32 = out.iter().sum::<f32>() / out.len() as f32;
        // 25% high, 75% low
        assert!((mean - (-0.5)).abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn test_pulse_width_is_clamped() {
        let mut osc = BlepOscillator::new(48000.0, BlepShape::Square);
        osc.set_frequency(100.0);
        osc.set_pulse_width(0.0);
        let out = run(&mut osc, 4800);
        assert!(out.iter().all(|y| y.is_finite()));
        assert!(out.iter().any(|&y| y < 0.0));
    }

    #[test]
    fn test_triangle_is_continuous() {
        let mut osc = BlepOscillator::new(48000.0, BlepShape::Triangle);
        osc.set_frequency(1000.0);
        let out = run(&mut osc, 480);
        let dt = 1000.0 / 48000.0;
        for w in out.windows(2) {
            assert!((w[1] - w[0]).abs() < 5.0 * dt as f32, "step {}", w[1] - w[0]);
        }
    }

    #[test]
    fn test_vsaw_at_half_width_is_triangle() {
        let mut tri = BlepOscillator::new(48000.0, BlepShape::Triangle);
        let mut vsaw = BlepOscillator::new(48000.0, BlepShape::VariableSaw);
        tri.set_frequency(777.0);
        vsaw.set_frequency(777.0);
        vsaw.set_pulse_width(0.5);
        for _ in 0..1000 {
            assert!((tri.advance() - vsaw.advance()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_midi_mode_matches_hz() {
        let mut midi = BlepOscillator::new(48000.0, BlepShape::Saw);
        midi.set_midi_mode(true);
        midi.set_frequency(69.0);
        let mut hz = BlepOscillator::new(48000.0, BlepShape::Saw);
        hz.set_frequency(440.0);
        for _ in 0..256 {
            assert_eq!(midi.advance(), hz.advance());
        }
    }

    #[test]
    fn test_hard_sync_sets_phase() {
        let mut osc = BlepOscillator::new(48000.0, BlepShape::Saw);
        for _ in 0..10 {
            osc.process(100.0, 0.5, 0.0, 0.0);
        }
        let y = osc.process(100.0, 0.5, 0.0, 0.25);
        assert!((y - 0.5).abs() < 1e-6, "saw at 0.25 is 0.5, got {y}");
    }

    #[test]
    fn test_soft_sync_reverses_slope() {
        let mut osc = BlepOscillator::new(48000.0, BlepShape::Saw);
        osc.set_soft_sync(true);
        for _ in 0..10 {
            osc.process(100.0, 0.5, 0.0, 0.0);
        }
        let a = osc.process(100.0, 0.5, 0.0, 0.0);
        let b = osc.process(100.0, 0.5, 0.0, 0.0);
        assert!(b < a, "forward saw falls");
        osc.process(100.0, 0.5, 0.0, 1.0);
        let c = osc.process(100.0, 0.5, 0.0, 0.0);
        let d = osc.process(100.0, 0.5, 0.0, 0.0);
        assert!(d > c, "reversed saw rises");
    }

    #[test]
    fn test_negative_frequency_stays_bounded() {
        let mut osc = BlepOscillator::new(48000.0, BlepShape::Square);
        osc.set_frequency(-3000.0);
        for y in run(&mut osc, 2000) {
            assert!(y.is_finite() && y.abs() <= 1.01, "{y}");
        }
    }

    #[test]
    fn test_shape_names_round_trip() {
        for shape in [BlepShape::Saw, BlepShape::Square, BlepShape::Triangle, BlepShape::VariableSaw] {
            assert_eq!(BlepShape::from_name(shape.name()), Some(shape));
        }
        assert_eq!(BlepShape::from_name("sine"), None);
    }
}
