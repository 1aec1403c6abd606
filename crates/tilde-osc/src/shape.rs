//! Phase-shaped oscillators: sine, triangle, parabolic and gaussian.
//!
//! These shapes have no discontinuity in value, so no band-limiting residual
//! is applied. The phase step is clamped to Nyquist (`±0.5` cycles per
//! sample) instead.

use core::f64::consts::TAU;
use libm::{exp, fmod, sin};

use tilde_core::{ControlEvents, Kernel, KernelCategory, PhaseAccumulator, Signal, StepLimit, input_at};

/// Waveforms produced by [`ShapeOscillator`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Waveshape {
    /// `sin(2πp)`.
    #[default]
    Sine,
    /// Triangle starting at 0 and rising to 1 at a quarter cycle.
    Triangle,
    /// Piecewise parabola approximating a sine.
    Parabolic,
    /// Gaussian pulse centred on half a cycle. The width is in `[0, 1]`
    /// nominally; larger values narrow the pulse further.
    Gaussian(f32),
}

/// Evaluate a unit-phase shape at `p`.
///
/// `p` may be `1.0` (backward travel); every shape treats it like `0.0`
/// within rounding.
#[inline]
pub fn shape_at(shape: Waveshape, p: f64) -> f64 {
    match shape {
        Waveshape::Sine => sin(TAU * p),
        Waveshape::Triangle => {
            let y = p * 4.0;
            if y >= 3.0 {
                y - 4.0
            } else if y >= 1.0 {
                2.0 - y
            } else {
                y
            }
        }
        Waveshape::Parabolic => {
            let x = fmod(p * 2.0, 1.0) * 2.0 - 1.0;
            let y = 1.0 - x * x;
            if p <= 0.5 { y } else { -y }
        }
        Waveshape::Gaussian(width) => {
            let width = f64::from(width);
            let width = if width > 0.0 { width } else { 0.0 };
            let w = width * width * width * width * 294.0 + 6.0;
            let x = (p - 0.5) * w;
            exp(-0.5 * x * x)
        }
    }
}

/// Sine, triangle, parabolic or gaussian oscillator.
///
/// Supports phase-offset modulation and hard or soft sync through its
/// [`PhaseAccumulator`]. The gaussian width can be driven per sample from the
/// kernel's fourth input.
///
/// # Example
///
/// ```rust
/// use tilde_osc::{ShapeOscillator, Waveshape};
///
/// let mut osc = ShapeOscillator::new(48000.0, Waveshape::Sine);
/// osc.set_frequency(12000.0);
/// let y: Vec<f32> = (0..4).map(|_| osc.advance()).collect();
/// assert!((y[1] - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct ShapeOscillator {
    shape: Waveshape,
    phase: PhaseAccumulator,
    frequency: f32,
}

impl ShapeOscillator {
    /// Create an oscillator at 0 Hz.
    pub fn new(sample_rate: f64, shape: Waveshape) -> Self {
        Self {
            shape,
            phase: PhaseAccumulator::new(sample_rate, StepLimit::Nyquist),
            frequency: 0.0,
        }
    }

    /// Change the waveform.
    pub fn set_shape(&mut self, shape: Waveshape) {
        self.shape = shape;
    }

    /// Current waveform.
    pub fn shape(&self) -> Waveshape {
        self.shape
    }

    /// Set the gaussian width. Ignored by other shapes.
    pub fn set_width(&mut self, width: f32) {
        if let Waveshape::Gaussian(w) = &mut self.shape {
            *w = width;
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

    /// Sync triggers flip direction instead of resetting phase.
    pub fn set_soft_sync(&mut self, soft: bool) {
        self.phase.set_soft_sync(soft);
    }

    /// Set the phase absolutely.
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
        let step = self.phase.advance(f64::from(self.frequency));
        shape_at(self.shape, step.phase) as f32
    }

    /// Generate one sample from per-sample inputs.
    #[inline]
    pub fn process(&mut self, frequency: f64, offset: f64, trigger: f64) -> f32 {
        let step = self.phase.step(frequency, offset, trigger);
        shape_at(self.shape, step.phase) as f32
    }
}

impl Kernel for ShapeOscillator {
    fn category(&self) -> KernelCategory {
        KernelCategory::Oscillator
    }

    fn input_names(&self) -> &'static [&'static str] {
        match self.shape {
            Waveshape::Gaussian(_) => &["frequency", "sync", "phase", "width"],
            _ => &["frequency", "sync", "phase"],
        }
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        let freq = self.frequency;
        let gaussian = match self.shape {
            Waveshape::Gaussian(w) => Some(w),
            _ => None,
        };
        for (n, out) in output.iter_mut().enumerate() {
            if let Some(width) = gaussian {
                self.shape = Waveshape::Gaussian(input_at(inputs, 3, n, width));
            }
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
