//! Core [`Kernel`] trait and the block-level input/output types.
//!
//! Every DSP kernel in tilde is driven the same way: once per audio block the
//! caller hands over one [`Signal`] per input, an output buffer, and a
//! [`ControlEvents`] list for control-rate messages produced mid-block.
//!
//! ## Design Decisions
//!
//! - **Mono output**: one `f32` output buffer per kernel. Kernels with a
//!   second outlet (the phasor's wrap impulse) report it through their typed
//!   API and as control events.
//!
//! - **Object-safe**: `dyn Kernel` works for runtime selection (the registry
//!   hands out `Box<dyn Kernel>`). Concrete types also expose typed per-sample
//!   methods for static dispatch.
//!
//! - **No allocations**: `process_block` never allocates. Events go into a
//!   fixed-capacity buffer.

use arrayvec::ArrayVec;

/// Maximum number of control events a single block can carry.
pub const MAX_BLOCK_EVENTS: usize = 256;

/// One input to a kernel for the duration of a block.
///
/// A `Scalar` is a block-constant control value (a float sent to an inlet).
/// An `Audio` signal supplies one value per sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal<'a> {
    /// Constant value for the whole block.
    Scalar(f32),
    /// Per-sample values.
    Audio(&'a [f32]),
}

impl Signal<'_> {
    /// Value at sample index `n`.
    ///
    /// A short audio slice holds its last sample; an empty slice reads `0.0`.
    #[inline]
    pub fn at(&self, n: usize) -> f32 {
        match *self {
            Signal::Scalar(v) => v,
            Signal::Audio(buf) => match buf.get(n) {
                Some(&v) => v,
                None => buf.last().copied().unwrap_or(0.0),
            },
        }
    }

    /// Returns `true` when this input carries per-sample data.
    pub fn is_audio(&self) -> bool {
        matches!(self, Signal::Audio(_))
    }
}

impl From<f32> for Signal<'_> {
    fn from(value: f32) -> Self {
        Signal::Scalar(value)
    }
}

impl<'a> From<&'a [f32]> for Signal<'a> {
    fn from(buf: &'a [f32]) -> Self {
        Signal::Audio(buf)
    }
}

/// Reads input `index` at sample `n`, falling back to `default` when the
/// caller supplied fewer inputs.
#[inline]
pub fn input_at(inputs: &[Signal<'_>], index: usize, n: usize, default: f32) -> f32 {
    inputs.get(index).map_or(default, |s| s.at(n))
}

/// A control-rate value emitted at a sample offset within a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlEvent {
    /// Sample index inside the block where the event happened.
    pub offset: usize,
    /// Event payload.
    pub value: f32,
}

/// Fixed-capacity list of [`ControlEvent`]s filled during `process_block`.
///
/// Events past [`MAX_BLOCK_EVENTS`] are counted in [`dropped`](Self::dropped)
/// rather than stored.
#[derive(Debug, Clone, Default)]
pub struct ControlEvents {
    events: ArrayVec<ControlEvent, MAX_BLOCK_EVENTS>,
    dropped: usize,
}

impl ControlEvents {
    /// Create an empty event list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Returns `false` if the buffer was full.
    #[inline]
    pub fn push(&mut self, offset: usize, value: f32) -> bool {
        if self.events.try_push(ControlEvent { offset, value }).is_ok() {
            true
        } else {
            self.dropped += 1;
            false
        }
    }

    /// Events recorded so far, in sample order.
    pub fn as_slice(&self) -> &[ControlEvent] {
        &self.events
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events were recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events that did not fit since the last [`clear`](Self::clear).
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Remove all events and reset the overflow counter.
    pub fn clear(&mut self) {
        self.events.clear();
        self.dropped = 0;
    }
}

/// Broad family a kernel belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelCategory {
    /// Phase-driven periodic generators.
    Oscillator,
    /// Signal processors with history (biquads, SVF, cascades).
    Filter,
    /// Random generators.
    Noise,
    /// Ramps, glides, and gated envelopes.
    Envelope,
}

impl KernelCategory {
    /// Human-readable name.
    pub const fn name(&self) -> &'static str {
        match self {
            KernelCategory::Oscillator => "Oscillator",
            KernelCategory::Filter => "Filter",
            KernelCategory::Noise => "Noise",
            KernelCategory::Envelope => "Envelope",
        }
    }
}

/// Core trait for all block-processing kernels.
///
/// # Example
///
/// ```rust
/// use tilde_core::{ControlEvents, Kernel, KernelCategory, Signal};
///
/// struct Gain {
///     sample_rate: f64,
/// }
///
/// impl Kernel for Gain {
///     fn category(&self) -> KernelCategory {
///         KernelCategory::Filter
///     }
///
///     fn input_names(&self) -> &'static [&'static str] {
///         &["signal", "gain"]
///     }
///
///     fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _: &mut ControlEvents) {
///         for (n, out) in output.iter_mut().enumerate() {
///             *out = tilde_core::input_at(inputs, 0, n, 0.0) * tilde_core::input_at(inputs, 1, n, 1.0);
///         }
///     }
///
///     fn set_sample_rate(&mut self, sample_rate: f64) {
///         self.sample_rate = sample_rate;
///     }
///
///     fn sample_rate(&self) -> f64 {
///         self.sample_rate
///     }
///
///     fn reset(&mut self) {}
/// }
/// ```
pub trait Kernel: Send {
    /// Family this kernel belongs to.
    fn category(&self) -> KernelCategory;

    /// Names of the inputs in the order `process_block` expects them.
    fn input_names(&self) -> &'static [&'static str];

    /// Process one block.
    ///
    /// Samples are produced in strict index order. Inputs beyond
    /// `inputs.len()` read as the kernel's defaults.
    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], events: &mut ControlEvents);

    /// Sample-rate change notification.
    ///
    /// Kernels recompute anything cached against the sample rate or Nyquist.
    fn set_sample_rate(&mut self, sample_rate: f64);

    /// Current sample rate in Hz.
    fn sample_rate(&self) -> f64;

    /// Reset internal state (phase, history, envelope level) without
    /// touching parameters.
    fn reset(&mut self);
}

impl<K: Kernel + ?Sized> Kernel for Box<K> {
    fn category(&self) -> KernelCategory {
        (**self).category()
    }

    fn input_names(&self) -> &'static [&'static str] {
        (**self).input_names()
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], events: &mut ControlEvents) {
        (**self).process_block(inputs, output, events);
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        (**self).set_sample_rate(sample_rate);
    }

    fn sample_rate(&self) -> f64 {
        (**self).sample_rate()
    }

    fn reset(&mut self) {
        (**self).reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_scalar() {
        let s = Signal::Scalar(3.0);
        assert_eq!(s.at(0), 3.0);
        assert_eq!(s.at(1000), 3.0);
        assert!(!s.is_audio());
    }

    #[test]
    fn test_signal_audio_holds_last() {
        let buf = [1.0, 2.0, 3.0];
        let s = Signal::from(&buf[..]);
        assert_eq!(s.at(1), 2.0);
        assert_eq!(s.at(7), 3.0);
        assert_eq!(Signal::Audio(&[]).at(0), 0.0);
    }

    #[test]
    fn test_input_at_default() {
        let inputs = [Signal::Scalar(1.0)];
        assert_eq!(input_at(&inputs, 0, 0, 9.0), 1.0);
        assert_eq!(input_at(&inputs, 3, 0, 9.0), 9.0);
    }

    #[test]
    fn test_events_overflow() {
        let mut events = ControlEvents::new();
        for i in 0..MAX_BLOCK_EVENTS {
            assert!(events.push(i, 1.0));
        }
        assert!(!events.push(0, 0.0));
        assert_eq!(events.len(), MAX_BLOCK_EVENTS);
        assert_eq!(events.dropped(), 1);

        events.clear();
        assert!(events.is_empty());
        assert_eq!(events.dropped(), 0);
    }
}
