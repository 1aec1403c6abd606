//! Multi-stage biquad processor driven by an external coefficient list.
//!
//! Stage storage is fixed at [`MAX_STAGES`], sized at construction, so
//! loading a new list never allocates.

use arrayvec::ArrayVec;

use crate::biquad::{BiquadCoeffs, BiquadState};
use crate::kernel::{ControlEvents, Kernel, KernelCategory, Signal, input_at};

/// Maximum number of sections in a [`BiquadCascade`].
pub const MAX_STAGES: usize = 16;

/// Serial chain of biquad sections.
///
/// Each stage's output feeds the next within the same sample; every stage
/// keeps its own history.
///
/// # Example
///
/// ```rust
/// use tilde_core::BiquadCascade;
///
/// let mut cascade = BiquadCascade::new(48000.0);
/// // Two pass-through stages, each given as (b1, b2, a0, a1, a2)
/// let loaded = cascade.set_coefficients(&[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.0, 0.0]);
/// assert_eq!(loaded, 2);
/// assert_eq!(cascade.process(1.0), 0.5);
/// ```
#[derive(Debug, Clone)]
pub struct BiquadCascade {
    stages: ArrayVec<(BiquadCoeffs, BiquadState), MAX_STAGES>,
    sample_rate: f64,
    bypass: bool,
}

impl Default for BiquadCascade {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl BiquadCascade {
    /// Empty cascade (passes input through until coefficients are loaded).
    pub fn new(sample_rate: f64) -> Self {
        Self {
            stages: ArrayVec::new(),
            sample_rate,
            bypass: false,
        }
    }

    /// Load a flat list of `(b1, b2, a0, a1, a2)` quintuples.
    ///
    /// A trailing partial quintuple and anything past [`MAX_STAGES`] are
    /// ignored. Stages that already existed keep their history; new ones
    /// start cleared. Returns the number of stages now active.
    pub fn set_coefficients(&mut self, list: &[f64]) -> usize {
        let complete = list.len() / 5;
        let used = complete.min(MAX_STAGES);

        #[cfg(feature = "tracing")]
        {
            if list.len() % 5 != 0 {
                tracing::warn!(len = list.len(), "coefficient list is not a multiple of 5, trailing values ignored");
            }
            if complete > MAX_STAGES {
                tracing::warn!(stages = complete, max = MAX_STAGES, "too many biquad stages, extra stages ignored");
            }
        }

        let previous = self.stages.len();
        self.stages.truncate(used);
        for (i, chunk) in list.chunks_exact(5).take(used).enumerate() {
            let coeffs = BiquadCoeffs::from_quintuple([chunk[0], chunk[1], chunk[2], chunk[3], chunk[4]]);
            if i < previous.min(used) {
                self.stages[i].0 = coeffs;
            } else {
                self.stages.push((coeffs, BiquadState::new()));
            }
        }
        self.stages.len()
    }

    /// Number of active stages.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Coefficients of stage `index`.
    pub fn stage(&self, index: usize) -> Option<&BiquadCoeffs> {
        self.stages.get(index).map(|(c, _)| c)
    }

    /// When set, input is copied to output and history freezes.
    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    /// Returns `true` when bypassed.
    pub fn bypass(&self) -> bool {
        self.bypass
    }

    /// Zero every stage's history.
    pub fn clear(&mut self) {
        for (_, state) in &mut self.stages {
            state.clear();
        }
    }

    /// Process one sample through every stage in order.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        if self.bypass {
            return input;
        }
        let mut x = f64::from(input);
        for (coeffs, state) in &mut self.stages {
            x = state.process(coeffs, x);
        }
        x as f32
    }
}

impl Kernel for BiquadCascade {
    fn category(&self) -> KernelCategory {
        KernelCategory::Filter
    }

    fn input_names(&self) -> &'static [&'static str] {
        &["signal"]
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        for (n, out) in output.iter_mut().enumerate() {
            *out = self.process(input_at(inputs, 0, n, 0.0));
        }
        for (_, state) in &mut self.stages {
            state.flush_denormals();
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        // Coefficients come from outside, nothing to redesign
        self.sample_rate = sample_rate;
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
    use crate::biquad::lowpass_coefficients;

    fn quintuple(c: &BiquadCoeffs) -> [f64; 5] {
        [c.b1, c.b2, c.a0, c.a1, c.a2]
    }

    #[test]
    fn test_empty_passes_through() {
        let mut cascade = BiquadCascade::new(48000.0);
        assert_eq!(cascade.process(0.42), 0.42);
    }

    #[test]
    fn test_matches_manual_chain() {
        let c1 = lowpass_coefficients(500.0, 0.707, 24000.0);
        let c2 = lowpass_coefficients(2000.0, 2.0, 24000.0);
        let mut list = quintuple(&c1).to_vec();
        list.extend_from_slice(&quintuple(&c2));

        let mut cascade = BiquadCascade::new(48000.0);
        assert_eq!(cascade.set_coefficients(&list), 2);

        let (mut s1, mut s2) = (BiquadState::new(), BiquadState::new());
        for n in 0..64 {
            let x = if n == 0 { 1.0 } else { 0.0 };
            let expected = s2.process(&c2, s1.process(&c1, f64::from(x))) as f32;
            assert_eq!(cascade.process(x), expected);
        }
    }

    #[test]
    fn test_partial_and_excess_stages_ignored() {
        let mut cascade = BiquadCascade::new(48000.0);
        assert_eq!(cascade.set_coefficients(&[0.0, 0.0, 1.0, 0.0, 0.0, 0.3, 0.1]), 1);

        let many = vec![0.0; 5 * (MAX_STAGES + 3)];
        assert_eq!(cascade.set_coefficients(&many), MAX_STAGES);
        assert_eq!(cascade.set_coefficients(&[]), 0);
    }

    #[test]
    fn test_bypass_and_clear() {
        let mut cascade = BiquadCascade::new(48000.0);
        cascade.set_coefficients(&quintuple(&lowpass_coefficients(300.0, 1.0, 24000.0)));
        cascade.process(1.0);
        cascade.set_bypass(true);
        assert_eq!(cascade.process(0.7), 0.7);
        cascade.set_bypass(false);
        cascade.clear();
        let fresh = {
            let mut c = BiquadCascade::new(48000.0);
            c.set_coefficients(&quintuple(&lowpass_coefficients(300.0, 1.0, 24000.0)));
            c.process(0.7)
        };
        assert_eq!(cascade.process(0.7), fresh);
    }
}
