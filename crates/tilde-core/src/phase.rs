//! Shared phase-tracking state for every periodic generator.
//!
//! A [`PhaseAccumulator`] advances a running phase once per sample from a
//! frequency in Hz, folds in incremental phase-offset modulation, and handles
//! hard or soft sync triggers.
//!
//! # Wrap convention
//!
//! The direction of travel decides where the wrap happens:
//!
//! - Positive step: the phase wraps when it reaches 1 and lives in `[0, 1)`.
//! - Negative step: the phase wraps when it reaches 0 and lives in `(0, 1]`.
//!
//! Each [`step`](PhaseAccumulator::step) reports the phase for the current
//! sample together with a `wrapped` flag, then advances by one increment.
//! Impulse-style generators use the flag directly.
//!
//! # Sync edge
//!
//! A trigger rising from `<= 0` to `t` in `(0, 1]` sets the phase to `t`. The
//! value `t == 1` lands exactly on the wrap point, so the phase reads 0 on
//! that sample and `wrapped` is reported.

use libm::{ceil, fmod};

use crate::math::{reduce_deviation, wrap_unit};

/// Largest per-sample phase increment a generator allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepLimit {
    /// ±0.5 cycles per sample. Used by shaped oscillators that must stay
    /// below Nyquist.
    #[default]
    Nyquist,
    /// ±1 cycle per sample. Used by impulse and random generators.
    Full,
}

impl StepLimit {
    /// Maximum magnitude of the phase increment.
    #[inline]
    pub const fn max_step(self) -> f64 {
        match self {
            StepLimit::Nyquist => 0.5,
            StepLimit::Full => 1.0,
        }
    }
}

/// Result of advancing the accumulator by one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStep {
    /// Phase for this sample.
    pub phase: f64,
    /// `true` when the phase crossed the wrap point on this sample.
    pub wrapped: bool,
    /// Signed increment applied after this sample (cycles per sample).
    pub increment: f64,
}

/// Running phase with offset modulation and sync.
///
/// # Example
///
/// ```rust
/// use tilde_core::{PhaseAccumulator, StepLimit};
///
/// let mut acc = PhaseAccumulator::new(8.0, StepLimit::Nyquist);
/// let phases: Vec<f64> = (0..4).map(|_| acc.advance(2.0).phase).collect();
/// assert_eq!(phases, vec![0.0, 0.25, 0.5, 0.75]);
/// ```
#[derive(Debug, Clone)]
pub struct PhaseAccumulator {
    phase: f64,
    initial_phase: f64,
    last_offset: f64,
    last_trigger: f64,
    sample_rate: f64,
    limit: StepLimit,
    sync_enabled: bool,
    soft_sync: bool,
    direction: f64,
    forward: bool,
}

impl Default for PhaseAccumulator {
    fn default() -> Self {
        Self::new(48000.0, StepLimit::Nyquist)
    }
}

impl PhaseAccumulator {
    /// Create an accumulator at phase 0.
    pub fn new(sample_rate: f64, limit: StepLimit) -> Self {
        Self {
            phase: 0.0,
            initial_phase: 0.0,
            last_offset: 0.0,
            last_trigger: 0.0,
            sample_rate: sanitize_rate(sample_rate),
            limit,
            sync_enabled: true,
            soft_sync: false,
            direction: 1.0,
            forward: true,
        }
    }

    /// Builder-style initial phase, also restored by [`reset`](Self::reset).
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.set_phase(phase);
        self.initial_phase = self.phase;
        self
    }

    /// Set the sample rate in Hz. Non-positive rates fall back to 48 kHz.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sanitize_rate(sample_rate);
    }

    /// Current sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Step clamp in use.
    pub fn limit(&self) -> StepLimit {
        self.limit
    }

    /// Current phase, before the next increment.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Set the phase absolutely.
    ///
    /// The value is reduced modulo 1 with negatives folded into `[0, 1)`.
    /// While travelling forward a phase of exactly 0 is stored as 1, so the
    /// next sample reports a wrap (an impulse fires immediately).
    pub fn set_phase(&mut self, phase: f64) {
        if !phase.is_finite() {
            return;
        }
        let mut p = fmod(phase, 1.0);
        if p < 0.0 {
            p += 1.0;
        }
        if p == 0.0 && self.forward {
            p = 1.0;
        }
        self.phase = p;
    }

    /// Enable or disable the sync input.
    ///
    /// With sync disabled the trigger argument of [`step`](Self::step) is
    /// ignored entirely, which matches a generator built without a sync
    /// input.
    pub fn set_sync_enabled(&mut self, enabled: bool) {
        self.sync_enabled = enabled;
    }

    /// Returns `true` if sync triggers are honoured.
    pub fn sync_enabled(&self) -> bool {
        self.sync_enabled
    }

    /// Switch between hard sync (phase reset) and soft sync (direction flip).
    ///
    /// Turning soft sync off restores forward travel.
    pub fn set_soft_sync(&mut self, soft: bool) {
        self.soft_sync = soft;
        if !soft {
            self.direction = 1.0;
        }
    }

    /// Returns `true` in soft-sync mode.
    pub fn soft_sync(&self) -> bool {
        self.soft_sync
    }

    /// Current soft-sync direction multiplier (`1.0` or `-1.0`).
    pub fn direction(&self) -> f64 {
        self.direction
    }

    /// Clamped, direction-adjusted increment for `hz`.
    #[inline]
    pub fn increment(&self, hz: f64) -> f64 {
        let max = self.limit.max_step();
        let step = hz / self.sample_rate;
        // NaN falls through clamp, treat it as silence
        let step = if step.is_nan() { 0.0 } else { step.clamp(-max, max) };
        step * self.direction
    }

    /// Advance without modulation or sync.
    #[inline]
    pub fn advance(&mut self, hz: f64) -> PhaseStep {
        self.step(hz, self.last_offset, 0.0)
    }

    /// Process one sample.
    ///
    /// # Arguments
    ///
    /// * `hz` - Frequency in Hz (negative runs backwards)
    /// * `offset` - Phase-offset input; only its change since the previous
    ///   sample is applied
    /// * `trigger` - Sync input, acted on when it rises into `(0, 1]`
    #[inline]
    pub fn step(&mut self, hz: f64, offset: f64, trigger: f64) -> PhaseStep {
        let fired = self.sync_enabled && self.last_trigger <= 0.0 && trigger > 0.0 && trigger <= 1.0;
        self.last_trigger = if trigger.is_nan() { 0.0 } else { trigger };
        if fired && self.soft_sync {
            self.direction = -self.direction;
        }

        let increment = self.increment(hz);
        self.forward = increment >= 0.0;

        let offset = if offset.is_finite() { offset } else { self.last_offset };
        let dev = reduce_deviation(offset - self.last_offset);
        self.last_offset = offset;

        let synced = fired && !self.soft_sync;
        if synced {
            self.phase = if self.forward || trigger < 1.0 { trigger } else { 0.0 };
        }

        if !synced {
            self.phase += dev;
            if self.forward {
                // a deviation landing on 0 counts as arriving at the wrap point
                if self.phase < 0.0 || (dev != 0.0 && self.phase == 0.0) {
                    self.phase = wrap_unit(self.phase);
                    if self.phase == 0.0 {
                        self.phase = 1.0;
                    }
                }
            } else if self.phase >= 1.0 {
                self.phase -= 1.0;
                if self.phase > 1.0 {
                    self.phase = self.phase - ceil(self.phase) + 1.0;
                }
            }
        }

        let wrapped;
        if self.forward {
            wrapped = self.phase >= 1.0;
            if wrapped {
                self.phase -= 1.0;
                if self.phase >= 1.0 {
                    self.phase = wrap_unit(self.phase);
                }
            }
        } else {
            wrapped = self.phase <= 0.0;
            if wrapped {
                self.phase = self.phase - ceil(self.phase) + 1.0;
            }
        }

        let phase = self.phase;
        self.phase += increment;
        PhaseStep {
            phase,
            wrapped,
            increment,
        }
    }

    /// Restore the initial phase and clear modulation, trigger and direction
    /// state.
    pub fn reset(&mut self) {
        self.phase = self.initial_phase;
        self.last_offset = 0.0;
        self.last_trigger = 0.0;
        self.direction = 1.0;
        self.forward = true;
    }
}

fn sanitize_rate(sample_rate: f64) -> f64 {
    if sample_rate.is_finite() && sample_rate > 0.0 {
        sample_rate
    } else {
        48000.0
    }
}
