//! Ramped transitions: smoothing ramps, portamento glides and ASR envelopes.
//!
//! All three count segments in whole samples (`round(ms * sr / 1000)`, at
//! least one) so transitions land on exact sample boundaries.
//!
//! - [`Ramp`] - linear or exponential approach to a new target
//! - [`Glide`] - portamento with separate up/down times and a curve exponent
//! - [`Asr`] - gated attack/sustain/release envelope with status events
//!
//! Linear segments snap exactly to their target on the last sample.
//! Exponential segments use `a = exp(ln(0.001) / n)`, reaching -60 dB of the
//! distance after `n` samples and never landing exactly.

use libm::{exp, log, pow, round};

use crate::kernel::{ControlEvents, Kernel, KernelCategory, Signal, input_at};
use crate::math::{flush_denormal, ms_to_samples};

/// Segment shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Curve {
    /// Constant increment, exact arrival.
    #[default]
    Linear,
    /// One-pole approach to within -60 dB over the segment.
    Exponential,
}

/// Per-sample coefficient for an exponential segment of `n` samples.
#[inline]
pub fn exp_coefficient(n: u32) -> f64 {
    exp(log(0.001) / f64::from(n.max(1)))
}

/// Smoother that ramps toward each new target.
///
/// # Example
///
/// ```rust
/// use tilde_core::Ramp;
///
/// let mut ramp = Ramp::new(1000.0);
/// ramp.set_target(1.0, 4.0);
/// let out: Vec<f32> = (0..5).map(|_| ramp.process()).collect();
/// assert_eq!(out, vec![0.25, 0.5, 0.75, 1.0, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Ramp {
    value: f64,
    target: f64,
    increment: f64,
    remaining: u32,
    coeff: f64,
    curve: Curve,
    time_ms: f64,
    sample_rate: f64,
}

impl Default for Ramp {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Ramp {
    /// Create at 0.0 with a linear curve.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            value: 0.0,
            target: 0.0,
            increment: 0.0,
            remaining: 0,
            coeff: 0.0,
            curve: Curve::Linear,
            time_ms: 0.0,
            sample_rate,
        }
    }

    /// Choose linear or exponential segments (applies from the next target).
    pub fn set_curve(&mut self, curve: Curve) {
        self.curve = curve;
    }

    /// Segment shape in use.
    pub fn curve(&self) -> Curve {
        self.curve
    }

    /// Start a new segment from the current value toward `target`.
    pub fn set_target(&mut self, target: f32, time_ms: f32) {
        let target = f64::from(target);
        if !target.is_finite() {
            return;
        }
        let n = ms_to_samples(f64::from(time_ms), self.sample_rate);
        self.time_ms = f64::from(time_ms);
        self.target = target;
        self.remaining = n;
        self.increment = (target - self.value) / f64::from(n);
        self.coeff = exp_coefficient(n);
    }

    /// Jump to `value` immediately.
    pub fn set_immediate(&mut self, value: f32) {
        self.value = f64::from(value);
        self.target = self.value;
        self.remaining = 0;
    }

    /// Current output.
    pub fn value(&self) -> f32 {
        self.value as f32
    }

    /// Target of the current segment.
    pub fn target(&self) -> f32 {
        self.target as f32
    }

    /// Returns `true` while a linear segment is still moving.
    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    /// Next output sample.
    #[inline]
    pub fn process(&mut self) -> f32 {
        match self.curve {
            Curve::Linear => {
                if self.remaining > 0 {
                    self.remaining -= 1;
                    self.value = if self.remaining == 0 { self.target } else { self.value + self.increment };
                }
            }
            Curve::Exponential => {
                self.remaining = self.remaining.saturating_sub(1);
                self.value = self.target + self.coeff * (self.value - self.target);
            }
        }
        self.value as f32
    }
}

impl Kernel for Ramp {
    fn category(&self) -> KernelCategory {
        KernelCategory::Envelope
    }

    fn input_names(&self) -> &'static [&'static str] {
        &["target", "time"]
    }

    /// A target input differing from the current target starts a segment.
    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        let (target, time) = (self.target as f32, self.time_ms as f32);
        for (n, out) in output.iter_mut().enumerate() {
            let t = input_at(inputs, 0, n, target);
            if t != self.target as f32 {
                self.set_target(t, input_at(inputs, 1, n, time));
            }
            *out = self.process();
        }
        self.value = flush_denormal(self.value);
        self.target = flush_denormal(self.target);
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn reset(&mut self) {
        self.set_immediate(0.0);
    }
}

/// Portamento with independent rise and fall times.
///
/// When the input changes the output travels from where it is to the new
/// value over `up_ms` (rising) or `down_ms` (falling). The shape follows
/// `step^exponent`; an exponent of ±1 is linear, and a negative exponent
/// mirrors the curve.
#[derive(Debug, Clone)]
pub struct Glide {
    last_in: f64,
    last_out: f64,
    start: f64,
    delta: f64,
    n: u32,
    left: u32,
    exponent: f64,
    reset_pending: bool,
    up_ms: f64,
    down_ms: f64,
    sample_rate: f64,
}

impl Default for Glide {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Glide {
    /// Create with zero glide times and a linear curve.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            last_in: 0.0,
            last_out: 0.0,
            start: 0.0,
            delta: 0.0,
            n: 1,
            left: 0,
            exponent: 1.0,
            reset_pending: false,
            up_ms: 0.0,
            down_ms: 0.0,
            sample_rate,
        }
    }

    /// Set default rise and fall times in milliseconds (negatives read as 0).
    pub fn set_times(&mut self, up_ms: f32, down_ms: f32) {
        self.up_ms = f64::from(up_ms.max(0.0));
        self.down_ms = f64::from(down_ms.max(0.0));
    }

    /// Curve exponent.
    pub fn set_exponent(&mut self, exponent: f32) {
        if exponent.is_finite() {
            self.exponent = f64::from(exponent);
        }
    }

    /// Jump straight to the next input value, cancelling any glide.
    pub fn reset_glide(&mut self) {
        self.reset_pending = true;
    }

    /// Segment length for `ms`: `round(ms * sr / 1000) + 1`. Non-finite
    /// lengths count as zero.
    fn segment_len(&self, ms: f64) -> u32 {
        let n = round(ms * self.sample_rate * 0.001);
        if !n.is_finite() || n <= 0.0 {
            return 1;
        }
        (n.min(f64::from(u32::MAX - 1)) as u32) + 1
    }

    fn shape(&self, position: f64) -> f64 {
        let e = self.exponent;
        if e.abs() == 1.0 {
            return position;
        }
        let rising = self.delta > 0.0;
        if (e >= 0.0) == rising {
            pow(position, e.abs())
        } else {
            1.0 - pow(1.0 - position, e.abs())
        }
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, input: f32, up_ms: f32, down_ms: f32) -> f32 {
        let input = f64::from(input);
        if self.reset_pending {
            self.reset_pending = false;
            self.left = 0;
            self.last_in = input;
            self.last_out = input;
        } else if input != self.last_in {
            self.start = self.last_out;
            self.delta = input - self.last_out;
            self.last_in = input;
            self.n = if self.delta > 0.0 {
                self.segment_len(f64::from(up_ms))
            } else {
                self.segment_len(f64::from(down_ms))
            };
            self.left = self.n - 1;
            self.last_out = self.position_value();
        } else if self.left > 0 {
            self.left -= 1;
            self.last_out = self.position_value();
        } else {
            self.last_out = input;
        }
        self.last_out as f32
    }

    fn position_value(&self) -> f64 {
        if self.left == 0 {
            return self.last_in;
        }
        let position = f64::from(self.n - self.left) / f64::from(self.n);
        self.start + self.shape(position) * self.delta
    }

    /// Current output.
    pub fn value(&self) -> f32 {
        self.last_out as f32
    }
}

impl Kernel for Glide {
    fn category(&self) -> KernelCategory {
        KernelCategory::Envelope
    }

    fn input_names(&self) -> &'static [&'static str] {
        &["signal", "up", "down"]
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], _events: &mut ControlEvents) {
        let (up, down) = (self.up_ms as f32, self.down_ms as f32);
        for (n, out) in output.iter_mut().enumerate() {
            *out = self.process(
                input_at(inputs, 0, n, 0.0),
                input_at(inputs, 1, n, up),
                input_at(inputs, 2, n, down),
            );
        }
        self.last_out = flush_denormal(self.last_out);
        self.start = flush_denormal(self.start);
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn reset(&mut self) {
        self.last_in = 0.0;
        self.last_out = 0.0;
        self.start = 0.0;
        self.delta = 0.0;
        self.left = 0;
        self.reset_pending = false;
    }
}

/// One ASR output sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsrOutput {
    /// Envelope value.
    pub value: f32,
    /// `Some(1.0)` when the envelope switched on this sample, `Some(0.0)`
    /// when the release finished.
    pub status: Option<f32>,
}

/// Attack/sustain/release envelope.
///
/// The gate is open while either the audio gate input or the control gate
/// ([`set_gate`](Self::set_gate)) is non-zero; a non-zero control gate also
/// sets the sustain level. Each gate edge starts a new segment from the
/// current output, so retriggers never jump.
///
/// # Example
///
/// ```rust
/// use tilde_core::Asr;
///
/// let mut env = Asr::new(1000.0);
/// let first = env.process(1.0, 2.0, 2.0);
/// assert_eq!(first.status, Some(1.0));
/// assert_eq!(first.value, 0.5);
/// assert_eq!(env.process(1.0, 2.0, 2.0).value, 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Asr {
    last: f64,
    target: f64,
    increment: f64,
    remaining: u32,
    gate_open: bool,
    active: bool,
    control_gate: f32,
    curve: Curve,
    attack_ms: f32,
    release_ms: f32,
    sample_rate: f64,
}

impl Default for Asr {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl Asr {
    /// Create a closed envelope with zero attack and release.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            last: 0.0,
            target: 0.0,
            increment: 0.0,
            remaining: 0,
            gate_open: false,
            active: false,
            control_gate: 0.0,
            curve: Curve::Linear,
            attack_ms: 0.0,
            release_ms: 0.0,
            sample_rate,
        }
    }

    /// Set default attack and release times in milliseconds.
    pub fn set_times(&mut self, attack_ms: f32, release_ms: f32) {
        self.attack_ms = attack_ms;
        self.release_ms = release_ms;
    }

    /// Linear (default) or exponential segments.
    pub fn set_curve(&mut self, curve: Curve) {
        self.curve = curve;
    }

    /// Control-rate gate. Non-zero opens the gate and sets the sustain
    /// level; zero releases it (unless the audio gate holds it open).
    pub fn set_gate(&mut self, gate: f32) {
        self.control_gate = if gate.is_finite() { gate } else { 0.0 };
    }

    /// Current output.
    pub fn value(&self) -> f32 {
        self.last as f32
    }

    /// Returns `true` between the on and off status events.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Process one sample.
    ///
    /// # Arguments
    ///
    /// * `gate` - Audio gate; non-zero holds the envelope open at that level
    /// * `attack_ms` - Attack time for a segment starting on this sample
    /// * `release_ms` - Release time for a segment starting on this sample
    #[inline]
    pub fn process(&mut self, gate: f32, attack_ms: f32, release_ms: f32) -> AsrOutput {
        let gate = if gate.is_finite() { gate } else { 0.0 };
        let n_attack = ms_to_samples(f64::from(attack_ms), self.sample_rate);
        let n_release = ms_to_samples(f64::from(release_ms), self.sample_rate);
        let mut status = None;

        let open = gate != 0.0 || self.control_gate != 0.0;
        if open != self.gate_open {
            self.gate_open = open;
            self.target = f64::from(if self.control_gate != 0.0 { self.control_gate } else { gate });
            if open {
                if !self.active {
                    self.active = true;
                    status = Some(1.0);
                }
                self.increment = (self.target - self.last) / f64::from(n_attack);
                self.remaining = n_attack;
            } else {
                self.increment = -self.last / f64::from(n_release);
                self.remaining = n_release;
            }
        }

        if self.gate_open {
            match self.curve {
                Curve::Linear => {
                    if self.remaining > 0 {
                        self.remaining -= 1;
                        self.last = if self.remaining == 0 { self.target } else { self.last + self.increment };
                    } else {
                        self.last = self.target;
                    }
                }
                Curve::Exponential => {
                    self.remaining = self.remaining.saturating_sub(1);
                    self.last = self.target + exp_coefficient(n_attack) * (self.last - self.target);
                }
            }
        } else {
            let finished = match self.curve {
                Curve::Linear => {
                    if self.remaining > 0 {
                        self.remaining -= 1;
                        self.last = if self.remaining == 0 { 0.0 } else { self.last + self.increment };
                    } else {
                        self.last = 0.0;
                    }
                    self.remaining == 0
                }
                Curve::Exponential => {
                    self.remaining = self.remaining.saturating_sub(1);
                    self.last = self.target + exp_coefficient(n_release) * (self.last - self.target);
                    self.remaining == 0
                }
            };
            if finished && self.active {
                self.active = false;
                status = Some(0.0);
            }
        }

        AsrOutput {
            value: self.last as f32,
            status,
        }
    }
}

impl Kernel for Asr {
    fn category(&self) -> KernelCategory {
        KernelCategory::Envelope
    }

    fn input_names(&self) -> &'static [&'static str] {
        &["gate", "attack", "release"]
    }

    fn process_block(&mut self, inputs: &[Signal<'_>], output: &mut [f32], events: &mut ControlEvents) {
        let (attack, release) = (self.attack_ms, self.release_ms);
        for (n, out) in output.iter_mut().enumerate() {
            let sample = self.process(
                input_at(inputs, 0, n, 0.0),
                input_at(inputs, 1, n, attack),
                input_at(inputs, 2, n, release),
            );
            if let Some(status) = sample.status {
                events.push(n, status);
            }
            *out = sample.value;
        }
        self.last = flush_denormal(self.last);
        self.target = flush_denormal(self.target);
    }

    fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn reset(&mut self) {
        self.last = 0.0;
        self.target = 0.0;
        self.increment = 0.0;
        self.remaining = 0;
        self.gate_open = false;
        self.active = false;
        self.control_gate = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_linear_exact_arrival() {
        let mut ramp = Ramp::new(48000.0);
        ramp.set_target(0.3, 10.0);
        let mut y = 0.0;
        for _ in 0..480 {
            y = ramp.process();
        }
        assert_eq!(y, 0.3f32);
        assert!(!ramp.is_ramping());
    }

    #[test]
    fn test_ramp_zero_time_jumps() {
        let mut ramp = Ramp::new(48000.0);
        ramp.set_target(-2.0, 0.0);
        assert_eq!(ramp.process(), -2.0);
    }

    #[test]
    fn test_ramp_non_finite_time_jumps() {
        for time in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut ramp = Ramp::new(48000.0);
            ramp.set_target(1.0, time);
            assert_eq!(ramp.process(), 1.0, "time {time}");
            assert_eq!(ramp.target(), 1.0);
            assert!(!ramp.is_ramping());
        }
    }

    #[test]
    fn test_ramp_kernel_nan_time() {
        let mut ramp = Ramp::new(1000.0);
        let mut out = [0.0f32; 4];
        ramp.process_block(&[Signal::Scalar(0.5), Signal::Scalar(f32::NAN)], &mut out, &mut ControlEvents::new());
        assert_eq!(out, [0.5; 4]);
    }

    #[test]
    fn test_ramp_exponential_converges() {
        let mut ramp = Ramp::new(1000.0);
        ramp.set_curve(Curve::Exponential);
        ramp.set_target(1.0, 100.0);
        let mut y = 0.0;
        for _ in 0..100 {
            y = ramp.process();
        }
        assert!((y - 0.999).abs() < 1e-4, "after n samples within -60 dB: {y}");
        assert!(y < 1.0);
    }

    #[test]
    fn test_ramp_kernel_retargets() {
        let mut ramp = Ramp::new(1000.0);
        let mut out = [0.0f32; 4];
        ramp.process_block(&[Signal::Scalar(1.0), Signal::Scalar(2.0)], &mut out, &mut ControlEvents::new());
        assert_eq!(out, [0.5, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_glide_up_and_down() {
        let mut glide = Glide::new(1000.0);
        // 3 ms up: n = 4 samples
        let up: Vec<f32> = (0..5).map(|_| glide.process(1.0, 3.0, 0.0)).collect();
        assert_eq!(up, vec![0.25, 0.5, 0.75, 1.0, 1.0]);
        // 0 ms down: immediate
        assert_eq!(glide.process(0.0, 3.0, 0.0), 0.0);
    }

    #[test]
    fn test_glide_non_finite_time_jumps() {
        let mut glide = Glide::new(1000.0);
        assert_eq!(glide.process(1.0, f32::INFINITY, 0.0), 1.0);
        assert_eq!(glide.process(-1.0, 0.0, f32::NAN), -1.0);
    }

    #[test]
    fn test_glide_reset_jumps() {
        let mut glide = Glide::new(1000.0);
        glide.reset_glide();
        assert_eq!(glide.process(5.0, 100.0, 100.0), 5.0);
        assert_eq!(glide.process(5.0, 100.0, 100.0), 5.0);
    }

    #[test]
    fn test_glide_exponent_shapes() {
        let mut lin = Glide::new(1000.0);
        let mut curved = Glide::new(1000.0);
        curved.set_exponent(2.0);
        let a = lin.process(1.0, 9.0, 9.0);
        let b = curved.process(1.0, 9.0, 9.0);
        assert!(b < a, "convex rise starts slower");
    }

    #[test]
    fn test_asr_linear_cycle() {
        let mut env = Asr::new(1000.0);
        let mut events = ControlEvents::new();
        let gate_on = [1.0f32; 4];
        let mut out = [0.0f32; 4];
        env.set_times(4.0, 2.0);
        env.process_block(&[Signal::Audio(&gate_on)], &mut out, &mut events);
        assert_eq!(out, [0.25, 0.5, 0.75, 1.0]);
        assert_eq!(events.as_slice().len(), 1);
        assert_eq!((events.as_slice()[0].offset, events.as_slice()[0].value), (0, 1.0));

        events.clear();
        env.process_block(&[Signal::Scalar(0.0)], &mut out, &mut events);
        assert_eq!(out, [0.5, 0.0, 0.0, 0.0]);
        assert_eq!(events.len(), 1);
        assert_eq!((events.as_slice()[0].offset, events.as_slice()[0].value), (1, 0.0));
        assert!(!env.is_active());
    }

    #[test]
    fn test_asr_control_gate_sets_level() {
        let mut env = Asr::new(1000.0);
        env.set_gate(0.5);
        let s = env.process(0.0, 0.0, 0.0);
        assert_eq!(s.status, Some(1.0));
        assert_eq!(s.value, 0.5);
        env.set_gate(0.0);
        let s = env.process(0.0, 0.0, 0.0);
        assert_eq!(s.value, 0.0);
        assert_eq!(s.status, Some(0.0));
    }

    #[test]
    fn test_asr_retrigger_continuity() {
        let mut env = Asr::new(1000.0);
        for _ in 0..10 {
            env.process(1.0, 10.0, 10.0);
        }
        for _ in 0..4 {
            env.process(0.0, 10.0, 10.0);
        }
        let released = env.value();
        assert!(released > 0.0 && released < 1.0);

        let next = env.process(1.0, 10.0, 10.0);
        let step = (1.0 - released) / 10.0;
        assert!((next.value - released - step).abs() < 1e-6, "attack restarts from current value");
        assert_eq!(next.status, None, "still active, no second on event");
    }

    #[test]
    fn test_asr_non_finite_inputs() {
        let mut env = Asr::new(1000.0);
        let on = env.process(1.0, f32::NAN, f32::NAN);
        assert_eq!((on.value, on.status), (1.0, Some(1.0)));
        let off = env.process(0.0, f32::INFINITY, f32::INFINITY);
        assert_eq!((off.value, off.status), (0.0, Some(0.0)));
        let ignored = env.process(f32::NAN, 1.0, 1.0);
        assert_eq!((ignored.value, ignored.status), (0.0, None));
    }

    #[test]
    fn test_asr_exponential_emits_off() {
        let mut env = Asr::new(1000.0);
        env.set_curve(Curve::Exponential);
        for _ in 0..50 {
            env.process(1.0, 5.0, 5.0);
        }
        let mut off_at = None;
        for n in 0..10 {
            if env.process(0.0, 5.0, 5.0).status == Some(0.0) {
                off_at = Some(n);
            }
        }
        assert_eq!(off_at, Some(4));
        assert!(env.value() > 0.0, "exponential release never lands exactly");
    }

    #[test]
    fn test_asr_denormal_guard() {
        let mut env = Asr::new(48000.0);
        env.set_curve(Curve::Exponential);
        let mut out = [0.0f32; 64];
        let mut events = ControlEvents::new();
        env.set_gate(1e-30);
        env.process_block(&[], &mut out, &mut events);
        assert_eq!(env.last, 0.0);
        assert_eq!(env.target, 0.0);
    }
}
