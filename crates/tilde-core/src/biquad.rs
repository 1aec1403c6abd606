//! Second-order IIR sections and their coefficient designs.
//!
//! Coefficients follow the RBJ Audio EQ Cookbook, normalised so the
//! recursion needs no division and with the feedback terms pre-negated:
//!
//! ```text
//! y[n] = a0*x[n] + a1*x[n-1] + a2*x[n-2] + b1*y[n-1] + b2*y[n-2]
//! ```
//!
//! `a*` are feedforward and `b*` feedback, the same layout a flat
//! `(b1, b2, a0, a1, a2)` coefficient list uses (see [`BiquadCascade`](crate::BiquadCascade)).
//!
//! All designs take `frequency` in Hz and the Nyquist frequency, with
//! `omega = frequency * PI / nyquist`. Any design given a resonance below
//! [`MIN_Q`] returns [`BiquadCoeffs::BYPASS`].

use core::f64::consts::{LN_2, PI};
use libm::{cos, log, sin, sinh, sqrt};

use crate::math::{db_to_shelf_amp, flush_denormal};

/// Resonance below which a design collapses to pass-through.
pub const MIN_Q: f64 = 1e-6;

/// Normalised biquad coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    /// Feedforward, current input.
    pub a0: f64,
    /// Feedforward, x[n-1].
    pub a1: f64,
    /// Feedforward, x[n-2].
    pub a2: f64,
    /// Feedback, y[n-1] (already negated).
    pub b1: f64,
    /// Feedback, y[n-2] (already negated).
    pub b2: f64,
}

impl BiquadCoeffs {
    /// Pass-through: `y[n] = x[n]`.
    pub const BYPASS: Self = Self {
        a0: 1.0,
        a1: 0.0,
        a2: 0.0,
        b1: 0.0,
        b2: 0.0,
    };

    /// Build from a `(b1, b2, a0, a1, a2)` quintuple.
    pub fn from_quintuple(q: [f64; 5]) -> Self {
        Self {
            b1: q[0],
            b2: q[1],
            a0: q[2],
            a1: q[3],
            a2: q[4],
        }
    }

    /// Convert from the cookbook's un-normalised `(b0, b1, b2, a0, a1, a2)`
    /// form (feedforward `b`, feedback `a`).
    pub fn from_cookbook(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        let inv = 1.0 / a0;
        Self {
            a0: b0 * inv,
            a1: b1 * inv,
            a2: b2 * inv,
            b1: -a1 * inv,
            b2: -a2 * inv,
        }
    }

    /// Returns `true` for exact pass-through coefficients.
    pub fn is_bypass(&self) -> bool {
        *self == Self::BYPASS
    }

    fn is_finite(&self) -> bool {
        self.a0.is_finite()
            && self.a1.is_finite()
            && self.a2.is_finite()
            && self.b1.is_finite()
            && self.b2.is_finite()
    }
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::BYPASS
    }
}

/// Direct Form I history for one section.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadState {
    xnm1: f64,
    xnm2: f64,
    ynm1: f64,
    ynm2: f64,
}

impl BiquadState {
    /// Zeroed history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one sample through `coeffs`.
    #[inline]
    pub fn process(&mut self, coeffs: &BiquadCoeffs, xn: f64) -> f64 {
        let yn = coeffs.a0 * xn
            + coeffs.a1 * self.xnm1
            + coeffs.a2 * self.xnm2
            + coeffs.b1 * self.ynm1
            + coeffs.b2 * self.ynm2;
        self.xnm2 = self.xnm1;
        self.xnm1 = xn;
        self.ynm2 = self.ynm1;
        self.ynm1 = yn;
        yn
    }

    /// Zero the history without touching any coefficients.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Snap denormal or non-finite history to zero.
    pub fn flush_denormals(&mut self) {
        self.xnm1 = flush_denormal(self.xnm1);
        self.xnm2 = flush_denormal(self.xnm2);
        self.ynm1 = flush_denormal(self.ynm1);
        self.ynm2 = flush_denormal(self.ynm2);
    }

    /// History as `[x[n-1], x[n-2], y[n-1], y[n-2]]`.
    pub fn history(&self) -> [f64; 4] {
        [self.xnm1, self.xnm2, self.ynm1, self.ynm2]
    }
}

/// Normalised angular frequency, `frequency * PI / nyquist`.
#[inline]
pub fn omega(frequency: f64, nyquist: f64) -> f64 {
    frequency * PI / nyquist
}

/// Bandwidth in octaves to Q at `omega`.
///
/// `Q = 1 / (2 sinh(ln(2)/2 * bw * omega / sin(omega)))`, with the
/// bandwidth clamped to at least [`MIN_Q`].
pub fn bandwidth_to_q(bandwidth: f64, omega: f64) -> f64 {
    let bw = if bandwidth < MIN_Q { MIN_Q } else { bandwidth };
    1.0 / (2.0 * sinh(LN_2 / 2.0 * bw * omega / sin(omega)))
}

/// 60 dB decay time in milliseconds to Q at `frequency`.
///
/// `Q = frequency * (PI * t60 / 1000) / ln(1000)`
pub fn t60_to_q(frequency: f64, t60_ms: f64) -> f64 {
    frequency * (PI * t60_ms / 1000.0) / log(1000.0)
}

/// Shared sin/cos/alpha terms, or `None` when `q` is degenerate.
#[inline]
fn prewarp(frequency: f64, q: f64, nyquist: f64) -> Option<(f64, f64, f64)> {
    if q.is_nan() || q < MIN_Q {
        return None;
    }
    let w = omega(frequency, nyquist);
    let sin_w = sin(w);
    let cos_w = cos(w);
    Some((sin_w, cos_w, sin_w / (2.0 * q)))
}

#[inline]
fn checked(coeffs: BiquadCoeffs) -> BiquadCoeffs {
    if coeffs.is_finite() { coeffs } else { BiquadCoeffs::BYPASS }
}

/// Low-pass design.
///
/// # Arguments
///
/// * `frequency` - Cutoff in Hz
/// * `q` - Resonance (0.707 for Butterworth)
/// * `nyquist` - Half the sample rate
pub fn lowpass_coefficients(frequency: f64, q: f64, nyquist: f64) -> BiquadCoeffs {
    let Some((_, cos_w, alpha)) = prewarp(frequency, q, nyquist) else {
        return BiquadCoeffs::BYPASS;
    };
    let b0 = alpha + 1.0;
    let a0 = (1.0 - cos_w) / (2.0 * b0);
    checked(BiquadCoeffs {
        a0,
        a1: (1.0 - cos_w) / b0,
        a2: a0,
        b1: 2.0 * cos_w / b0,
        b2: (alpha - 1.0) / b0,
    })
}

/// High-pass design.
pub fn highpass_coefficients(frequency: f64, q: f64, nyquist: f64) -> BiquadCoeffs {
    let Some((_, cos_w, alpha)) = prewarp(frequency, q, nyquist) else {
        return BiquadCoeffs::BYPASS;
    };
    let b0 = alpha + 1.0;
    let a0 = (1.0 + cos_w) / (2.0 * b0);
    checked(BiquadCoeffs {
        a0,
        a1: -(1.0 + cos_w) / b0,
        a2: a0,
        b1: 2.0 * cos_w / b0,
        b2: (alpha - 1.0) / b0,
    })
}

/// Band-pass design with 0 dB peak gain.
pub fn bandpass_coefficients(frequency: f64, q: f64, nyquist: f64) -> BiquadCoeffs {
    let Some((_, cos_w, alpha)) = prewarp(frequency, q, nyquist) else {
        return BiquadCoeffs::BYPASS;
    };
    let b0 = alpha + 1.0;
    let a0 = alpha / b0;
    checked(BiquadCoeffs {
        a0,
        a1: 0.0,
        a2: -a0,
        b1: 2.0 * cos_w / b0,
        b2: (alpha - 1.0) / b0,
    })
}

/// Resonant band-pass design: peak gain grows with Q (constant skirt gain).
pub fn resonant_coefficients(frequency: f64, q: f64, nyquist: f64) -> BiquadCoeffs {
    let Some((_, cos_w, alpha)) = prewarp(frequency, q, nyquist) else {
        return BiquadCoeffs::BYPASS;
    };
    let b0 = alpha + 1.0;
    let a0 = alpha * q / b0;
    checked(BiquadCoeffs {
        a0,
        a1: 0.0,
        a2: -a0,
        b1: 2.0 * cos_w / b0,
        b2: (alpha - 1.0) / b0,
    })
}

/// Band-stop (notch) design.
pub fn bandstop_coefficients(frequency: f64, q: f64, nyquist: f64) -> BiquadCoeffs {
    let Some((_, cos_w, alpha)) = prewarp(frequency, q, nyquist) else {
        return BiquadCoeffs::BYPASS;
    };
    let b0 = alpha + 1.0;
    let a1 = -2.0 * cos_w / b0;
    checked(BiquadCoeffs {
        a0: 1.0 / b0,
        a1,
        a2: 1.0 / b0,
        b1: -a1,
        b2: (alpha - 1.0) / b0,
    })
}

/// Second-order all-pass design.
pub fn allpass_coefficients(frequency: f64, q: f64, nyquist: f64) -> BiquadCoeffs {
    let Some((_, cos_w, alpha)) = prewarp(frequency, q, nyquist) else {
        return BiquadCoeffs::BYPASS;
    };
    let b0 = alpha + 1.0;
    let a1 = -2.0 * cos_w / b0;
    checked(BiquadCoeffs {
        a0: (1.0 - alpha) / b0,
        a1,
        a2: 1.0,
        b1: -a1,
        b2: (alpha - 1.0) / b0,
    })
}

/// Peaking EQ design.
///
/// # Arguments
///
/// * `frequency` - Centre frequency in Hz
/// * `q` - Resonance
/// * `gain_db` - Boost (positive) or cut (negative) in dB
/// * `nyquist` - Half the sample rate
pub fn peaking_coefficients(frequency: f64, q: f64, gain_db: f64, nyquist: f64) -> BiquadCoeffs {
    let Some((_, cos_w, alpha)) = prewarp(frequency, q, nyquist) else {
        return BiquadCoeffs::BYPASS;
    };
    let amp = db_to_shelf_amp(gain_db);
    let b0 = alpha / amp + 1.0;
    let a1 = -2.0 * cos_w / b0;
    checked(BiquadCoeffs {
        a0: (1.0 + alpha * amp) / b0,
        a1,
        a2: (1.0 - alpha * amp) / b0,
        b1: -a1,
        b2: (alpha / amp - 1.0) / b0,
    })
}

/// Shelf `alpha` from slope `S` and amplitude `A`.
#[inline]
fn shelf_alpha(sin_w: f64, amp: f64, slope: f64) -> f64 {
    let s = slope.clamp(MIN_Q, 1.0);
    sin_w / 2.0 * sqrt((amp + 1.0 / amp) * (1.0 / s - 1.0) + 2.0)
}

/// Low-shelf design.
///
/// `slope` is the cookbook shelf slope `S`, clamped to `(0, 1]`.
pub fn low_shelf_coefficients(frequency: f64, slope: f64, gain_db: f64, nyquist: f64) -> BiquadCoeffs {
    let amp = db_to_shelf_amp(gain_db);
    let w = omega(frequency, nyquist);
    let (sin_w, cos_w) = (sin(w), cos(w));
    let two_sqrt_a_alpha = 2.0 * sqrt(amp) * shelf_alpha(sin_w, amp, slope);

    checked(BiquadCoeffs::from_cookbook(
        amp * ((amp + 1.0) - (amp - 1.0) * cos_w + two_sqrt_a_alpha),
        2.0 * amp * ((amp - 1.0) - (amp + 1.0) * cos_w),
        amp * ((amp + 1.0) - (amp - 1.0) * cos_w - two_sqrt_a_alpha),
        (amp + 1.0) + (amp - 1.0) * cos_w + two_sqrt_a_alpha,
        -2.0 * ((amp - 1.0) + (amp + 1.0) * cos_w),
        (amp + 1.0) + (amp - 1.0) * cos_w - two_sqrt_a_alpha,
    ))
}

/// High-shelf design.
///
/// `slope` is the cookbook shelf slope `S`, clamped to `(0, 1]`.
pub fn high_shelf_coefficients(frequency: f64, slope: f64, gain_db: f64, nyquist: f64) -> BiquadCoeffs {
    let amp = db_to_shelf_amp(gain_db);
    let w = omega(frequency, nyquist);
    let (sin_w, cos_w) = (sin(w), cos(w));
    let two_sqrt_a_alpha = 2.0 * sqrt(amp) * shelf_alpha(sin_w, amp, slope);

    checked(BiquadCoeffs::from_cookbook(
        amp * ((amp + 1.0) + (amp - 1.0) * cos_w + two_sqrt_a_alpha),
        -2.0 * amp * ((amp - 1.0) + (amp + 1.0) * cos_w),
        amp * ((amp + 1.0) + (amp - 1.0) * cos_w - two_sqrt_a_alpha),
        (amp + 1.0) - (amp - 1.0) * cos_w + two_sqrt_a_alpha,
        2.0 * ((amp - 1.0) - (amp + 1.0) * cos_w),
        (amp + 1.0) - (amp - 1.0) * cos_w - two_sqrt_a_alpha,
    ))
}
