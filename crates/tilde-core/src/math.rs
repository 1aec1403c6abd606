//! Mathematical utility functions for DSP.
//!
//! Small allocation-free helpers shared by every kernel. All functions are
//! `no_std` and use `libm` for transcendental math.
//!
//! # Phase
//!
//! - [`wrap_unit`] - Wrap any value into [0, 1)
//! - [`reduce_deviation`] - C-style `fmod` reduction of large phase jumps
//!
//! # Conversions
//!
//! - [`midi_to_hz`] - MIDI note number to frequency
//! - [`db_to_linear`] / [`db_to_shelf_amp`] - Decibel conversions
//! - [`ms_to_samples`] - Segment length in whole samples
//!
//! # Numeric hygiene
//!
//! - [`flush_denormal`] / [`flush_denormal_f32`] - Snap tiny or non-finite state to zero

use libm::{floor, fmod, pow, round};

/// Wrap a phase value into [0, 1).
///
/// Works for arbitrarily large excursions in either direction.
///
/// # Example
/// ```rust
/// use tilde_core::wrap_unit;
///
/// assert_eq!(wrap_unit(1.25), 0.25);
/// assert_eq!(wrap_unit(-0.25), 0.75);
/// ```
#[inline]
pub fn wrap_unit(phase: f64) -> f64 {
    let wrapped = phase - floor(phase);
    // floor() of values just below an integer can round the result up to 1.0
    if wrapped >= 1.0 { 0.0 } else { wrapped }
}

/// Reduce a phase deviation whose magnitude reaches one full cycle.
///
/// Deviations inside (-1, 1) pass through untouched. Larger values are
/// reduced with a truncating remainder (sign follows the dividend), so an
/// absolute offset jump never adds more than one cycle.
#[inline]
pub fn reduce_deviation(dev: f64) -> f64 {
    if dev >= 1.0 || dev <= -1.0 {
        fmod(dev, 1.0)
    } else {
        dev
    }
}

/// Convert a MIDI note number to frequency in Hz (A4 = 69 = 440 Hz).
///
/// Fractional notes are allowed.
///
/// # Example
/// ```rust
/// use tilde_core::midi_to_hz;
///
/// assert!((midi_to_hz(69.0) - 440.0).abs() < 1e-9);
/// assert!((midi_to_hz(81.0) - 880.0).abs() < 1e-9);
/// ```
#[inline]
pub fn midi_to_hz(note: f64) -> f64 {
    440.0 * pow(2.0, (note - 69.0) / 12.0)
}

/// Convert decibels to linear amplitude, `10^(dB/20)`.
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    pow(10.0, db / 20.0)
}

/// Shelf/peaking amplitude term from the Audio EQ Cookbook, `10^(dB/40)`.
#[inline]
pub fn db_to_shelf_amp(db: f64) -> f64 {
    pow(10.0, db / 40.0)
}

/// Length of a timed segment in whole samples.
///
/// Rounded to the nearest sample and never less than one, so a zero or
/// negative time still produces a one-sample segment. A non-finite time or
/// rate also gives one sample.
#[inline]
pub fn ms_to_samples(ms: f64, sample_rate: f64) -> u32 {
    let n = round(ms * sample_rate * 0.001);
    if !n.is_finite() || n < 1.0 {
        1
    } else if n > f64::from(u32::MAX) {
        u32::MAX
    } else {
        n as u32
    }
}

/// Flush tiny or non-finite values to zero.
///
/// Subnormal floats cause severe CPU slowdowns on most architectures. This
/// replaces magnitudes below 1e-20 (well above the subnormal range) with
/// zero. Infinities and NaN are also reset so a blown-up recursion recovers
/// on the next block.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f64) -> f64 {
    if !x.is_finite() || x.abs() < 1e-20 { 0.0 } else { x }
}

/// Single-precision variant of [`flush_denormal`].
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal_f32(x: f32) -> f32 {
    if !x.is_finite() || x.abs() < 1e-20 { 0.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_unit() {
        assert_eq!(wrap_unit(0.0), 0.0);
        assert_eq!(wrap_unit(0.5), 0.5);
        assert_eq!(wrap_unit(1.0), 0.0);
        assert_eq!(wrap_unit(3.75), 0.75);
        assert_eq!(wrap_unit(-1.0), 0.0);
        assert_eq!(wrap_unit(-0.25), 0.75);
        assert!(wrap_unit(-1e-18) < 1.0);
    }

    #[test]
    fn test_reduce_deviation() {
        assert_eq!(reduce_deviation(0.5), 0.5);
        assert_eq!(reduce_deviation(-0.5), -0.5);
        assert!((reduce_deviation(2.25) - 0.25).abs() < 1e-12);
        assert!((reduce_deviation(-3.5) + 0.5).abs() < 1e-12);
        assert_eq!(reduce_deviation(1.0), 0.0);
    }

    #[test]
    fn test_midi_to_hz() {
        assert!((midi_to_hz(57.0) - 220.0).abs() < 1e-9);
        assert!((midi_to_hz(60.0) - 261.6255653).abs() < 1e-6);
    }

    #[test]
    fn test_db_conversions() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-12);
        assert!((db_to_linear(20.0) - 10.0).abs() < 1e-9);
        assert!((db_to_shelf_amp(40.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_ms_to_samples() {
        assert_eq!(ms_to_samples(10.0, 48000.0), 480);
        assert_eq!(ms_to_samples(0.0, 48000.0), 1);
        assert_eq!(ms_to_samples(-5.0, 48000.0), 1);
        assert_eq!(ms_to_samples(0.01, 44100.0), 1);
    }

    #[test]
    fn test_ms_to_samples_non_finite() {
        assert_eq!(ms_to_samples(f64::NAN, 48000.0), 1);
        assert_eq!(ms_to_samples(10.0, f64::NAN), 1);
        assert_eq!(ms_to_samples(f64::INFINITY, 48000.0), 1);
        assert_eq!(ms_to_samples(f64::NEG_INFINITY, 48000.0), 1);
        assert_eq!(ms_to_samples(1e30, 48000.0), u32::MAX);
    }

    #[test]
    fn test_flush_denormal() {
        assert_eq!(flush_denormal(1.0), 1.0);
        assert_eq!(flush_denormal(-0.5), -0.5);
        assert_eq!(flush_denormal(1e-10), 1e-10);
        assert_eq!(flush_denormal(1e-21), 0.0);
        assert_eq!(flush_denormal(-1e-300), 0.0);
        assert_eq!(flush_denormal(f64::NAN), 0.0);
        assert_eq!(flush_denormal(f64::INFINITY), 0.0);
        assert_eq!(flush_denormal_f32(1e-38), 0.0);
        assert_eq!(flush_denormal_f32(0.25), 0.25);
    }
}
