//! Tilde Osc - signal generators built on tilde-core
//!
//! Oscillators and random sources that share the
//! [`PhaseAccumulator`](tilde_core::PhaseAccumulator) and
//! [`XorShift`](tilde_core::XorShift) primitives from `tilde-core`. Every
//! generator implements [`Kernel`](tilde_core::Kernel) and also exposes a
//! typed per-sample API.
//!
//! # Generators
//!
//! ## Band-limited
//!
//! - [`BlepOscillator`] - PolyBLEP/PolyBLAMP saw, square, triangle and variable saw
//!
//! ```rust
//! use tilde_osc::{BlepOscillator, BlepShape};
//!
//! let mut osc = BlepOscillator::new(48000.0, BlepShape::Saw);
//! osc.set_midi_mode(true);
//! osc.set_frequency(57.0); // A3
//! let sample = osc.advance();
//! assert!(sample.abs() <= 1.0);
//! ```
//!
//! ## Phase-shaped
//!
//! - [`ShapeOscillator`] - Sine, triangle, parabolic and gaussian ([`Waveshape`])
//! - [`Impulse`] - One-sample impulse per cycle
//! - [`Phasor`] - Ramp plus wrap flag
//!
//! ## Random
//!
//! - [`WhiteNoise`] - Uniform noise
//! - [`RandomInterp`] - Stepped or linearly interpolated random values
//! - [`RandomPulse`] - Random gate with fixed or random amplitude
//!
//! Random generators take their seed at construction. Use a
//! [`SeedSource`](tilde_core::SeedSource) to hand out distinct default seeds:
//!
//! ```rust
//! use tilde_core::SeedSource;
//! use tilde_osc::WhiteNoise;
//!
//! let mut seeds = SeedSource::new(1);
//! let mut a = WhiteNoise::new(48000.0, seeds.next_default_seed());
//! let mut b = WhiteNoise::new(48000.0, seeds.next_default_seed());
//! assert_ne!(a.next_sample(), b.next_sample());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

pub mod impulse;
pub mod noise;
pub mod polyblep;
pub mod shape;

pub use impulse::{Impulse, Phasor, PhasorOutput};
pub use noise::{Interpolation, RandomInterp, RandomPulse, WhiteNoise};
pub use polyblep::{BlepOscillator, BlepShape, MAX_PULSE_WIDTH, MIN_PULSE_WIDTH, poly_blamp, poly_blep};
pub use shape::{ShapeOscillator, Waveshape, shape_at};
