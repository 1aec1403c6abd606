//! Tilde Core - block-based DSP kernels
//!
//! Leaf-level signal-processing primitives: phase accumulation, random
//! numbers, second-order filters and ramped envelopes. Everything runs
//! sample-by-sample inside fixed-size state with no allocation on the audio
//! path.
//!
//! # Core Abstractions
//!
//! ## Kernel interface
//!
//! - [`Kernel`] - Object-safe block-processing trait
//! - [`Signal`] - Per-block input: a scalar control or an audio slice
//! - [`ControlEvents`] - Sample-stamped control output (e.g. ASR status)
//!
//! ## Phase
//!
//! - [`PhaseAccumulator`] - Running phase with offset modulation, hard and soft sync
//!
//! ## Random
//!
//! - [`XorShift`] - Seedable three-register xorshift engine
//! - [`SeedSource`] - Explicit default-seed counter
//!
//! ## Filters
//!
//! - [`Filter`] - Biquad with runtime coefficient recomputation ([`FilterType`], [`ResonanceMode`])
//! - [`BiquadCascade`] - Up to [`MAX_STAGES`] sections from a coefficient list
//! - [`StateVariableFilter`] - TPT SVF with four simultaneous outputs
//!
//! ## Envelopes
//!
//! - [`Ramp`] - Linear/exponential smoother
//! - [`Glide`] - Portamento with separate rise and fall
//! - [`Asr`] - Gated attack/sustain/release
//!
//! # no_std Support
//!
//! Disable the default `std` feature for embedded targets:
//!
//! ```toml
//! [dependencies]
//! tilde-core = { version = "0.1", default-features = false }
//! ```
//!
//! The optional `tracing` feature logs control-rate events such as
//! truncated coefficient lists. Nothing is logged per sample.
//!
//! # Example
//!
//! ```rust
//! use tilde_core::{ControlEvents, Filter, FilterType, Kernel, Signal};
//!
//! let mut lp = Filter::new(48000.0, FilterType::Lowpass);
//! let input = [1.0f32; 64];
//! let mut output = [0.0f32; 64];
//! let mut events = ControlEvents::new();
//!
//! lp.process_block(
//!     &[Signal::Audio(&input), Signal::Scalar(2000.0), Signal::Scalar(0.707)],
//!     &mut output,
//!     &mut events,
//! );
//! assert!(output[63] > 0.5);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: no allocation, locking or I/O in `process_block`
//! - **Never fails on the audio path**: bad controls are clamped, degenerate
//!   filters pass signal through
//! - **Owned state**: no globals; independent instances may run on
//!   separate threads

#![cfg_attr(not(feature = "std"), no_std)]

pub mod biquad;
pub mod cascade;
pub mod envelope;
pub mod filter;
pub mod kernel;
pub mod math;
pub mod phase;
pub mod random;
pub mod svf;

// Re-export main types at crate root
pub use biquad::{
    BiquadCoeffs, BiquadState, MIN_Q, allpass_coefficients, bandpass_coefficients, bandstop_coefficients,
    bandwidth_to_q, high_shelf_coefficients, highpass_coefficients, low_shelf_coefficients, lowpass_coefficients,
    peaking_coefficients, resonant_coefficients, t60_to_q,
};
pub use cascade::{BiquadCascade, MAX_STAGES};
pub use envelope::{Asr, AsrOutput, Curve, Glide, Ramp, exp_coefficient};
pub use filter::{Filter, FilterType, ResonanceMode};
pub use kernel::{ControlEvent, ControlEvents, Kernel, KernelCategory, MAX_BLOCK_EVENTS, Signal, input_at};
pub use math::{
    db_to_linear, db_to_shelf_amp, flush_denormal, flush_denormal_f32, midi_to_hz, ms_to_samples, reduce_deviation,
    wrap_unit,
};
pub use phase::{PhaseAccumulator, PhaseStep, StepLimit};
pub use random::{REGISTER_MINIMUMS, SeedSource, XorShift, seed_from_f32, wang_hash};
pub use svf::{StateVariableFilter, SvfFrame, SvfOutput};
