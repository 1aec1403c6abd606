//! Kernel registry and factory.
//!
//! The registry maps kind names ("bl.osc", "lowpass", "asr", ...) to
//! descriptors and factory functions, validates creation arguments against
//! each descriptor, and owns the [`SeedSource`] that hands out default seeds
//! to random generators. Two registries never share a counter, so tests can
//! build kernels with reproducible seeds.

use crate::args::{Flag, ParsedArgs};
use crate::error::{ArgError, ConfigError};
use crate::kernel_config::{KernelConfig, KernelRack, parse_param_value};
use tilde_core::{
    Asr, BiquadCascade, Curve, Filter, FilterType, Glide, Kernel, KernelCategory, Ramp, ResonanceMode, SeedSource,
    StateVariableFilter, SvfOutput,
};
use tilde_osc::{
    BlepOscillator, BlepShape, Impulse, Interpolation, Phasor, RandomInterp, RandomPulse, ShapeOscillator, Waveshape,
    WhiteNoise,
};

/// Describes a kernel kind in the registry.
#[derive(Debug, Clone)]
pub struct KernelDescriptor {
    /// Kind name used in configurations (lowercase, no `~`).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Category for organization.
    pub category: KernelCategory,
    /// Names of the positional float arguments, in order. Named parameters
    /// in a [`KernelConfig`] override these by name.
    pub params: &'static [&'static str],
    /// Value of each positional argument when it is not given.
    pub defaults: &'static [f32],
    /// Flags the kind accepts.
    pub flags: &'static [Flag],
    /// Accepted leading symbols; empty when the kind takes none.
    pub shapes: &'static [&'static str],
    /// Takes any number of floats instead of named positions.
    pub variadic: bool,
}

impl KernelDescriptor {
    /// Returns `true` for kinds that draw from a random seed.
    pub fn is_random(&self) -> bool {
        self.flags.contains(&Flag::Seed)
    }
}

/// Validated construction arguments handed to a factory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KernelSetup {
    /// Leading symbol, already checked against the descriptor.
    pub shape: Option<String>,
    /// One value per descriptor parameter (all given floats when variadic).
    pub values: Vec<f32>,
    /// Accepted flags.
    pub flags: Vec<Flag>,
    /// Random seed; filled from the registry's counter when not given.
    pub seed: Option<u32>,
    /// Curve exponent from `-exp`.
    pub exponent: Option<f32>,
}

impl KernelSetup {
    /// Value `index`, or 0 when out of range.
    pub fn value(&self, index: usize) -> f32 {
        self.values.get(index).copied().unwrap_or(0.0)
    }

    /// Returns `true` if `flag` was accepted.
    pub fn has(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    fn curve(&self) -> Curve {
        if self.has(Flag::Log) { Curve::Exponential } else { Curve::Linear }
    }
}

/// Factory function type for creating kernels.
type KernelFactory = fn(f64, &KernelSetup) -> Box<dyn Kernel>;

/// Internal entry in the registry.
struct RegistryEntry {
    descriptor: KernelDescriptor,
    factory: KernelFactory,
}

/// Registry of all available kernels.
///
/// # Example
///
/// ```rust
/// use tilde_config::{KernelConfig, KernelRegistry};
/// use tilde_core::{ControlEvents, Kernel, KernelCategory};
///
/// let mut registry = KernelRegistry::with_seed(42);
/// let config = KernelConfig::from_line("bl.osc square 220 0.25");
/// let mut osc = registry.create(&config, 48000.0).unwrap();
/// assert_eq!(osc.category(), KernelCategory::Oscillator);
///
/// let mut out = [0.0f32; 64];
/// osc.process_block(&[], &mut out, &mut ControlEvents::new());
/// ```
pub struct KernelRegistry {
    entries: Vec<RegistryEntry>,
    seeds: SeedSource,
}

impl Default for KernelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const NO_FLAGS: &[Flag] = &[];
const OSC_FLAGS: &[Flag] = &[Flag::Midi, Flag::Soft];
const SOFT: &[Flag] = &[Flag::Soft];
const RESONANCE_FLAGS: &[Flag] = &[Flag::Bandwidth, Flag::T60];
const SEED: &[Flag] = &[Flag::Seed];
const FREQ_PHASE: &[&str] = &["frequency", "phase"];
const FILTER_PARAMS: &[&str] = &["frequency", "resonance"];
const GAIN_FILTER_PARAMS: &[&str] = &["frequency", "resonance", "gain"];
const FILTER_DEFAULTS: &[f32] = &[1000.0, 0.707];
const PEAKING_DEFAULTS: &[f32] = &[1000.0, 0.707, 0.0];
const SHELF_DEFAULTS: &[f32] = &[1000.0, 1.0, 0.0];

impl KernelRegistry {
    /// Create a registry whose default seeds start from the clock.
    pub fn new() -> Self {
        Self::with_seed_source(SeedSource::from_time())
    }

    /// Create a registry with a fixed seed base, for reproducible output.
    pub fn with_seed(base: u32) -> Self {
        Self::with_seed_source(SeedSource::new(base))
    }

    /// Create a registry around an existing seed counter.
    pub fn with_seed_source(seeds: SeedSource) -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(26),
            seeds,
        };
        registry.register_oscillators();
        registry.register_noise();
        registry.register_filters();
        registry.register_envelopes();
        registry
    }

    fn register_oscillators(&mut self) {
        self.register(
            KernelDescriptor {
                id: "bl.osc",
                name: "Band-limited Oscillator",
                description: "PolyBLEP saw, square, triangle and variable saw",
                category: KernelCategory::Oscillator,
                params: &["frequency", "width", "phase"],
                defaults: &[0.0, 0.5, 0.0],
                flags: OSC_FLAGS,
                shapes: &["saw", "square", "tri", "vsaw"],
                variadic: false,
            },
            |sr, s| {
                let shape = s.shape.as_deref().and_then(BlepShape::from_name).unwrap_or_default();
                let mut osc = BlepOscillator::new(sr, shape);
                osc.set_frequency(s.value(0));
                osc.set_pulse_width(s.value(1));
                set_initial_phase(s.value(2), |p| osc.set_phase(p));
                osc.set_midi_mode(s.has(Flag::Midi));
                osc.set_soft_sync(s.has(Flag::Soft));
                Box::new(osc)
            },
        );

        self.register(
            KernelDescriptor {
                id: "sine",
                name: "Sine",
                description: "Sine oscillator with sync and phase modulation",
                category: KernelCategory::Oscillator,
                params: FREQ_PHASE,
                defaults: &[0.0, 0.0],
                flags: SOFT,
                shapes: &[],
                variadic: false,
            },
            |sr, s| shape_oscillator(sr, s, Waveshape::Sine),
        );

        self.register(
            KernelDescriptor {
                id: "tri",
                name: "Triangle",
                description: "Naive triangle oscillator",
                category: KernelCategory::Oscillator,
                params: FREQ_PHASE,
                defaults: &[0.0, 0.0],
                flags: SOFT,
                shapes: &[],
                variadic: false,
            },
            |sr, s| shape_oscillator(sr, s, Waveshape::Triangle),
        );

        self.register(
            KernelDescriptor {
                id: "parabolic",
                name: "Parabolic",
                description: "Parabolic approximation of a sine",
                category: KernelCategory::Oscillator,
                params: FREQ_PHASE,
                defaults: &[0.0, 0.0],
                flags: SOFT,
                shapes: &[],
                variadic: false,
            },
            |sr, s| shape_oscillator(sr, s, Waveshape::Parabolic),
        );

        self.register(
            KernelDescriptor {
                id: "gaussian",
                name: "Gaussian",
                description: "Gaussian pulse train with variable width",
                category: KernelCategory::Oscillator,
                params: &["frequency", "width", "phase"],
                defaults: &[0.0, 0.5, 0.0],
                flags: SOFT,
                shapes: &[],
                variadic: false,
            },
            |sr, s| {
                let mut osc = ShapeOscillator::new(sr, Waveshape::Gaussian(s.value(1)));
                osc.set_frequency(s.value(0));
                set_initial_phase(s.value(2), |p| osc.set_phase(p));
                osc.set_soft_sync(s.has(Flag::Soft));
                Box::new(osc)
            },
        );

        self.register(
            KernelDescriptor {
                id: "imp",
                name: "Impulse",
                description: "Single-sample impulse train",
                category: KernelCategory::Oscillator,
                params: FREQ_PHASE,
                defaults: &[0.0, 0.0],
                flags: NO_FLAGS,
                shapes: &[],
                variadic: false,
            },
            |sr, s| {
                let mut imp = Impulse::new(sr);
                imp.set_frequency(s.value(0));
                set_initial_phase(s.value(1), |p| imp.set_phase(p));
                Box::new(imp)
            },
        );

        self.register(
            KernelDescriptor {
                id: "pimp",
                name: "Phasor Impulse",
                description: "Ramp with a wrap event on every cycle",
                category: KernelCategory::Oscillator,
                params: FREQ_PHASE,
                defaults: &[0.0, 0.0],
                flags: OSC_FLAGS,
                shapes: &[],
                variadic: false,
            },
            |sr, s| {
                let mut phasor = Phasor::new(sr);
                phasor.set_frequency(s.value(0));
                set_initial_phase(s.value(1), |p| phasor.set_phase(p));
                phasor.set_midi_mode(s.has(Flag::Midi));
                phasor.set_soft_sync(s.has(Flag::Soft));
                Box::new(phasor)
            },
        );
    }

    fn register_noise(&mut self) {
        self.register(
            KernelDescriptor {
                id: "white",
                name: "White Noise",
                description: "Uniform white noise",
                category: KernelCategory::Noise,
                params: &[],
                defaults: &[],
                flags: SEED,
                shapes: &[],
                variadic: false,
            },
            |sr, s| Box::new(WhiteNoise::new(sr, s.seed.unwrap_or_default())),
        );

        self.register(
            KernelDescriptor {
                id: "rampnoise",
                name: "Ramp Noise",
                description: "Random values joined by straight lines",
                category: KernelCategory::Noise,
                params: &["frequency"],
                defaults: &[0.0],
                flags: SEED,
                shapes: &[],
                variadic: false,
            },
            |sr, s| random_interp(sr, s, Interpolation::Linear),
        );

        self.register(
            KernelDescriptor {
                id: "stepnoise",
                name: "Step Noise",
                description: "Sample-and-hold random values",
                category: KernelCategory::Noise,
                params: &["frequency"],
                defaults: &[0.0],
                flags: SEED,
                shapes: &[],
                variadic: false,
            },
            |sr, s| random_interp(sr, s, Interpolation::Step),
        );

        self.register(
            KernelDescriptor {
                id: "randpulse2",
                name: "Random Pulse",
                description: "Pulses opened by a random signal crossing zero",
                category: KernelCategory::Noise,
                params: &["frequency", "random"],
                defaults: &[0.0, 0.0],
                flags: SEED,
                shapes: &[],
                variadic: false,
            },
            |sr, s| {
                let mut pulse = RandomPulse::new(sr, s.seed.unwrap_or_default());
                pulse.set_frequency(s.value(0));
                pulse.set_random_amplitude(s.value(1) != 0.0);
                Box::new(pulse)
            },
        );
    }

    fn register_filters(&mut self) {
        let designs = [
            (FilterType::Lowpass, "Lowpass", "Cookbook low-pass biquad"),
            (FilterType::Highpass, "Highpass", "Cookbook high-pass biquad"),
            (FilterType::Bandpass, "Bandpass", "Constant-peak band-pass biquad"),
            (FilterType::Bandstop, "Bandstop", "Notch biquad"),
            (FilterType::Allpass, "Allpass", "Second-order all-pass"),
            (FilterType::Resonant, "Resonant", "Two-pole resonator"),
            (FilterType::Peaking, "Peaking EQ", "Parametric bell"),
            (FilterType::LowShelf, "Low Shelf", "Low shelving EQ with slope"),
            (FilterType::HighShelf, "High Shelf", "High shelving EQ with slope"),
        ];
        let factories: [KernelFactory; 9] = [
            |sr, s| filter(sr, s, FilterType::Lowpass),
            |sr, s| filter(sr, s, FilterType::Highpass),
            |sr, s| filter(sr, s, FilterType::Bandpass),
            |sr, s| filter(sr, s, FilterType::Bandstop),
            |sr, s| filter(sr, s, FilterType::Allpass),
            |sr, s| filter(sr, s, FilterType::Resonant),
            |sr, s| filter(sr, s, FilterType::Peaking),
            |sr, s| filter(sr, s, FilterType::LowShelf),
            |sr, s| filter(sr, s, FilterType::HighShelf),
        ];

        for ((filter_type, name, description), factory) in designs.into_iter().zip(factories) {
            let gain = filter_type.uses_gain();
            self.register(
                KernelDescriptor {
                    id: filter_type.name(),
                    name,
                    description,
                    category: KernelCategory::Filter,
                    params: if gain { GAIN_FILTER_PARAMS } else { FILTER_PARAMS },
                    defaults: if filter_type.is_shelf() {
                        SHELF_DEFAULTS
                    } else if gain {
                        PEAKING_DEFAULTS
                    } else {
                        FILTER_DEFAULTS
                    },
                    flags: if filter_type.is_shelf() { NO_FLAGS } else { RESONANCE_FLAGS },
                    shapes: &[],
                    variadic: false,
                },
                factory,
            );
        }

        self.register(
            KernelDescriptor {
                id: "biquads",
                name: "Biquad Cascade",
                description: "Series biquads from raw coefficient quintuples",
                category: KernelCategory::Filter,
                params: &[],
                defaults: &[],
                flags: NO_FLAGS,
                shapes: &[],
                variadic: true,
            },
            |sr, s| {
                let mut cascade = BiquadCascade::new(sr);
                let list: Vec<f64> = s.values.iter().map(|&v| f64::from(v)).collect();
                cascade.set_coefficients(&list);
                Box::new(cascade)
            },
        );

        self.register(
            KernelDescriptor {
                id: "svf",
                name: "State Variable Filter",
                description: "Trapezoidal SVF with selectable response",
                category: KernelCategory::Filter,
                params: &["frequency", "q"],
                defaults: &[1000.0, core::f32::consts::FRAC_1_SQRT_2],
                flags: NO_FLAGS,
                shapes: &["lowpass", "highpass", "bandpass", "notch"],
                variadic: false,
            },
            |sr, s| {
                let mut svf = StateVariableFilter::new(sr);
                svf.set_output(match s.shape.as_deref() {
                    Some("highpass") => SvfOutput::Highpass,
                    Some("bandpass") => SvfOutput::Bandpass,
                    Some("notch") => SvfOutput::Notch,
                    _ => SvfOutput::Lowpass,
                });
                svf.set_frequency(f64::from(s.value(0)));
                svf.set_q(f64::from(s.value(1)));
                Box::new(svf)
            },
        );
    }

    fn register_envelopes(&mut self) {
        self.register(
            KernelDescriptor {
                id: "line",
                name: "Line",
                description: "Ramp to each new target over a given time",
                category: KernelCategory::Envelope,
                params: &["value"],
                defaults: &[0.0],
                flags: &[Flag::Log],
                shapes: &[],
                variadic: false,
            },
            |sr, s| {
                let mut ramp = Ramp::new(sr);
                ramp.set_curve(s.curve());
                ramp.set_immediate(s.value(0));
                Box::new(ramp)
            },
        );

        self.register(
            KernelDescriptor {
                id: "glide2",
                name: "Glide",
                description: "Portamento with separate rise and fall times",
                category: KernelCategory::Envelope,
                params: &["up", "down"],
                defaults: &[0.0, 0.0],
                flags: &[Flag::Exp],
                shapes: &[],
                variadic: false,
            },
            |sr, s| {
                let mut glide = Glide::new(sr);
                glide.set_times(s.value(0), s.value(1));
                if let Some(exponent) = s.exponent {
                    glide.set_exponent(exponent);
                }
                Box::new(glide)
            },
        );

        self.register(
            KernelDescriptor {
                id: "asr",
                name: "ASR Envelope",
                description: "Attack/sustain/release with gate status events",
                category: KernelCategory::Envelope,
                params: &["attack", "release"],
                defaults: &[0.0, 0.0],
                flags: &[Flag::Log],
                shapes: &[],
                variadic: false,
            },
            |sr, s| {
                let mut asr = Asr::new(sr);
                asr.set_times(s.value(0), s.value(1));
                asr.set_curve(s.curve());
                Box::new(asr)
            },
        );
    }

    /// Register a kernel kind.
    pub fn register(&mut self, descriptor: KernelDescriptor, factory: KernelFactory) {
        self.entries.push(RegistryEntry { descriptor, factory });
    }

    /// Get all registered kernel descriptors.
    pub fn all_kernels(&self) -> impl Iterator<Item = &KernelDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Get kernels in a specific category.
    pub fn kernels_in_category(&self, category: KernelCategory) -> impl Iterator<Item = &KernelDescriptor> {
        self.all_kernels().filter(move |d| d.category == category)
    }

    /// Look up a kind; a trailing `~` is ignored.
    pub fn get(&self, kind: &str) -> Option<&KernelDescriptor> {
        self.position(kind).map(|i| &self.entries[i].descriptor)
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of default seeds handed out so far.
    pub fn seeds_issued(&self) -> u32 {
        self.seeds.issued()
    }

    /// Every problem with `config`, without building anything.
    pub fn validate(&self, config: &KernelConfig) -> Vec<ConfigError> {
        match self.resolve(config) {
            Ok((_, _, problems)) => problems,
            Err(e) => vec![e],
        }
    }

    /// Build a kernel, logging problems and falling back to defaults.
    ///
    /// Returns `None` only for an unknown kind. `sample_rate` applies unless
    /// the configuration carries its own.
    pub fn create(&mut self, config: &KernelConfig, sample_rate: f64) -> Option<Box<dyn Kernel>> {
        match self.resolve(config) {
            Ok((index, setup, problems)) => {
                for problem in &problems {
                    tracing::warn!(kind = %config.kind, "{problem}");
                }
                Some(self.build(index, setup, config, sample_rate))
            }
            Err(e) => {
                tracing::warn!("{e}");
                None
            }
        }
    }

    /// Build a kernel, failing on the first problem.
    ///
    /// No default seed is drawn when this fails.
    pub fn try_create(&mut self, config: &KernelConfig, sample_rate: f64) -> Result<Box<dyn Kernel>, ConfigError> {
        let (index, setup, mut problems) = self.resolve(config)?;
        if !problems.is_empty() {
            return Err(problems.swap_remove(0));
        }
        Ok(self.build(index, setup, config, sample_rate))
    }

    /// Build every kernel in a rack, skipping unknown kinds.
    pub fn build_rack(&mut self, rack: &KernelRack) -> Vec<Box<dyn Kernel>> {
        let kernels: Vec<_> = rack
            .kernels
            .iter()
            .filter_map(|config| self.create(config, f64::from(rack.sample_rate)))
            .collect();
        tracing::debug!(rack = %rack.name, built = kernels.len(), of = rack.len(), "built rack");
        kernels
    }

    /// Build every kernel in a rack, failing on the first problem.
    pub fn try_build_rack(&mut self, rack: &KernelRack) -> Result<Vec<Box<dyn Kernel>>, ConfigError> {
        rack.kernels
            .iter()
            .map(|config| self.try_create(config, f64::from(rack.sample_rate)))
            .collect()
    }

    fn position(&self, kind: &str) -> Option<usize> {
        let kind = kind.trim();
        let kind = kind.strip_suffix('~').unwrap_or(kind);
        self.entries.iter().position(|e| e.descriptor.id == kind)
    }

    fn resolve(&self, config: &KernelConfig) -> Result<(usize, KernelSetup, Vec<ConfigError>), ConfigError> {
        let index = self
            .position(&config.kind)
            .ok_or_else(|| ConfigError::UnknownKernel(config.kind.clone()))?;
        let d = &self.entries[index].descriptor;

        let (mut args, arg_errors) = ParsedArgs::parse(&config.args);
        let mut problems: Vec<ConfigError> = arg_errors.into_iter().map(ConfigError::from).collect();

        args.flags.retain(|&flag| {
            let supported = d.flags.contains(&flag);
            if !supported {
                problems.push(
                    ArgError::UnsupportedFlag {
                        flag: flag.name().to_string(),
                        kind: d.id.to_string(),
                    }
                    .into(),
                );
            }
            supported
        });
        if !args.has(Flag::Seed) {
            args.seed = None;
        }
        if !args.has(Flag::Exp) {
            args.exponent = None;
        }

        if let Some(shape) = args.shape.take() {
            if d.shapes.contains(&shape.as_str()) {
                args.shape = Some(shape);
            } else if d.shapes.is_empty() {
                let position = config
                    .args
                    .iter()
                    .position(|a| a.as_symbol() == Some(shape.as_str()))
                    .unwrap_or(0);
                problems.push(ArgError::UnexpectedSymbol { position, symbol: shape }.into());
            } else {
                problems.push(ArgError::UnknownShape(shape).into());
            }
        }

        let mut values = if d.variadic {
            args.floats
        } else {
            if args.floats.len() > d.params.len() {
                problems.push(
                    ArgError::TooManyArguments {
                        kind: d.id.to_string(),
                        max: d.params.len(),
                        found: args.floats.len(),
                    }
                    .into(),
                );
            }
            let mut values = d.defaults.to_vec();
            for (slot, &v) in values.iter_mut().zip(&args.floats) {
                *slot = v;
            }
            values
        };

        let mut keys: Vec<&String> = config.params.keys().collect();
        keys.sort();
        for key in keys {
            let raw = &config.params[key];
            let slot = if d.variadic {
                None
            } else {
                d.params.iter().position(|p| *p == key.as_str())
            };
            match (slot.and_then(|i| values.get_mut(i)), parse_param_value(raw)) {
                (Some(slot), Some(v)) => *slot = v,
                (Some(_), None) => {
                    problems.push(ConfigError::invalid_parameter(d.id, key.as_str(), format!("cannot parse '{raw}'")));
                }
                (None, _) => problems.push(ConfigError::invalid_parameter(d.id, key.as_str(), "unknown parameter")),
            }
        }

        let setup = KernelSetup {
            shape: args.shape,
            values,
            flags: args.flags,
            seed: args.seed,
            exponent: args.exponent,
        };
        Ok((index, setup, problems))
    }

    fn build(
        &mut self,
        index: usize,
        mut setup: KernelSetup,
        config: &KernelConfig,
        sample_rate: f64,
    ) -> Box<dyn Kernel> {
        let entry = &self.entries[index];
        if entry.descriptor.is_random() && setup.seed.is_none() {
            setup.seed = Some(self.seeds.next_default_seed());
        }
        let sample_rate = config.sample_rate.map_or(sample_rate, f64::from);
        tracing::debug!(kind = entry.descriptor.id, sample_rate, seed = ?setup.seed, "creating kernel");
        (entry.factory)(sample_rate, &setup)
    }
}

fn set_initial_phase(phase: f32, mut set: impl FnMut(f64)) {
    // a zero phase would prime an immediate wrap
    if phase != 0.0 {
        set(f64::from(phase));
    }
}

fn shape_oscillator(sample_rate: f64, s: &KernelSetup, shape: Waveshape) -> Box<dyn Kernel> {
    let mut osc = ShapeOscillator::new(sample_rate, shape);
    osc.set_frequency(s.value(0));
    set_initial_phase(s.value(1), |p| osc.set_phase(p));
    osc.set_soft_sync(s.has(Flag::Soft));
    Box::new(osc)
}

fn random_interp(sample_rate: f64, s: &KernelSetup, mode: Interpolation) -> Box<dyn Kernel> {
    let mut noise = RandomInterp::new(sample_rate, s.seed.unwrap_or_default(), mode);
    noise.set_frequency(s.value(0));
    Box::new(noise)
}

fn filter(sample_rate: f64, s: &KernelSetup, filter_type: FilterType) -> Box<dyn Kernel> {
    let mut f = Filter::new(sample_rate, filter_type);
    if s.has(Flag::T60) {
        f.set_resonance_mode(ResonanceMode::T60);
    } else if s.has(Flag::Bandwidth) {
        f.set_resonance_mode(ResonanceMode::Bandwidth);
    }
    f.set_frequency(f64::from(s.value(0)));
    f.set_resonance(f64::from(s.value(1)));
    if filter_type.uses_gain() {
        f.set_gain_db(f64::from(s.value(2)));
    }
    Box::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::Atom;
    use tilde_core::{ControlEvents, Signal};

    fn registry() -> KernelRegistry {
        KernelRegistry::with_seed(1)
    }

    fn render(kernel: &mut dyn Kernel, inputs: &[Signal<'_>], len: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; len];
        kernel.process_block(inputs, &mut out, &mut ControlEvents::new());
        out
    }

    #[test]
    fn descriptors_are_consistent() {
        let registry = registry();
        assert_eq!(registry.len(), 25);
        for d in registry.all_kernels() {
            assert_eq!(d.params.len(), d.defaults.len(), "{}", d.id);
            assert!(!d.id.ends_with('~'));
            assert!(registry.get(d.id).is_some());
        }
    }

    #[test]
    fn categories() {
        let registry = registry();
        assert_eq!(registry.kernels_in_category(KernelCategory::Oscillator).count(), 7);
        assert_eq!(registry.kernels_in_category(KernelCategory::Noise).count(), 4);
        assert_eq!(registry.kernels_in_category(KernelCategory::Filter).count(), 11);
        assert_eq!(registry.kernels_in_category(KernelCategory::Envelope).count(), 3);
    }

    #[test]
    fn tilde_suffix_is_ignored() {
        let registry = registry();
        assert_eq!(registry.get("lowpass~").map(|d| d.id), Some("lowpass"));
        assert_eq!(registry.get("eq").map(|d| d.name), Some("Peaking EQ"));
        assert!(registry.get("reverb").is_none());
    }

    #[test]
    fn every_kind_builds_with_no_arguments() {
        let mut registry = registry();
        let ids: Vec<&str> = registry.all_kernels().map(|d| d.id).collect();
        for id in ids {
            let mut kernel = registry.try_create(&KernelConfig::new(id), 48000.0).unwrap();
            let out = render(kernel.as_mut(), &[], 64);
            assert!(out.iter().all(|y| y.is_finite()), "{id}");
        }
    }

    #[test]
    fn positional_arguments_reach_the_kernel() {
        let mut registry = registry();
        let mut osc = registry
            .try_create(&KernelConfig::from_line("bl.osc square 1000 0.25"), 48000.0)
            .unwrap();
        let out = render(osc.as_mut(), &[], 4800);
        let high = out.iter().filter(|&&y| y > 0.0).count();
        assert!((1100..=1300).contains(&high), "high samples {high}");
    }

    #[test]
    fn named_params_override_positionals() {
        let mut registry = registry();
        let config = KernelConfig::from_line("sine 100").with_param("frequency", "1kHz");
        let mut osc = registry.try_create(&config, 48000.0).unwrap();
        let out = render(osc.as_mut(), &[], 4800);
        let crossings = out.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count();
        assert!((99..=100).contains(&crossings), "crossings {crossings}");
    }

    #[test]
    fn config_sample_rate_wins() {
        let mut registry = registry();
        let kernel = registry
            .try_create(&KernelConfig::new("lowpass").with_sample_rate(96000), 44100.0)
            .unwrap();
        assert_eq!(kernel.sample_rate(), 96000.0);
        let kernel = registry.try_create(&KernelConfig::new("lowpass"), 44100.0).unwrap();
        assert_eq!(kernel.sample_rate(), 44100.0);
    }

    #[test]
    fn unknown_kind() {
        let mut registry = registry();
        let config = KernelConfig::new("reverb");
        assert!(registry.create(&config, 48000.0).is_none());
        assert!(matches!(
            registry.try_create(&config, 48000.0),
            Err(ConfigError::UnknownKernel(kind)) if kind == "reverb"
        ));
    }

    #[test]
    fn validation_reports_every_problem() {
        let registry = registry();
        let config = KernelConfig::from_line("lowpass 100 1 2 -midi -bogus").with_param("drive", "3");
        let problems = registry.validate(&config);
        assert_eq!(problems.len(), 4, "{problems:?}");
        assert!(matches!(&problems[0], ConfigError::Arg(ArgError::UnknownFlag(f)) if f == "-bogus"));
        assert!(matches!(&problems[1], ConfigError::Arg(ArgError::UnsupportedFlag { flag, .. }) if flag == "-midi"));
        assert!(matches!(
            &problems[2],
            ConfigError::Arg(ArgError::TooManyArguments { max: 2, found: 3, .. })
        ));
        assert!(matches!(&problems[3], ConfigError::InvalidParameter { param, .. } if param == "drive"));
    }

    #[test]
    fn shapes_are_checked() {
        let registry = registry();
        let problems = registry.validate(&KernelConfig::from_line("bl.osc zigzag 100"));
        assert!(matches!(&problems[..], [ConfigError::Arg(ArgError::UnknownShape(s))] if s == "zigzag"));

        let problems = registry.validate(&KernelConfig::from_line("imp fast"));
        assert!(matches!(
            &problems[..],
            [ConfigError::Arg(ArgError::UnexpectedSymbol { position: 0, .. })]
        ));

        assert!(registry.validate(&KernelConfig::from_line("svf notch 500 2")).is_empty());
    }

    #[test]
    fn lenient_create_falls_back_to_defaults() {
        let mut registry = registry();
        let config = KernelConfig::from_line("bl.osc zigzag 1000").with_param("width", "wide");
        assert!(registry.try_create(&config, 48000.0).is_err());

        let mut osc = registry.create(&config, 48000.0).unwrap();
        let mut reference = BlepOscillator::new(48000.0, BlepShape::Saw);
        reference.set_frequency(1000.0);
        let out = render(osc.as_mut(), &[], 256);
        for (n, &y) in out.iter().enumerate() {
            assert_eq!(y, reference.advance(), "sample {n}");
        }
    }

    #[test]
    fn default_seeds_come_from_the_registry() {
        let mut a = KernelRegistry::with_seed(9);
        let mut b = KernelRegistry::with_seed(9);
        let config = KernelConfig::from_line("rampnoise 500");

        let mut first = a.create(&config, 48000.0).unwrap();
        let mut second = a.create(&config, 48000.0).unwrap();
        let mut replay = b.create(&config, 48000.0).unwrap();
        assert_eq!(a.seeds_issued(), 2);

        let x = render(first.as_mut(), &[], 512);
        let y = render(second.as_mut(), &[], 512);
        let z = render(replay.as_mut(), &[], 512);
        assert_ne!(x, y);
        assert_eq!(x, z);
    }

    #[test]
    fn explicit_seed_skips_the_counter() {
        let mut registry = registry();
        let config = KernelConfig::from_line("white -seed 5");
        let mut a = registry.create(&config, 48000.0).unwrap();
        let mut b = registry.create(&config, 48000.0).unwrap();
        assert_eq!(registry.seeds_issued(), 0);
        assert_eq!(render(a.as_mut(), &[], 64), render(b.as_mut(), &[], 64));
    }

    #[test]
    fn failed_strict_create_draws_no_seed() {
        let mut registry = registry();
        assert!(registry.try_create(&KernelConfig::from_line("white 1 2"), 48000.0).is_err());
        assert_eq!(registry.seeds_issued(), 0);
        // non-random kinds never draw
        registry.try_create(&KernelConfig::new("sine"), 48000.0).unwrap();
        assert_eq!(registry.seeds_issued(), 0);
    }

    #[test]
    fn biquads_take_any_number_of_coefficients() {
        let mut registry = registry();
        // one stage of pure gain 0.5
        let config = KernelConfig::new("biquads").with_args([0.0, 0.0, 0.5, 0.0, 0.0].map(Atom::Float));
        let mut cascade = registry.try_create(&config, 48000.0).unwrap();
        let input = [1.0f32, 0.5, -1.0];
        let out = render(cascade.as_mut(), &[Signal::Audio(&input)], 3);
        assert_eq!(out, vec![0.5, 0.25, -0.5]);

        let problems = registry.validate(&KernelConfig::new("biquads").with_param("gain", "2"));
        assert!(matches!(&problems[..], [ConfigError::InvalidParameter { .. }]));
    }

    #[test]
    fn bandwidth_flag_selects_resonance_mode() {
        let mut registry = registry();
        let mut by_flag = registry
            .try_create(&KernelConfig::from_line("bandpass 1000 1 -bw"), 48000.0)
            .unwrap();
        let mut reference = Filter::new(48000.0, FilterType::Bandpass);
        reference.set_resonance_mode(ResonanceMode::Bandwidth);
        reference.set_frequency(1000.0);
        reference.set_resonance(1.0);

        let input: Vec<f32> = (0..128).map(|n| if n == 0 { 1.0 } else { 0.0 }).collect();
        let out = render(by_flag.as_mut(), &[Signal::Audio(&input)], 128);
        for (n, &x) in input.iter().enumerate() {
            assert_eq!(out[n], reference.process(x), "sample {n}");
        }
    }

    #[test]
    fn asr_log_flag_and_times() {
        let mut registry = registry();
        let mut env = registry.try_create(&KernelConfig::from_line("asr 2 2"), 1000.0).unwrap();
        let gate = [1.0f32; 4];
        let mut events = ControlEvents::new();
        let mut out = [0.0f32; 4];
        env.process_block(&[Signal::Audio(&gate)], &mut out, &mut events);
        assert_eq!(&out[..2], &[0.5, 1.0]);
        assert_eq!(events.len(), 1);

        assert!(registry.try_create(&KernelConfig::from_line("asr 2 2 -log"), 1000.0).is_ok());
        assert!(registry.try_create(&KernelConfig::from_line("asr -soft"), 1000.0).is_err());
    }

    #[test]
    fn glide_exponent_flag() {
        let registry = registry();
        assert!(registry.validate(&KernelConfig::from_line("glide2 -exp 3 10 20")).is_empty());
        let problems = registry.validate(&KernelConfig::from_line("line -exp 3"));
        assert!(matches!(&problems[..], [ConfigError::Arg(ArgError::UnsupportedFlag { .. })]));
    }
}
