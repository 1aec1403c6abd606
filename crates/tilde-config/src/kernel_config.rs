//! Kernel descriptions and racks of them.

use crate::args::{Atom, parse_atoms};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Description of one kernel: its kind, creation arguments and named
/// parameter overrides.
///
/// Named parameters take precedence over the positional float with the same
/// name (see [`KernelDescriptor::params`](crate::KernelDescriptor::params)).
///
/// # Example
///
/// ```rust
/// use tilde_config::KernelConfig;
///
/// let config = KernelConfig::from_line("bl.osc saw 440 -midi").with_param("width", "25%");
///
/// assert_eq!(config.kind, "bl.osc");
/// assert_eq!(config.args.len(), 3);
/// assert_eq!(config.parse_param("width"), Some(0.25));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KernelConfig {
    /// Kernel kind (e.g. "bl.osc", "lowpass", "asr").
    pub kind: String,

    /// Sample rate override for this kernel; the rack's rate otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    /// Creation arguments as they would appear after the kind in a patch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Atom>,

    /// Named parameters as strings, so units can be attached ("1.2kHz").
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub params: HashMap<String, String>,
}

impl KernelConfig {
    /// Create a configuration with no arguments.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            sample_rate: None,
            args: Vec::new(),
            params: HashMap::new(),
        }
    }

    /// Parse `"kind arg arg ..."`, the way an object box reads.
    pub fn from_line(line: &str) -> Self {
        let mut tokens = line.split_whitespace();
        let kind = tokens.next().unwrap_or_default();
        let rest: Vec<&str> = tokens.collect();
        Self::new(kind).with_args(parse_atoms(&rest.join(" ")))
    }

    /// Append one creation argument.
    pub fn with_arg(mut self, atom: impl Into<Atom>) -> Self {
        self.args.push(atom.into());
        self
    }

    /// Append creation arguments.
    pub fn with_args(mut self, atoms: impl IntoIterator<Item = Atom>) -> Self {
        self.args.extend(atoms);
        self
    }

    /// Add a named parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Set the sample rate override.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    /// Get a parameter value.
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Set a parameter value.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Parse a parameter value with [`parse_param_value`].
    pub fn parse_param(&self, key: &str) -> Option<f32> {
        let value = self.params.get(key)?;
        parse_param_value(value)
    }
}

/// Parse a parameter value string into an f32 in the unit kernels expect.
///
/// Supports:
/// - Plain numbers: "0.5", "1200", "-3"
/// - Percentages: "50%" (divided by 100)
/// - Decibels: "-6dB" (kept in dB, filter gains are dB)
/// - Time: "100ms" (kept in ms), "1.5s" (converted to ms)
/// - Frequency: "440Hz", "1.2kHz" (converted to Hz)
pub fn parse_param_value(value: &str) -> Option<f32> {
    let value = value.trim();

    let number = |s: &str| s.trim().parse::<f32>().ok().filter(|v| v.is_finite());

    if let Some(pct) = value.strip_suffix('%') {
        return number(pct).map(|v| v / 100.0);
    }

    if let Some(db) = value.strip_suffix("dB").or_else(|| value.strip_suffix("db")) {
        return number(db);
    }

    if let Some(ms) = value.strip_suffix("ms") {
        return number(ms);
    }

    if let Some(s) = value.strip_suffix('s') {
        return number(s).map(|v| v * 1000.0);
    }

    if let Some(khz) = value.strip_suffix("kHz").or_else(|| value.strip_suffix("khz")) {
        return number(khz).map(|v| v * 1000.0);
    }

    if let Some(hz) = value.strip_suffix("Hz").or_else(|| value.strip_suffix("hz")) {
        return number(hz);
    }

    number(value)
}

/// A named set of kernels sharing a default sample rate.
///
/// # TOML Format
///
/// ```toml
/// name = "Pluck"
/// sample_rate = 44100
///
/// [[kernels]]
/// kind = "bl.osc"
/// args = ["saw", 110.0, "-midi"]
///
/// [[kernels]]
/// kind = "lowpass"
/// args = [1200.0, 0.7]
/// [kernels.params]
/// frequency = "2.5kHz"
///
/// [[kernels]]
/// kind = "asr"
/// args = [5.0, 300.0, "-log"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KernelRack {
    /// Name of the rack.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Default sample rate for kernels without their own (defaults to 48000).
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Kernel descriptions in order.
    #[serde(default)]
    pub kernels: Vec<KernelConfig>,
}

fn default_sample_rate() -> u32 {
    48000
}

impl KernelRack {
    /// Create an empty rack.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            sample_rate: default_sample_rate(),
            kernels: Vec::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the default sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Append a kernel.
    pub fn with_kernel(mut self, kernel: KernelConfig) -> Self {
        self.kernels.push(kernel);
        self
    }

    /// Load a rack from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let rack: KernelRack = toml::from_str(&content)?;
        tracing::debug!(name = %rack.name, kernels = rack.kernels.len(), "loaded rack from {}", path.display());
        Ok(rack)
    }

    /// Load a rack from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the rack to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the rack to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Sample rate a kernel will be built at.
    pub fn sample_rate_for(&self, kernel: &KernelConfig) -> u32 {
        kernel.sample_rate.unwrap_or(self.sample_rate)
    }

    /// Number of kernels in the rack.
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    /// Check if the rack is empty.
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Get a kernel description by index.
    pub fn get(&self, index: usize) -> Option<&KernelConfig> {
        self.kernels.get(index)
    }
}
