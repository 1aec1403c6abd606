//! Error types for kernel construction.

use std::path::PathBuf;
use thiserror::Error;

/// A single problem in a creation-argument list.
///
/// The lenient constructors log these and keep going; the strict ones
/// return the first one wrapped in [`ConfigError::Arg`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgError {
    /// A `-flag` the kernel does not know at all
    #[error("unknown flag '{0}'")]
    UnknownFlag(String),

    /// A flag that needs a value appeared last, or before a symbol
    #[error("flag '{0}' expects a float value")]
    MissingFlagValue(String),

    /// A symbol where only floats are accepted
    #[error("unexpected symbol '{symbol}' at position {position}")]
    UnexpectedSymbol {
        /// Zero-based index into the atom list.
        position: usize,
        /// The offending symbol.
        symbol: String,
    },

    /// More float arguments than the kernel reads
    #[error("'{kind}' takes at most {max} float arguments, found {found}")]
    TooManyArguments {
        /// Kernel kind.
        kind: String,
        /// Number of floats the kernel reads.
        max: usize,
        /// Number of floats supplied.
        found: usize,
    },

    /// A known flag the kernel does not support
    #[error("flag '{flag}' is not supported by '{kind}'")]
    UnsupportedFlag {
        /// The flag, including its leading dash.
        flag: String,
        /// Kernel kind.
        kind: String,
    },

    /// A waveform or response name the kernel does not have
    #[error("unknown shape '{0}'")]
    UnknownShape(String),
}

/// Errors that can occur while loading configurations or building kernels.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Unknown kernel kind
    #[error("unknown kernel kind: {0}")]
    UnknownKernel(String),

    /// Invalid named parameter
    #[error("invalid parameter '{param}' for kernel '{kernel}': {reason}")]
    InvalidParameter {
        /// Kernel kind containing the invalid parameter.
        kernel: String,
        /// Name of the invalid parameter.
        param: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// Malformed creation argument
    #[error("invalid creation argument: {0}")]
    Arg(#[from] ArgError),
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(kernel: impl Into<String>, param: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            kernel: kernel.into(),
            param: param.into(),
            reason: reason.into(),
        }
    }
}
