//! Construction surface for tilde kernels.
//!
//! The realtime kernels in `tilde-core` and `tilde-osc` never fail. This
//! crate is where their configuration is read and checked before anything
//! runs: creation-argument lists, TOML racks, and a registry that turns
//! either into boxed [`Kernel`](tilde_core::Kernel)s.
//!
//! # Features
//!
//! - **Creation arguments**: object-box style atom lists (`saw 440 -midi`)
//! - **Racks**: TOML files listing kernels with arguments and named params
//! - **Registry**: kind lookup, validation, and factories
//! - **Seeds**: default random seeds from a counter owned by the registry
//!
//! Problems are logged with `tracing` by the lenient constructors, which
//! still build the kernel with defaults. The `try_` variants return a
//! [`ConfigError`] instead.
//!
//! # Example
//!
//! ```rust
//! use tilde_config::{KernelConfig, KernelRack, KernelRegistry};
//!
//! let rack = KernelRack::from_toml(
//!     r#"
//!     name = "Pluck"
//!
//!     [[kernels]]
//!     kind = "bl.osc"
//!     args = ["saw", 110.0]
//!
//!     [[kernels]]
//!     kind = "lowpass"
//!     [kernels.params]
//!     frequency = "1.5kHz"
//!     resonance = "0.7"
//!     "#,
//! )
//! .unwrap();
//!
//! let mut registry = KernelRegistry::with_seed(7);
//! let kernels = registry.try_build_rack(&rack).unwrap();
//! assert_eq!(kernels.len(), 2);
//! ```

mod args;
mod error;
mod kernel_config;
mod registry;

pub use args::{Atom, Flag, ParsedArgs, parse_atoms};
pub use error::{ArgError, ConfigError};
pub use kernel_config::{KernelConfig, KernelRack, parse_param_value};
pub use registry::{KernelDescriptor, KernelRegistry, KernelSetup};
