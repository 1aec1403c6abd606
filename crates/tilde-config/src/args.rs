//! Creation-argument lists.
//!
//! Kernels are described the way a patcher object box describes them: a
//! flat list of atoms, each either a float or a symbol. Flags come as
//! `-name` symbols, a leading bare symbol names a waveform or response, and
//! the remaining floats fill the kernel's positional parameters in order.
//!
//! ```text
//! bl.osc  saw 440 0.5 -midi      -> shape "saw", floats [440, 0.5], midi
//! rampnoise -seed 7 20           -> seed 7, floats [20]
//! glide2 -exp 2 10 50            -> exponent 2, floats [10, 50]
//! lowpass 1200 2 -bw             -> floats [1200, 2], bandwidth mode
//! ```

use crate::error::ArgError;
use serde::{Deserialize, Serialize};
use std::fmt;
use tilde_core::seed_from_f32;

/// One element of a creation-argument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Atom {
    /// A number.
    Float(f32),
    /// Anything that does not read as a finite number.
    Symbol(String),
}

impl Atom {
    /// Parse one whitespace-free token.
    pub fn parse(token: &str) -> Self {
        match token.parse::<f32>() {
            Ok(v) if v.is_finite() => Atom::Float(v),
            _ => Atom::Symbol(token.to_string()),
        }
    }

    /// The float value, if this is a float.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Atom::Float(v) => Some(*v),
            Atom::Symbol(_) => None,
        }
    }

    /// The symbol text, if this is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Atom::Float(_) => None,
            Atom::Symbol(s) => Some(s),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Float(v) => write!(f, "{v}"),
            Atom::Symbol(s) => f.write_str(s),
        }
    }
}

impl From<f32> for Atom {
    fn from(v: f32) -> Self {
        Atom::Float(v)
    }
}

impl From<&str> for Atom {
    fn from(s: &str) -> Self {
        Atom::Symbol(s.to_string())
    }
}

/// Split a space-separated argument string into atoms.
///
/// ```rust
/// use tilde_config::{Atom, parse_atoms};
///
/// let atoms = parse_atoms("saw 440 -midi");
/// assert_eq!(atoms, vec![Atom::from("saw"), Atom::Float(440.0), Atom::from("-midi")]);
/// ```
pub fn parse_atoms(text: &str) -> Vec<Atom> {
    text.split_whitespace().map(Atom::parse).collect()
}

/// Creation flags understood by at least one kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `-midi`: frequency inputs are MIDI note numbers.
    Midi,
    /// `-soft`: sync triggers flip direction instead of resetting.
    Soft,
    /// `-bw`: filter resonance is a bandwidth in octaves.
    Bandwidth,
    /// `-t60`: filter resonance is a decay time in ms.
    T60,
    /// `-log`: exponential segments.
    Log,
    /// `-seed <f>`: explicit random seed.
    Seed,
    /// `-exp <f>`: glide curve exponent.
    Exp,
}

impl Flag {
    /// All flags, in documentation order.
    pub const ALL: [Flag; 7] = [
        Flag::Midi,
        Flag::Soft,
        Flag::Bandwidth,
        Flag::T60,
        Flag::Log,
        Flag::Seed,
        Flag::Exp,
    ];

    /// Spelling in an argument list, including the dash.
    pub const fn name(self) -> &'static str {
        match self {
            Flag::Midi => "-midi",
            Flag::Soft => "-soft",
            Flag::Bandwidth => "-bw",
            Flag::T60 => "-t60",
            Flag::Log => "-log",
            Flag::Seed => "-seed",
            Flag::Exp => "-exp",
        }
    }

    /// Returns `true` if the flag consumes the float after it.
    pub const fn takes_value(self) -> bool {
        matches!(self, Flag::Seed | Flag::Exp)
    }

    /// Look a flag up by its spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

/// A classified argument list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArgs {
    /// Flags in the order they appeared (duplicates collapsed).
    pub flags: Vec<Flag>,
    /// Value of `-seed`, already hashed into a register seed.
    pub seed: Option<u32>,
    /// Value of `-exp`.
    pub exponent: Option<f32>,
    /// Leading bare symbol, if any.
    pub shape: Option<String>,
    /// Positional floats.
    pub floats: Vec<f32>,
}

impl ParsedArgs {
    /// Classify an atom list, collecting problems instead of stopping.
    ///
    /// Every problem is reported; the returned arguments hold whatever
    /// could be read, so a kernel can still be built with defaults for the
    /// rest.
    pub fn parse(atoms: &[Atom]) -> (Self, Vec<ArgError>) {
        let mut parsed = Self::default();
        let mut errors = Vec::new();
        let mut i = 0;

        while i < atoms.len() {
            match &atoms[i] {
                Atom::Float(v) => parsed.floats.push(*v),
                Atom::Symbol(s) if s.starts_with('-') => match Flag::from_name(s) {
                    Some(flag) if flag.takes_value() => match atoms.get(i + 1).and_then(Atom::as_float) {
                        Some(v) => {
                            if flag == Flag::Seed {
                                parsed.seed = Some(seed_from_f32(v));
                            } else {
                                parsed.exponent = Some(v);
                            }
                            parsed.insert_flag(flag);
                            i += 1;
                        }
                        None => errors.push(ArgError::MissingFlagValue(s.clone())),
                    },
                    Some(flag) => parsed.insert_flag(flag),
                    None => errors.push(ArgError::UnknownFlag(s.clone())),
                },
                Atom::Symbol(s) => {
                    if parsed.shape.is_none() && parsed.floats.is_empty() {
                        parsed.shape = Some(s.clone());
                    } else {
                        errors.push(ArgError::UnexpectedSymbol {
                            position: i,
                            symbol: s.clone(),
                        });
                    }
                }
            }
            i += 1;
        }

        (parsed, errors)
    }

    /// Classify an atom list, failing on the first problem.
    pub fn parse_strict(atoms: &[Atom]) -> Result<Self, ArgError> {
        let (parsed, mut errors) = Self::parse(atoms);
        if errors.is_empty() {
            Ok(parsed)
        } else {
            Err(errors.swap_remove(0))
        }
    }

    /// Returns `true` if `flag` was given.
    pub fn has(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    fn insert_flag(&mut self, flag: Flag) {
        if !self.has(flag) {
            self.flags.push(flag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atoms_from_text() {
        let atoms = parse_atoms("  tri 220\t0.25  -soft ");
        assert_eq!(
            atoms,
            vec![
                Atom::from("tri"),
                Atom::Float(220.0),
                Atom::Float(0.25),
                Atom::from("-soft")
            ]
        );
        assert!(parse_atoms("").is_empty());
    }

    #[test]
    fn negative_numbers_are_floats() {
        assert_eq!(Atom::parse("-3"), Atom::Float(-3.0));
        assert_eq!(Atom::parse("1e3"), Atom::Float(1000.0));
        assert_eq!(Atom::parse("nan"), Atom::from("nan"));
        assert_eq!(Atom::parse("inf"), Atom::from("inf"));
    }

    #[test]
    fn flags_anywhere() {
        let (args, errors) = ParsedArgs::parse(&parse_atoms("-midi saw 60 -soft 0.3"));
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(args.flags, vec![Flag::Midi, Flag::Soft]);
        assert_eq!(args.shape.as_deref(), Some("saw"));
        assert_eq!(args.floats, vec![60.0, 0.3]);
    }

    #[test]
    fn seed_consumes_its_value() {
        let (args, errors) = ParsedArgs::parse(&parse_atoms("-seed 7 20"));
        assert!(errors.is_empty());
        assert_eq!(args.seed, Some(seed_from_f32(7.0)));
        assert_eq!(args.floats, vec![20.0]);
        assert!(args.has(Flag::Seed));
    }

    #[test]
    fn seed_without_value() {
        let (args, errors) = ParsedArgs::parse(&parse_atoms("20 -seed"));
        assert_eq!(errors, vec![ArgError::MissingFlagValue("-seed".to_string())]);
        assert_eq!(args.seed, None);
        assert_eq!(args.floats, vec![20.0]);

        // the symbol is not consumed
        let (args, errors) = ParsedArgs::parse(&parse_atoms("-seed foo"));
        assert_eq!(errors.len(), 1);
        assert_eq!(args.shape.as_deref(), Some("foo"));
    }

    #[test]
    fn lenient_parse_keeps_going() {
        let (args, errors) = ParsedArgs::parse(&parse_atoms("1000 -wobble 2 junk 3"));
        assert_eq!(args.floats, vec![1000.0, 2.0, 3.0]);
        assert_eq!(
            errors,
            vec![
                ArgError::UnknownFlag("-wobble".to_string()),
                ArgError::UnexpectedSymbol {
                    position: 3,
                    symbol: "junk".to_string()
                },
            ]
        );
    }

    #[test]
    fn strict_parse_reports_first_problem() {
        let err = ParsedArgs::parse_strict(&parse_atoms("-x 1 y")).unwrap_err();
        assert_eq!(err, ArgError::UnknownFlag("-x".to_string()));
        assert!(ParsedArgs::parse_strict(&parse_atoms("saw 1 2")).is_ok());
    }

    #[test]
    fn duplicate_flags_collapse() {
        let (args, _) = ParsedArgs::parse(&parse_atoms("-log -log"));
        assert_eq!(args.flags, vec![Flag::Log]);
    }

    #[test]
    fn exponent_flag() {
        let (args, errors) = ParsedArgs::parse(&parse_atoms("-exp 2.5 10 40"));
        assert!(errors.is_empty());
        assert_eq!(args.exponent, Some(2.5));
        assert_eq!(args.floats, vec![10.0, 40.0]);
        assert!(args.has(Flag::Exp));
    }

    #[test]
    fn flag_names_round_trip() {
        for flag in Flag::ALL {
            assert_eq!(Flag::from_name(flag.name()), Some(flag));
        }
        assert_eq!(Flag::from_name("midi"), None);
    }
}
