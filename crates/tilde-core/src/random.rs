//! Seedable three-register xorshift generator.
//!
//! A Tausworthe-style combined generator: three 32-bit registers, each with
//! its own shift/mask recurrence, XORed together for the output word. Small
//! human-chosen seeds are scrambled with Thomas Wang's integer hash before
//! they touch the registers.
//!
//! Every generator owns its own [`XorShift`]; nothing here is global. Default
//! seeds for unseeded instances come from a [`SeedSource`] the caller passes
//! around explicitly.

const S1_INIT: u32 = 1_243_598_713;
const S2_INIT: u32 = 3_093_459_404;
const S3_INIT: u32 = 1_821_928_721;

/// Smallest legal value of each register. Below these the recurrence
/// collapses to a short cycle.
pub const REGISTER_MINIMUMS: (u32, u32, u32) = (2, 8, 16);

/// Thomas Wang's 32-bit integer hash.
#[inline]
pub fn wang_hash(seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(!(h << 15));
    h ^= h >> 10;
    h = h.wrapping_add(h << 3);
    h ^= h >> 6;
    h = h.wrapping_add(!(h << 11));
    h ^= h >> 16;
    h
}

/// Convert a float seed (as typed into a creation argument) to the integer
/// seed the engine uses. The value is truncated toward zero; out-of-range
/// values saturate and NaN gives 0.
///
/// Seeds are whole numbers: `0.3` and `0.7` both become `0` and produce the
/// same stream, the same way a number box truncates a float sent to an
/// integer inlet.
#[inline]
pub fn seed_from_f32(seed: f32) -> u32 {
    (seed as i32) as u32
}

/// Three-register xorshift engine.
///
/// # Example
///
/// ```rust
/// use tilde_core::XorShift;
///
/// let mut a = XorShift::new(42);
/// let mut b = XorShift::new(42);
/// for _ in 0..16 {
///     assert_eq!(a.next_f32().to_bits(), b.next_f32().to_bits());
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorShift {
    s1: u32,
    s2: u32,
    s3: u32,
}

impl XorShift {
    /// Create an engine from an integer seed.
    pub fn new(seed: u32) -> Self {
        let mut rng = Self { s1: 0, s2: 0, s3: 0 };
        rng.set_seed(seed);
        rng
    }

    /// Reseed. The stream restarts deterministically.
    pub fn set_seed(&mut self, seed: u32) {
        let seed = wang_hash(seed);
        let (m1, m2, m3) = REGISTER_MINIMUMS;
        self.s1 = clamp_register(S1_INIT ^ seed, m1, S1_INIT);
        self.s2 = clamp_register(S2_INIT ^ seed, m2, S2_INIT);
        self.s3 = clamp_register(S3_INIT ^ seed, m3, S3_INIT);
    }

    /// Register contents `(s1, s2, s3)`.
    pub fn state(&self) -> (u32, u32, u32) {
        (self.s1, self.s2, self.s3)
    }

    /// Next raw 32-bit word.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.s1 = ((self.s1 & 0xFFFF_FFFE) << 12) ^ (((self.s1 << 13) ^ self.s1) >> 19);
        self.s2 = ((self.s2 & 0xFFFF_FFF8) << 4) ^ (((self.s2 << 2) ^ self.s2) >> 25);
        self.s3 = ((self.s3 & 0xFFFF_FFF0) << 17) ^ (((self.s3 << 3) ^ self.s3) >> 11);
        self.s1 ^ self.s2 ^ self.s3
    }

    /// Uniform float in `[-1, 1)`.
    ///
    /// The top 23 bits become the mantissa of a float in `[2, 4)`, then 3 is
    /// subtracted.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        f32::from_bits(0x4000_0000 | (self.next_u32() >> 9)) - 3.0
    }

    /// Uniform float in `[0, 1)`.
    #[inline]
    pub fn next_unipolar(&mut self) -> f32 {
        f32::from_bits(0x3F80_0000 | (self.next_u32() >> 9)) - 1.0
    }
}

impl Default for XorShift {
    fn default() -> Self {
        Self::new(0)
    }
}

#[inline]
fn clamp_register(value: u32, minimum: u32, fallback: u32) -> u32 {
    if value < minimum { fallback } else { value }
}

/// Hands out distinct default seeds to unseeded generators.
///
/// Owned by whoever constructs kernels (normally the registry), so two
/// sources with the same base produce the same seed sequence.
#[derive(Debug, Clone)]
pub struct SeedSource {
    base: u32,
    issued: u32,
}

impl SeedSource {
    /// Source with a fixed base value.
    pub fn new(base: u32) -> Self {
        Self { base, issued: 0 }
    }

    /// Source based on the wall clock.
    #[cfg(feature = "std")]
    pub fn from_time() -> Self {
        let secs = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self::new(secs as u32)
    }

    /// Seed for the next instance. Every call returns a different value.
    pub fn next_default_seed(&mut self) -> u32 {
        self.issued = self.issued.wrapping_add(1);
        self.base.wrapping_add(self.issued.wrapping_mul(0x9E37_79B9))
    }

    /// Number of seeds issued so far.
    pub fn issued(&self) -> u32 {
        self.issued
    }
}

impl Default for SeedSource {
    fn default() -> Self {
        Self::new(0)
    }
}
