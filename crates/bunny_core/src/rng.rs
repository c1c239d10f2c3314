//! Fast per-frame random source
//!
//! The floor-bounce jitter runs up to once per body per frame, so it uses a
//! 32-bit xorshift instead of the general-purpose `rand` generator used for
//! initialization. State is owned by whoever advances the simulation; there is
//! no process-wide seed.

use crate::constants::JITTER_SEED;

/// Xorshift generator with the classic 13/17/5 shift triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    /// A zero seed would lock the generator at zero, so it is replaced with
    /// [`JITTER_SEED`].
    pub fn new(seed: u32) -> Self {
        let state = if seed == 0 { JITTER_SEED } else { seed };
        Self { state }
    }

    /// Independent stream for `stream`, derived from `seed` with a
    /// splitmix64 finalizer.
    pub fn derive(seed: u32, stream: u64) -> Self {
        let mut z = ((seed as u64) << 32 | seed as u64) ^ stream.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        Self::new((z ^ (z >> 32)) as u32)
    }

    pub fn state(&self) -> u32 {
        self.state
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform sample in `[0, 1]`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() as f64 / u32::MAX as f64) as f32
    }
}

impl Default for XorShift32 {
    fn default() -> Self {
        Self::new(JITTER_SEED)
    }
}
