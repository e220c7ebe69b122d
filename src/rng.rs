//! Vectorized counter state for stochastic kernels.
//!
//! Sixteen independent xoshiro128+ streams stored lane-interleaved
//! (`state[lane + word * 16]`), matching the batch layout stochastic
//! kernels consume: one draw per lane per batch. Uniform floats come
//! from the exponent trick (mantissa bits under a fixed 1.0 exponent),
//! so every draw lies in [0, 1).

/// Number of interleaved generator lanes.
pub const RNG_LANES: usize = 16;

/// Caller-owned state for the lane-interleaved generator.
///
/// The state is plain data: embedders may persist and restore it
/// between kernel invocations. All draws mutate it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RngState {
    s: [u32; 4 * RNG_LANES],
}

// splitmix-style scrambler used only to expand the seed.
fn seed_next(x: &mut u32) -> u32 {
    *x = x.wrapping_add(0x9e37_79b9);
    let mut z = *x;
    z = (z ^ (z >> 16)).wrapping_mul(0x21f0_aaad);
    z = (z ^ (z >> 15)).wrapping_mul(0x735a_2d97);
    z ^ (z >> 15)
}

impl RngState {
    /// Deterministically expand `seed` into 16 independent lane states.
    pub fn new(seed: u32) -> Self {
        let mut x = seed;
        let mut s = [0u32; 4 * RNG_LANES];
        for word in s.iter_mut() {
            *word = seed_next(&mut x);
        }
        // xoshiro degenerates on an all-zero lane; nudge if it happens.
        for lane in 0..RNG_LANES {
            let zero = (0..4).all(|w| s[lane + w * RNG_LANES] == 0);
            if zero {
                s[lane] = lane as u32 + 1;
            }
        }
        RngState { s }
    }

    /// Draw one uniform float in [0, 1) from each of the first
    /// `out.len()` lanes, advancing only those lanes.
    ///
    /// `out.len()` must not exceed [`RNG_LANES`].
    pub fn fill_uniform(&mut self, out: &mut [f32]) {
        debug_assert!(out.len() <= RNG_LANES);
        for (lane, slot) in out.iter_mut().enumerate() {
            let s0 = self.s[lane];
            let s1 = self.s[lane + RNG_LANES];
            let s2 = self.s[lane + 2 * RNG_LANES];
            let s3 = self.s[lane + 3 * RNG_LANES];

            let mantissa = s3.wrapping_add(s0) >> 9;
            *slot = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;

            let t = s1 << 9;
            let s2 = s2 ^ s0;
            let s3 = s3 ^ s1;
            let s1 = s1 ^ s2;
            let s0 = s0 ^ s3;
            let s2 = s2 ^ t;
            let s3 = s3.rotate_left(11);

            self.s[lane] = s0;
            self.s[lane + RNG_LANES] = s1;
            self.s[lane + 2 * RNG_LANES] = s2;
            self.s[lane + 3 * RNG_LANES] = s3;
        }
    }

    /// Raw view of the interleaved state words.
    pub fn as_words(&self) -> &[u32] {
        &self.s
    }
}
