// crates/em_core/src/rng.rs
//
// Deterministic, integer-only RNG used by capacity redistribution.
// Focus: unbiased range generation, stable seeding, reproducible shuffles.
//
// • `shuffle_seed` is the only source of randomness in a run; no OS entropy.
// • Integer-only RNG: no floating point. Unbiased ranges via rejection sampling.
// • Cross-platform determinism: explicit seeding and word-count accounting.

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Deterministic RNG seeded from `Params::shuffle_seed`.
///
/// Internally uses ChaCha20 with an explicit 32-byte seed derived from the
/// 64-bit seed (little-endian bytes in the first 8 positions; the rest 0).
/// This avoids endianness ambiguity and keeps mapping stable across platforms.
#[derive(Debug, Clone)]
pub struct ShuffleRng {
    rng: ChaCha20Rng,
    words_consumed: u128,
}

impl ShuffleRng {
    /// Construct from a 64-bit seed: `seed.to_le_bytes()` into the first
    /// 8 bytes of the ChaCha20 seed; the remaining 24 bytes are zero.
    #[inline]
    pub fn from_seed_u64(seed: u64) -> Self {
        let mut seed32 = [0u8; 32];
        seed32[..8].copy_from_slice(&seed.to_le_bytes());
        Self {
            rng: ChaCha20Rng::from_seed(seed32),
            words_consumed: 0,
        }
    }

    /// Total number of 64-bit words drawn so far (saturating).
    #[inline]
    pub fn words_consumed(&self) -> u128 {
        self.words_consumed
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.words_consumed = self.words_consumed.saturating_add(1);
        self.rng.next_u64()
    }

    /// Unbiased integer in [0, n) using the PCG threshold trick.
    /// Returns `None` if `n == 0`.
    #[inline]
    pub fn gen_range(&mut self, n: u64) -> Option<u64> {
        if n == 0 {
            return None;
        }
        let threshold = n.wrapping_neg() % n; // == (2^64 % n)
        loop {
            let x = self.next_u64();
            if x >= threshold {
                return Some(x % n);
            }
        }
    }

    /// Deterministic in-place Fisher–Yates shuffle.
    ///
    /// for i in (1..len).rev() { j ~ U{0..=i}; swap(i, j) }
    pub fn shuffle_in_place<T>(&mut self, slice: &mut [T]) {
        let len = slice.len();
        if len <= 1 {
            return;
        }
        for i in (1..len).rev() {
            // i + 1 > 0, so the range is never empty.
            let j = self.gen_range((i as u64) + 1).unwrap_or(0) as usize;
            slice.swap(i, j);
        }
    }
}

impl Default for ShuffleRng {
    fn default() -> Self {
        Self::from_seed_u64(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn gen_range_zero_none() {
        let mut rng = ShuffleRng::from_seed_u64(0xDEADBEEFCAFEBABE);
        assert_eq!(rng.gen_range(0), None);
        assert_eq!(rng.words_consumed(), 0);
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = ShuffleRng::from_seed_u64(123456789);
        let mut b = ShuffleRng::from_seed_u64(123456789);
        for _ in 0..16 {
            assert_eq!(a.gen_range(10), b.gen_range(10));
        }
        assert_eq!(a.words_consumed(), b.words_consumed());
    }

    #[test]
    fn shuffle_is_deterministic_permutation() {
        let mut a = ShuffleRng::from_seed_u64(42);
        let mut b = ShuffleRng::from_seed_u64(42);
        let mut xs = (0..9).collect::<Vec<_>>();
        let mut ys = (0..9).collect::<Vec<_>>();
        a.shuffle_in_place(&mut xs);
        b.shuffle_in_place(&mut ys);
        assert_eq!(xs, ys);

        let mut sorted = xs.clone();
        sorted.sort();
        assert_eq!(sorted, (0..9).collect::<Vec<_>>());
    }

    #[test]
    fn shuffle_short_slices_untouched() {
        let mut rng = ShuffleRng::default();
        let mut empty: [u8; 0] = [];
        rng.shuffle_in_place(&mut empty);
        let mut one = [7u8];
        rng.shuffle_in_place(&mut one);
        assert_eq!(one, [7]);
        assert_eq!(rng.words_consumed(), 0);
    }

    proptest! {
        #[test]
        fn gen_range_stays_below_bound(seed in any::<u64>(), n in 1u64..=u64::MAX) {
            let mut rng = ShuffleRng::from_seed_u64(seed);
            for _ in 0..8 {
                let x = rng.gen_range(n).unwrap();
                prop_assert!(x < n);
            }
            prop_assert!(rng.words_consumed() >= 8);
        }

        #[test]
        fn shuffle_keeps_every_element(
            seed in any::<u64>(),
            xs in proptest::collection::vec(any::<u16>(), 0..64),
        ) {
            let mut shuffled = xs.clone();
            ShuffleRng::from_seed_u64(seed).shuffle_in_place(&mut shuffled);
            let mut a = xs;
            a.sort_unstable();
            shuffled.sort_unstable();
            prop_assert_eq!(a, shuffled);
        }
    }
}
