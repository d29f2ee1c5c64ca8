//! Injectable random sources for particle initialization.
//!
//! Particle sets are seeded through the [`RandomSource`] trait so tests and
//! replays can substitute a deterministic generator. [`Xorshift64`] is the
//! default: pure integer arithmetic, so a seed yields the same trajectory on
//! every platform.

use serde::{Deserialize, Serialize};

/// A source of uniformly distributed values in [0, 1).
pub trait RandomSource {
    /// Returns the next value in [0, 1).
    fn next_f64(&mut self) -> f64;

    /// Returns a value in [min, max). Returns `min` when the range is empty.
    fn next_range(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        min + self.next_f64() * (max - min)
    }

    /// Returns a value in [-half, half).
    fn next_symmetric(&mut self, half: f64) -> f64 {
        self.next_range(-half, half)
    }
}

/// Xorshift64 PRNG with shifts (13, 7, 17).
///
/// A seed of 0 is a fixed point of the algorithm and is replaced with a
/// non-zero fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    const FALLBACK_SEED: u64 = 0x5EED_DEAD_BEEF_CAFE;

    /// Creates a generator from `seed` (0 maps to the fallback seed).
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { Self::FALLBACK_SEED } else { seed },
        }
    }

    /// Advances the state and returns the next 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }
}

impl RandomSource for Xorshift64 {
    /// Upper 53 bits of `next_u64()` over 2^53, so every mantissa bit is used.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Replays a fixed list of values, cycling when exhausted.
///
/// Useful for pinning particle attributes in tests without reverse
/// engineering a PRNG seed.
#[derive(Debug, Clone)]
pub struct CyclicSource {
    values: Vec<f64>,
    cursor: usize,
}

impl CyclicSource {
    /// Creates a source from `values`, each clamped into [0, 1).
    ///
    /// An empty list behaves as a constant 0.
    pub fn new(values: Vec<f64>) -> Self {
        let values = values
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0 - f64::EPSILON) })
            .collect();
        Self { values, cursor: 0 }
    }
}

impl RandomSource for CyclicSource {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_u64_produces_known_golden_value_for_seed_42() {
        // Replays recorded with seed 42 depend on this exact value.
        let mut rng = Xorshift64::new(42);
        assert_eq!(rng.next_u64(), 45_454_805_674);
    }

    #[test]
    fn seed_zero_does_not_produce_all_zeros() {
        let mut rng = Xorshift64::new(0);
        assert_ne!(rng.next_u64(), 0, "seed=0 guard failed");
        assert_ne!(rng.next_u64(), 0);
    }

    #[test]
    fn two_instances_with_same_seed_produce_identical_sequences() {
        let mut a = Xorshift64::new(42);
        let mut b = Xorshift64::new(42);
        for i in 0..1000 {
            assert_eq!(
                a.next_f64().to_bits(),
                b.next_f64().to_bits(),
                "sequences diverged at index {i}"
            );
        }
    }

    #[test]
    fn next_symmetric_stays_within_half_range() {
        let mut rng = Xorshift64::new(9999);
        for _ in 0..10_000 {
            let v = rng.next_symmetric(1.0);
            assert!((-1.0..1.0).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn empty_range_returns_min() {
        let mut rng = Xorshift64::new(1);
        assert_eq!(rng.next_range(5.0, 5.0), 5.0);
        assert_eq!(rng.next_range(5.0, 2.0), 5.0);
    }

    #[test]
    fn cyclic_source_repeats_values() {
        let mut src = CyclicSource::new(vec![0.25, 0.5]);
        assert_eq!(src.next_f64(), 0.25);
        assert_eq!(src.next_f64(), 0.5);
        assert_eq!(src.next_f64(), 0.25);
    }

    #[test]
    fn cyclic_source_clamps_into_unit_interval() {
        let mut src = CyclicSource::new(vec![1.5, -2.0, f64::NAN]);
        assert!(src.next_f64() < 1.0);
        assert_eq!(src.next_f64(), 0.0);
        assert_eq!(src.next_f64(), 0.0);
    }

    #[test]
    fn empty_cyclic_source_yields_zero() {
        let mut src = CyclicSource::new(Vec::new());
        assert_eq!(src.next_f64(), 0.0);
    }

    #[test]
    fn serialization_roundtrip_preserves_state() {
        let mut rng = Xorshift64::new(42);
        for _ in 0..50 {
            rng.next_u64();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: Xorshift64 = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next_u64(), restored.next_u64());
        }
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn next_f64_in_unit_interval_for_any_seed(seed: u64) {
                let mut rng = Xorshift64::new(seed);
                for _ in 0..100 {
                    let v = rng.next_f64();
                    prop_assert!((0.0..1.0).contains(&v), "next_f64() = {v} for seed {seed}");
                }
            }

            #[test]
            fn next_range_in_bounds_for_any_seed_and_range(
                seed: u64,
                min in -1e3_f64..1e3,
                span in 1.0_f64..1e3,
            ) {
                let max = min + span;
                let mut rng = Xorshift64::new(seed);
                for _ in 0..100 {
                    let v = rng.next_range(min, max);
                    prop_assert!(v >= min && v < max, "next_range({min}, {max}) = {v}");
                }
            }
        }
    }
}
