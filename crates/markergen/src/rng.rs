//! Randomness seam
//!
//! The processor draws through [`RandomStream`] so tests can script exact
//! outcomes while production code runs a seeded PRNG.

use rand::prelude::*;

/// Source of the processor's random draws
pub trait RandomStream {
    /// Uniform float in [0, 1)
    fn next_float(&mut self) -> f32;

    /// Uniform integer in [0, bound)
    fn next_int(&mut self, bound: usize) -> usize;
}

/// Seeded PRNG-backed stream
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    /// Create a stream from an explicit seed, for reproducible generation
    pub fn seeded(seed: u64) -> Self {
        StdRandom {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomStream for StdRandom {
    fn next_float(&mut self) -> f32 {
        self.rng.random::<f32>()
    }

    fn next_int(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        self.rng.random_range(0..bound)
    }
}

/// Fisher-Yates shuffle driven by a [`RandomStream`]
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn RandomStream) {
    for i in (1..items.len()).rev() {
        let j = rng.next_int(i + 1);
        items.swap(i, j);
    }
}
