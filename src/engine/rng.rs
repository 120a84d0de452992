//! Random source - single sampling interface for the whole engine
//!
//! Every stochastic draw (stat generation, events, pack balancing) goes
//! through `RandomSource`, so a race can be replayed from a seed and tests
//! can script exact draw sequences.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform sampling interface used by every engine component.
pub trait RandomSource {
    /// Draw uniformly from [0, 1).
    fn unit(&mut self) -> f64;

    /// Draw uniformly from [lo, hi).
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.unit() * (hi - lo)
    }

    /// Bernoulli draw with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    /// Integer draw from [lo, hi], both ends inclusive.
    fn range_int(&mut self, lo: i32, hi: i32) -> i32 {
        lo + (self.unit() * (hi - lo + 1) as f64) as i32
    }
}

/// Default source backed by `StdRng`.
pub struct SeededSource {
    rng: StdRng,
}

impl SeededSource {
    /// Reproducible source for replays and tests.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// OS-entropy source for normal operation.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededSource {
    fn unit(&mut self) -> f64 {
        self.rng.gen()
    }
}
