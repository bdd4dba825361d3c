//! The run-wide random source.

use rand::{Rng, SeedableRng};
use rand_distr::{Binomial, Distribution};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Seedable random number generator shared by every module of a run.
///
/// All draws that influence selection, placement and landscape generation go
/// through one `Random`, so a fixed seed reproduces a run exactly.
#[derive(Debug, Clone)]
pub struct Random {
    rng: Xoshiro256PlusPlus,
    seed: u64,
}

impl Random {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            seed,
        }
    }

    /// Seed from the thread-local entropy source.
    pub fn from_entropy() -> Self {
        Self::new(rand::rng().random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Uniform integer in `[0, max)`. Returns 0 when `max` is 0.
    pub fn get_uint(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        self.rng.random_range(0..max)
    }

    /// Uniform double in `[0, 1)`.
    pub fn get_double(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// Bernoulli trial with success probability `prob`, clamped to `[0, 1]`.
    pub fn p(&mut self, prob: f64) -> bool {
        self.rng.random_bool(prob.clamp(0.0, 1.0))
    }

    /// Number of successes in `trials` independent trials with probability `prob`.
    pub fn binomial(&mut self, trials: usize, prob: f64) -> usize {
        if trials == 0 || prob <= 0.0 {
            return 0;
        }
        match Binomial::new(trials as u64, prob.min(1.0)) {
            Ok(dist) => dist.sample(&mut self.rng) as usize,
            Err(_) => 0,
        }
    }

    /// Derive a fresh seed for an independent stream.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.random()
    }

    pub fn rng_mut(&mut self) -> &mut Xoshiro256PlusPlus {
        &mut self.rng
    }
}
