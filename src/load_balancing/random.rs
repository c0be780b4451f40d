//! Shared random number generator for the weighted draw.
//!
//! One `RandomSource` is created explicitly and handed to the selection strategy
//! rather than living in process-wide state. Draws from concurrent `choose()` calls
//! are serialized on the generator's own mutex, independent of any server set lock.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{SystemTime, UNIX_EPOCH};

/// Mutex-guarded uniform random generator
#[derive(Debug)]
pub struct RandomSource {
    rng: Mutex<StdRng>,
}

impl RandomSource {
    /// Create a generator seeded from the current time
    pub fn new() -> Self {
        Self::with_seed(time_seed())
    }

    /// Create a generator with a fixed seed, for reproducible sequences
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Restart the sequence from `seed`
    pub fn reseed(&self, seed: u64) {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
    }

    /// Uniform integer in `[0, max]`, both ends included
    pub fn gen_inclusive(&self, max: u64) -> u64 {
        self.rng.lock().gen_range(0..=max)
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
