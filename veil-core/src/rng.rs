//! Injectable randomness for outcome resolution.
//!
//! Every probabilistic draw in the engine goes through [`RandomSource`] so
//! callers and tests control determinism. The engine never touches a global
//! seed itself.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// An abstract source of randomness.
///
/// Object-safe so resolvers can hold `&mut dyn RandomSource`.
pub trait RandomSource {
    /// Draw a uniform value in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Draw a uniform index in `0..len`. `len` must be nonzero.
    fn pick_index(&mut self, len: usize) -> usize;
}

/// Adapter exposing any [`rand::Rng`] as a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R: Rng>(R);

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform(&mut self) -> f64 {
        self.0.gen::<f64>()
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

/// A source backed by the thread-local RNG.
pub fn thread_source() -> RngSource<rand::rngs::ThreadRng> {
    RngSource::new(rand::thread_rng())
}

/// A deterministic source seeded from a fixed value (useful for testing
/// and replayable sessions).
pub fn seeded_source(seed: u64) -> RngSource<StdRng> {
    RngSource::new(StdRng::seed_from_u64(seed))
}
