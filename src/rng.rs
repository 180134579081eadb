//! Random stream shared by the simulation and its generators.
//!
//! Every stochastic draw goes through one of the helpers below (or a
//! `rand_distr` distribution that consumes a single word), so two runs
//! started from the same seed consume the stream in the same order.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

/// Random stream threaded through the simulation.
pub type SimRng = ChaCha12Rng;

/// Create a deterministic stream from a seed.
pub fn create_rng(seed: u64) -> SimRng {
    SimRng::seed_from_u64(seed)
}

/// Draw a number in `(0, 1]`.
///
/// A probability of `1` always passes `draw <= p` and a probability of `0`
/// never does.
pub fn unit(rng: &mut SimRng) -> f64 {
    1.0 - rng.random::<f64>()
}

/// Draw an index uniformly in `[0, len)`. `len` must be non-zero.
pub fn index(rng: &mut SimRng, len: usize) -> usize {
    let idx = (rng.random::<f64>() * len as f64) as usize;
    idx.min(len - 1)
}
