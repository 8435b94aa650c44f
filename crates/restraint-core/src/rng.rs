use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha12Rng;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Resolve a possibly-negative seed request into a concrete seed.
///
/// Negative values ask for a fresh seed drawn from OS entropy.
pub fn resolve_seed(requested: i64) -> u64 {
    if requested < 0 {
        rand::rng().random()
    } else {
        requested as u64
    }
}
