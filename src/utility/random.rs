use rand::Rng;
use rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// A deterministic random number generator for `seed`.
pub fn rng_from_seed(seed: u64) -> Xoshiro256PlusPlus {
    // Xoshiro256PlusPlus is not ideal when a seed with many zeros is used, but
    // 'seed_from_u64()' uses SplitMix64 to derive the actual seed, so we are okay here
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

/// Draw one seed per run from a generator seeded with `master_seed`. The seeds only depend on
/// `master_seed`, so runs can be executed in any order or on any thread.
pub fn run_seeds(master_seed: u64, runs: u32) -> Vec<u64> {
    let mut random = rng_from_seed(master_seed);
    (0..runs).map(|_| random.gen()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_seeds() {
        assert_eq!(run_seeds(1, 5), run_seeds(1, 5));
        assert_ne!(run_seeds(1, 5), run_seeds(2, 5));
        // a shorter sweep is a prefix of a longer one
        assert_eq!(run_seeds(1, 3)[..], run_seeds(1, 5)[..3]);
        assert!(run_seeds(1, 0).is_empty());
    }

    #[test]
    fn test_rng_from_seed() {
        let sample = |seed| {
            let mut random = rng_from_seed(seed);
            (0..4).map(|_| random.gen::<u32>()).collect::<Vec<_>>()
        };
        assert_eq!(sample(9), sample(9));
        assert_ne!(sample(9), sample(10));
    }
}
