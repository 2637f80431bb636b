//! Seeded random number generation.
//!
//! Every randomized decision in the core (loyalty trigger, extra lock
//! duration, punishment pick) draws from a caller-provided generator so
//! tests can force determinism with a fixed seed.

use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;

/// Build the core's generator from an optional seed.
///
/// `None` seeds from process entropy; a fixed seed reproduces every
/// randomized decision exactly.
pub fn seeded_rng(seed: Option<u64>) -> Mcg128Xsl64 {
    match seed {
        Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
        None => Mcg128Xsl64::seed_from_u64(rand::random()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn fixed_seed_is_reproducible() {
        let mut a = seeded_rng(Some(7));
        let mut b = seeded_rng(Some(7));
        for _ in 0..16 {
            assert_eq!(a.gen::<u64>(), b.gen::<u64>());
        }
    }
}
