//! Property-based tests for seeds, the disguise transform and the sampler.
//!
//! # Properties Tested
//!
//! - Substitution soundness: every disguised constraint holds at `(u, v)` exactly
//!   when the matching seed constraint holds at `M(u, v)`, so a solution of the
//!   disguise would be a solution of the seed
//! - Expansion identity: the expanded form evaluates like the product form
//! - Determinism: the same seed and matrix give the same text, expansion and
//!   fingerprint
//! - Sampling: seeded samplers reproduce, and every sample is in range and invertible

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use opaque_pell::expr::Var;
use opaque_pell::rng::{Pcg32, SeedableRng};
use opaque_pell::{
    disguise_with, pell_seeds, DisguiseTransformer, EntryRange, GeneratorMode, MatrixSampler,
    PellSeed, TransformMatrix,
};
use proptest::prelude::*;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Invertible matrices with entries in the default range
fn matrix_strategy() -> impl Strategy<Value = TransformMatrix> {
    (-10i64..=10, -10i64..=10, -10i64..=10, -10i64..=10)
        .prop_filter_map("singular", |(a, b, c, d)| TransformMatrix::new(a, b, c, d).ok())
}

/// Seeds from the complete set
fn seed_strategy() -> impl Strategy<Value = PellSeed> {
    (1i64..=7).prop_map(|k| PellSeed::from_root(k).unwrap())
}

/// Entry ranges with at least two values, which always admit an invertible matrix
fn range_strategy() -> impl Strategy<Value = EntryRange> {
    (-20i64..=20, 1i64..=20).prop_map(|(min, width)| EntryRange::new(min, min + width).unwrap())
}

fn lookup<'a>(bindings: &'a [(&'a Var, i128)]) -> impl Fn(&Var) -> Option<i128> + 'a {
    move |var: &Var| {
        bindings
            .iter()
            .find(|(bound, _)| *bound == var)
            .map(|(_, value)| *value)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Property: substitution maps disguise solutions to seed solutions.
    #[test]
    fn prop_substitution_soundness(
        seed in seed_strategy(),
        matrix in matrix_strategy(),
        u in -500i128..=500,
        v in -500i128..=500,
    ) {
        let disguised = disguise_with(&seed, matrix);
        let (uvar, vvar) = disguised.vars();
        let (xvar, yvar) = seed.vars();
        let (x, y) = matrix.apply(u, v).unwrap();

        let uv = [(uvar, u), (vvar, v)];
        let xy = [(xvar, x), (yvar, y)];
        let disguise_lookup = lookup(&uv);
        let seed_lookup = lookup(&xy);

        for (dc, sc) in disguised.constraints().iter().zip(seed.constraints()) {
            prop_assert_eq!(dc.eval(&disguise_lookup), sc.eval(&seed_lookup));
        }
        // The seed has no solutions, so neither does the disguise
        let all = disguised
            .constraints()
            .iter()
            .all(|c| c.eval(&disguise_lookup) == Some(true));
        prop_assert!(!all);
    }

    /// Property: the expanded form equals the product form pointwise.
    #[test]
    fn prop_expansion_identity(
        seed in seed_strategy(),
        matrix in matrix_strategy(),
        u in -10_000i128..=10_000,
        v in -10_000i128..=10_000,
    ) {
        let disguised = disguise_with(&seed, matrix);
        let form = disguised.expanded().unwrap();
        let (uvar, vvar) = disguised.vars();
        let bindings = [(uvar, u), (vvar, v)];
        let product = disguised.equation().lhs.eval(&lookup(&bindings));
        prop_assert_eq!(product, form.evaluate(u, v));
    }

    /// Property: the transform is a pure function of (D, matrix).
    #[test]
    fn prop_disguise_deterministic(seed in seed_strategy(), matrix in matrix_strategy()) {
        let again = PellSeed::new(seed.d()).unwrap();
        let first = disguise_with(&seed, matrix);
        let second = disguise_with(&again, matrix);
        prop_assert_eq!(first.description(), second.description());
        prop_assert_eq!(first.expanded().unwrap(), second.expanded().unwrap());
        prop_assert_eq!(first.fingerprint(), second.fingerprint());
        prop_assert_eq!(
            first.expanded().unwrap().to_string(),
            second.expanded().unwrap().to_string()
        );
    }

    /// Property: samples are in range, invertible and reproducible from a seed.
    #[test]
    fn prop_sampler_in_range_and_reproducible(range in range_strategy(), rng_seed in any::<u64>()) {
        let sampler = MatrixSampler::new(range).unwrap();
        let mut rng1 = Pcg32::seed_from_u64(rng_seed);
        let mut rng2 = Pcg32::seed_from_u64(rng_seed);
        for _ in 0..8 {
            let m1 = sampler.sample(&mut rng1).unwrap();
            let m2 = sampler.sample(&mut rng2).unwrap();
            prop_assert_eq!(m1, m2);
            prop_assert_ne!(m1.determinant(), 0);
            let (a, b, c, d) = m1.entries();
            for entry in [a, b, c, d] {
                prop_assert!(range.as_range().contains(&entry));
            }
        }
    }

    /// Property: a transformer never returns a singular matrix.
    #[test]
    fn prop_transformer_disguises_invertibly(seed in seed_strategy(), rng_seed in any::<u64>()) {
        let mut transformer = DisguiseTransformer::new(Pcg32::seed_from_u64(rng_seed));
        let disguised = transformer.disguise(&seed, None).unwrap();
        prop_assert_ne!(disguised.matrix().determinant(), 0);
        prop_assert_eq!(disguised.d(), seed.d());
        prop_assert_eq!(disguised.constraints().len(), 3);
    }

    /// Property: single-value ranges are rejected up front instead of exhausting.
    #[test]
    fn prop_single_value_range_rejected(k in any::<i64>()) {
        prop_assert!(EntryRange::new(k, k).is_err());
        let range = EntryRange { min: k, max: k };
        prop_assert!(MatrixSampler::new(range).is_err());
    }
}

#[test]
fn test_seed_sets() {
    let simple: Vec<i64> = pell_seeds(GeneratorMode::Simple).map(|s| s.d()).collect();
    assert_eq!(simple, vec![1]);
    let complete: Vec<i64> = pell_seeds(GeneratorMode::Complete).map(|s| s.d()).collect();
    assert_eq!(complete, vec![1, 4, 9, 16, 25, 36, 49]);
}

#[test]
fn test_default_sampler_thousands_of_draws() {
    let sampler = MatrixSampler::default();
    let mut rng = Pcg32::seed_from_u64(0);
    for _ in 0..5000 {
        let m = sampler.sample(&mut rng).unwrap();
        assert_ne!(m.determinant(), 0);
        let (a, b, c, d) = m.entries();
        assert!([a, b, c, d].iter().all(|e| (-10..=10).contains(e)));
    }
}
