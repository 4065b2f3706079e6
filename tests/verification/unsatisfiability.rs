//! Exhaustive checks that the seeds, and disguises of them, have no small solutions.
//!
//! ## Seeds
//!
//! For `D = k^2`, a solution of `x^2 - D*y^2 = 1` with `y >= 1` needs `1 + D*y^2`
//! to be a perfect square. Scanning `y = 1..=10_000` with an integer square root
//! covers every `(x, y)` with `y <= 10_000` (and so every `x <= 10_000`, since
//! `x > k*y`).
//!
//! ## Disguises
//!
//! For a fixed matrix, every `(u, v)` in a box is checked against the full
//! disguised conjunction. None may satisfy it.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use opaque_pell::expr::all_hold;
use opaque_pell::{
    disguise_with, pell_seeds, GeneratorMode, PellSeed, QuadraticForm, TransformMatrix,
};

const Y_BOUND: i128 = 10_000;

/// Floor square root of a non-negative `i128`.
fn isqrt(n: i128) -> i128 {
    assert!(n >= 0);
    let mut r = (n as f64).sqrt() as i128;
    while r * r > n {
        r -= 1;
    }
    while (r + 1) * (r + 1) <= n {
        r += 1;
    }
    r
}

#[test]
fn test_isqrt_helper() {
    for n in 0..2000i128 {
        let r = isqrt(n);
        assert!(r * r <= n && (r + 1) * (r + 1) > n, "isqrt({}) = {}", n, r);
    }
}

fn assert_seed_has_no_solution_in_box(root: i64) {
    let seed = PellSeed::from_root(root).unwrap();
    let d = i128::from(seed.d());
    for y in 1..=Y_BOUND {
        let target = 1 + d * y * y;
        let x = isqrt(target);
        assert_ne!(
            x * x,
            target,
            "x={} y={} solves x^2 - {}*y^2 == 1",
            x,
            y,
            d
        );
    }
}

macro_rules! seed_box_tests {
    ($($root:literal),* $(,)?) => {
        $(
            pastey::paste! {
                #[test]
                fn [<test_seed_root_ $root _has_no_solution_in_box>]() {
                    assert_seed_has_no_solution_in_box($root);
                }
            }
        )*
    };
}

seed_box_tests!(1, 2, 3, 4, 5, 6, 7);

#[test]
fn test_complete_mode_covers_every_boxed_root() {
    let roots: Vec<i64> = pell_seeds(GeneratorMode::Complete).map(|s| s.root()).collect();
    assert_eq!(roots, (1..=7).collect::<Vec<_>>());
}

#[test]
fn test_only_trivial_solution_without_domain() {
    // Dropping y > 0 leaves (±1, 0) for every D.
    for seed in pell_seeds(GeneratorMode::Complete) {
        assert_eq!(seed.pell_value(1, 0), Some(1));
        assert_eq!(seed.pell_value(-1, 0), Some(1));
        let (x, y) = seed.vars();
        assert_eq!(all_hold(seed.constraints(), &[(x, 1), (y, 0)]), Some(false));
    }
}

#[test]
fn test_disguises_have_no_solution_in_box() {
    let matrices = [
        TransformMatrix::identity(),
        TransformMatrix::new(2, -3, 1, 5).unwrap(),
        TransformMatrix::new(-7, 4, 3, -2).unwrap(),
        TransformMatrix::new(10, 10, -10, 9).unwrap(),
    ];
    for seed in pell_seeds(GeneratorMode::Complete) {
        for matrix in matrices {
            let disguised = disguise_with(&seed, matrix);
            let (u, v) = disguised.vars();
            let constraints = disguised.constraints();
            let form = disguised.expanded().unwrap();
            for uv in -60i128..=60 {
                for vv in -60i128..=60 {
                    assert_eq!(
                        all_hold(&constraints, &[(u, uv), (v, vv)]),
                        Some(false),
                        "({}, {}) satisfies {}",
                        uv,
                        vv,
                        disguised
                    );
                    // The expanded form agrees with the product form everywhere.
                    let product = disguised.equation().holds(&[(u, uv), (v, vv)]);
                    assert_eq!(product, Some(form.evaluate(uv, vv) == Some(1)));
                }
            }
        }
    }
}

#[test]
fn test_identity_disguise_equation_alone_is_satisfiable() {
    // u^2 - v^2 == 1 at (1, 0); the domain constraints are what rule it out.
    let seed = PellSeed::new(1).unwrap();
    let form = QuadraticForm::expand(seed.d(), &TransformMatrix::identity()).unwrap();
    assert_eq!(form.evaluate(1, 0), Some(1));
    assert_eq!(form.evaluate(-1, 0), Some(1));
}
