//! Fuzz target for the disguise transform.
//!
//! # Safety Properties Tested
//! - No panics for any matrix or discriminant, including values near `i64::MAX`
//! - Expansion either succeeds or reports `CoefficientOverflow`, never wraps
//! - Where both sides can be evaluated, expanded and product forms agree
//! - No `(u, v)` satisfies the full disguised conjunction

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use opaque_pell::expr::all_hold;
use opaque_pell::{disguise_with, PellError, PellSeed, TransformMatrix};

#[derive(Debug, Arbitrary)]
struct DisguiseInput {
    root: i64,
    a: i64,
    b: i64,
    c: i64,
    d: i64,
    u: i64,
    v: i64,
}

fuzz_target!(|input: DisguiseInput| {
    let Ok(seed) = PellSeed::from_root(input.root) else {
        return;
    };
    let Ok(matrix) = TransformMatrix::new(input.a, input.b, input.c, input.d) else {
        return;
    };

    let disguised = disguise_with(&seed, matrix);
    let (u, v) = disguised.vars();
    let point = [(u, i128::from(input.u)), (v, i128::from(input.v))];

    if let Some(satisfied) = all_hold(&disguised.constraints(), &point) {
        assert!(!satisfied, "{:?} satisfies {}", input, disguised);
    }

    match disguised.expanded() {
        Ok(form) => {
            let product = disguised.equation().holds(&point);
            let expanded = form.evaluate(i128::from(input.u), i128::from(input.v));
            if let (Some(product), Some(value)) = (product, expanded) {
                assert_eq!(product, value == 1, "{:?}", input);
            }
        }
        Err(PellError::CoefficientOverflow { .. }) => {}
        Err(other) => panic!("unexpected error {:?}", other),
    }
});
