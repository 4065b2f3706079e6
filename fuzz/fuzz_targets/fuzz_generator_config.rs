//! Fuzz target for `GeneratorConfig` validation.
//!
//! # Safety Properties Tested
//! - Arbitrary field values never panic in `validate()` or `with_timeout_secs()`
//! - A config that validates always builds a pipeline
//! - A config that validates never overflows when expanding its most extreme
//!   matrices for its largest `D`

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use opaque_pell::classify::Query;
use opaque_pell::{
    DecisionProcedure, EntryRange, GeneratorConfig, PellError, Pipeline, QuadraticForm,
    TransformMatrix, Verdict,
};

#[derive(Debug, Arbitrary)]
struct ConfigInput {
    timeout_secs: f64,
    entry_min: i64,
    entry_max: i64,
    max_sampling_attempts: u32,
    retries_per_seed: u32,
    max_root: u32,
    rng_seed: Option<u64>,
    d_range: Option<(i64, i64)>,
    random_seeds: u32,
}

struct NeverCalled;

impl DecisionProcedure for NeverCalled {
    fn name(&self) -> &'static str {
        "never-called"
    }

    fn decide(&mut self, _query: &Query<'_>) -> Result<Verdict, PellError> {
        Ok(Verdict::Unsat)
    }
}

fuzz_target!(|input: ConfigInput| {
    let config = GeneratorConfig {
        timeout_limit: Duration::from_secs(1),
        entry_range: EntryRange {
            min: input.entry_min,
            max: input.entry_max,
        },
        max_sampling_attempts: input.max_sampling_attempts,
        retries_per_seed: input.retries_per_seed,
        max_root: input.max_root,
        rng_seed: input.rng_seed,
        ..GeneratorConfig::default()
    };
    let Ok(config) = config.with_timeout_secs(input.timeout_secs) else {
        return;
    };

    let config = match input.d_range {
        Some((low, high)) => config.with_d_range(low..=high, input.random_seeds),
        None => config,
    };

    if config.validate().is_ok() {
        let max_root = *config.seed_roots().unwrap().end();
        let (lo, hi) = (config.entry_range.min, config.entry_range.max);
        for (a, b, c, d) in [(hi, hi, lo, hi), (lo, lo, hi, lo), (hi, lo, hi, lo)] {
            if let Ok(matrix) = TransformMatrix::new(a, b, c, d) {
                assert!(QuadraticForm::expand(max_root * max_root, &matrix).is_ok());
            }
        }
        assert!(Pipeline::from_config(config, NeverCalled).is_ok());
    }
});
