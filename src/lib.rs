//! # opaque-pell
//!
//! Generates integer constraints that are unsatisfiable by construction and hard
//! for nonlinear integer arithmetic solvers to decide. A generated constraint can
//! stand in for a trivially-false condition, forcing a symbolic execution engine
//! to spend its whole solver budget proving the path infeasible.
//!
//! Generation has three stages:
//!
//! 1. [`pell_seeds`] yields seeds `x > 0, y > 0, x^2 - D*y^2 == 1` with `D` a
//!    perfect square, which have no integer solutions.
//! 2. [`DisguiseTransformer`] rewrites a seed under a random invertible linear
//!    substitution in fresh variables `u`, `v`, preserving unsatisfiability.
//! 3. [`TimeoutClassifier`] submits the disguise to a [`DecisionProcedure`] and
//!    keeps it only if the procedure runs out of time.
//!
//! [`Pipeline`] runs all three according to a [`GeneratorConfig`].
//!
//! ```
//! use opaque_pell::{disguise_with, pell_seeds, GeneratorMode, TransformMatrix};
//!
//! let seed = pell_seeds(GeneratorMode::Simple).next().unwrap();
//! let matrix = TransformMatrix::new(2, -3, 1, 5)?;
//! let disguised = disguise_with(&seed, matrix);
//!
//! assert_eq!(
//!     disguised.description(),
//!     "u, v ∈ Z, new constraint: (2*u - 3*v)^2 - (u + 5*v)^2 == 1",
//! );
//! assert_eq!(disguised.expanded()?.to_string(), "3*u^2 - 22*u*v - 16*v^2 == 1");
//! # Ok::<(), opaque_pell::PellError>(())
//! ```
//!
//! The Z3 decision procedure lives behind the `z3-solver` feature, in
//! [`backend`].

#![forbid(unsafe_code)] // let us try
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use classify::{Classification, DecisionProcedure, SolverStrategy, TimeoutClassifier, Verdict};
pub use config::GeneratorConfig;
pub use disguise::{
    disguise_with, DisguiseTransformer, DisguisedConstraint, QuadraticForm, SubmissionForm,
};
pub use error::PellError;
pub use matrix::{EntryRange, MatrixSampler, TransformMatrix};
pub use pipeline::Pipeline;
pub use report::{QualifyingConstraint, RunSummary};
pub use seed::{pell_seeds, pell_seeds_from_str, GeneratorMode, PellSeed, PellSeeds};

pub mod backend;
pub mod classify;
pub mod config;
pub mod disguise;
#[doc(hidden)]
pub mod error;
pub mod expr;
pub mod hash;
pub mod matrix;
pub mod pipeline;
pub mod prelude;
pub mod report;
/// Internal random number generator module based on PCG32.
///
/// Provides a minimal, seedable PRNG for matrix sampling, so runs are
/// reproducible from a single `u64`.
pub mod rng;
pub mod seed;
pub mod telemetry;
