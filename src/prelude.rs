//! Convenient re-exports for common usage.
//!
//! ```rust
//! use opaque_pell::prelude::*;
//!
//! let config = GeneratorConfig::quick();
//! assert_eq!(config.mode, GeneratorMode::Simple);
//! ```
//!
//! The prelude includes:
//!
//! - **Generation**: [`pell_seeds`], [`PellSeed`], [`GeneratorMode`], [`disguise_with`],
//!   [`DisguiseTransformer`], [`TransformMatrix`]
//! - **Classification**: [`DecisionProcedure`], [`TimeoutClassifier`], [`Verdict`]
//! - **Orchestration**: [`Pipeline`], [`GeneratorConfig`], [`SubmissionForm`],
//!   [`QualifyingConstraint`], [`RunSummary`]
//! - **Error handling**: [`PellError`]

pub use crate::classify::{DecisionProcedure, TimeoutClassifier, Verdict};
pub use crate::config::GeneratorConfig;
pub use crate::disguise::{disguise_with, DisguiseTransformer, SubmissionForm};
pub use crate::error::PellError;
pub use crate::matrix::TransformMatrix;
pub use crate::pipeline::Pipeline;
pub use crate::report::{QualifyingConstraint, RunSummary};
pub use crate::seed::{pell_seeds, GeneratorMode, PellSeed};

#[cfg(feature = "z3-solver")]
pub use crate::backend::z3::Z3Procedure;
