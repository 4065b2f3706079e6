//! Generator configuration.
//!
//! | Preset | Mode | Limit | Retries per seed |
//! |--------|------|-------|------------------|
//! | `default()` | complete | 60 s | 0 |
//! | `quick()` | simple | 5 s | 0 |
//! | `thorough()` | complete | 60 s | 3 |
//! | `deterministic(seed)` | complete | 60 s | 0, fixed RNG seed |
//!
//! # Example
//!
//! ```
//! use opaque_pell::{GeneratorConfig, GeneratorMode, SubmissionForm};
//!
//! let config = GeneratorConfig {
//!     mode: GeneratorMode::Simple,
//!     submission: SubmissionForm::Expanded,
//!     ..GeneratorConfig::deterministic(42)
//! }
//! .with_timeout_secs(2.5)?;
//!
//! config.validate()?;
//! assert_eq!(config.rng_seed, Some(42));
//! # Ok::<(), opaque_pell::PellError>(())
//! ```

use std::ops::RangeInclusive;

use web_time::Duration;

use crate::classify::SolverStrategy;
use crate::disguise::{QuadraticForm, SubmissionForm};
use crate::matrix::{EntryRange, TransformMatrix, DEFAULT_MAX_SAMPLING_ATTEMPTS};
use crate::seed::{square_roots_in, GeneratorMode, COMPLETE_MAX_ROOT, MAX_SEED_ROOT};
use crate::PellError;

/// Upper bound on `max_sampling_attempts`.
pub const MAX_SAMPLING_ATTEMPTS_LIMIT: u32 = 1_000_000;

/// Upper bound on `retries_per_seed`.
pub const MAX_RETRIES_PER_SEED: u32 = 1000;

/// Upper bound on `random_seeds`.
pub const MAX_RANDOM_SEEDS: u32 = 10_000;

/// Everything a [`Pipeline`](crate::Pipeline) needs besides its decision procedure.
///
/// # Forward Compatibility
///
/// New fields may be added. Construct with `..GeneratorConfig::default()`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "GeneratorConfig has no effect unless passed to Pipeline::from_config()"]
pub struct GeneratorConfig {
    /// Which seeds to generate.
    ///
    /// Default: `Complete`
    pub mode: GeneratorMode,

    /// Per-disguise solver budget. A disguise qualifies only if the solver
    /// answers `unknown` after at least this long.
    ///
    /// Default: 60 s
    pub timeout_limit: Duration,

    /// Range for sampled matrix entries.
    ///
    /// Default: `[-10, 10]`
    pub entry_range: EntryRange,

    /// Bound on rejection sampling for one matrix.
    ///
    /// Default: 10 000
    pub max_sampling_attempts: u32,

    /// Extra disguises tried per seed until one qualifies. `0` draws one
    /// disguise per seed and drops it if it does not qualify.
    ///
    /// Default: 0
    pub retries_per_seed: u32,

    /// Which rendering of the equation is submitted.
    ///
    /// Default: `Product`
    pub submission: SubmissionForm,

    /// Solver configuration.
    ///
    /// Default: `NonlinearInteger`
    pub strategy: SolverStrategy,

    /// Fixed RNG seed. `None` seeds from entropy.
    ///
    /// Default: `None`
    pub rng_seed: Option<u64>,

    /// Use this matrix for every seed instead of sampling.
    ///
    /// Default: `None`
    pub fixed_matrix: Option<TransformMatrix>,

    /// Largest root `k` in `Complete` mode (`D = k^2`).
    ///
    /// Default: 7
    pub max_root: u32,

    /// Draw seeds with a random square `D` from this range instead of
    /// enumerating `mode`'s seed set.
    ///
    /// Default: `None`
    pub d_range: Option<RangeInclusive<i64>>,

    /// Number of seeds drawn from `d_range`. Ignored without it.
    ///
    /// Default: 1
    pub random_seeds: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            mode: GeneratorMode::Complete,
            timeout_limit: Duration::from_secs(60),
            entry_range: EntryRange::default(),
            max_sampling_attempts: DEFAULT_MAX_SAMPLING_ATTEMPTS,
            retries_per_seed: 0,
            submission: SubmissionForm::Product,
            strategy: SolverStrategy::NonlinearInteger,
            rng_seed: None,
            fixed_matrix: None,
            max_root: COMPLETE_MAX_ROOT,
            d_range: None,
            random_seeds: 1,
        }
    }
}

impl GeneratorConfig {
    /// Creates a `GeneratorConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single `D = 1` seed with a 5 second limit. Useful for smoke runs.
    pub fn quick() -> Self {
        Self {
            mode: GeneratorMode::Simple,
            timeout_limit: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// All seven seeds, with up to three extra disguises per seed.
    pub fn thorough() -> Self {
        Self {
            retries_per_seed: 3,
            ..Self::default()
        }
    }

    /// Reproducible matrix sampling.
    ///
    /// ```
    /// use opaque_pell::GeneratorConfig;
    ///
    /// let config = GeneratorConfig::deterministic(42);
    /// assert_eq!(config.rng_seed, Some(42));
    /// ```
    pub fn deterministic(seed: u64) -> Self {
        Self {
            rng_seed: Some(seed),
            ..Self::default()
        }
    }

    /// Sets the time limit from fractional seconds, as taken from a command line.
    ///
    /// Rejects non-finite and non-positive values.
    pub fn with_timeout_secs(mut self, secs: f64) -> Result<Self, PellError> {
        if !secs.is_finite() || secs <= 0.0 {
            return Err(PellError::InvalidConfig {
                field: "timeout_limit",
                reason: format!("must be a positive number of seconds, got {}", secs),
            });
        }
        let limit = Duration::try_from_secs_f64(secs).map_err(|e| PellError::InvalidConfig {
            field: "timeout_limit",
            reason: format!("{} seconds is not representable: {}", secs, e),
        })?;
        if limit.is_zero() {
            return Err(PellError::InvalidConfig {
                field: "timeout_limit",
                reason: format!("{} seconds rounds down to zero", secs),
            });
        }
        self.timeout_limit = limit;
        Ok(self)
    }

    /// Draws `count` random seeds with square `D` in `d_range`.
    pub fn with_d_range(mut self, d_range: RangeInclusive<i64>, count: u32) -> Self {
        self.d_range = Some(d_range);
        self.random_seeds = count;
        self
    }

    /// Roots `k` the run can draw seeds from.
    pub fn seed_roots(&self) -> Result<RangeInclusive<i64>, PellError> {
        match (&self.d_range, self.mode) {
            (Some(range), _) => square_roots_in(range),
            (None, GeneratorMode::Simple) => Ok(1..=1),
            (None, GeneratorMode::Complete) => {
                Ok(1..=i64::from(self.max_root).min(MAX_SEED_ROOT))
            }
        }
    }

    /// Validates every field.
    pub fn validate(&self) -> Result<(), PellError> {
        if self.timeout_limit.is_zero() {
            return Err(PellError::InvalidConfig {
                field: "timeout_limit",
                reason: "must be greater than zero".to_owned(),
            });
        }

        self.entry_range.validate()?;

        if self.max_sampling_attempts < 1 || self.max_sampling_attempts > MAX_SAMPLING_ATTEMPTS_LIMIT
        {
            return Err(PellError::InvalidConfig {
                field: "max_sampling_attempts",
                reason: format!(
                    "must be between 1 and {}, got {}",
                    MAX_SAMPLING_ATTEMPTS_LIMIT, self.max_sampling_attempts
                ),
            });
        }

        if self.retries_per_seed > MAX_RETRIES_PER_SEED {
            return Err(PellError::InvalidConfig {
                field: "retries_per_seed",
                reason: format!(
                    "must be at most {}, got {}",
                    MAX_RETRIES_PER_SEED, self.retries_per_seed
                ),
            });
        }

        if self.max_root < 1 || i64::from(self.max_root) > MAX_SEED_ROOT {
            return Err(PellError::InvalidConfig {
                field: "max_root",
                reason: format!(
                    "must be between 1 and {}, got {}",
                    MAX_SEED_ROOT, self.max_root
                ),
            });
        }

        if self.d_range.is_some() && !(1..=MAX_RANDOM_SEEDS).contains(&self.random_seeds) {
            return Err(PellError::InvalidConfig {
                field: "random_seeds",
                reason: format!(
                    "must be between 1 and {}, got {}",
                    MAX_RANDOM_SEEDS, self.random_seeds
                ),
            });
        }

        let roots = self.seed_roots().map_err(|e| PellError::InvalidConfig {
            field: "d_range",
            reason: e.to_string(),
        })?;

        match self.fixed_matrix {
            Some(matrix) => {
                for root in roots {
                    QuadraticForm::expand(root * root, &matrix)?;
                }
            }
            None => self.check_expansion_bound(*roots.end())?,
        }

        Ok(())
    }

    /// Every coefficient of an expansion is bounded by `2*m^2*(1 + D)` for entries
    /// with `|entry| <= m`. Rejects entry ranges where that can leave `i64`.
    fn check_expansion_bound(&self, max_root: i64) -> Result<(), PellError> {
        let m = u128::from(self.entry_range.max_abs());
        let d = u128::from(max_root.unsigned_abs()).pow(2);
        let bound = m
            .checked_mul(m)
            .and_then(|m2| m2.checked_mul(2))
            .and_then(|two_m2| two_m2.checked_mul(d + 1));
        match bound {
            Some(bound) if bound <= i64::MAX as u128 => Ok(()),
            _ => Err(PellError::InvalidConfig {
                field: "entry_range",
                reason: format!(
                    "entries in [{}, {}] can overflow the expanded coefficients for D={}",
                    self.entry_range.min,
                    self.entry_range.max,
                    max_root.saturating_mul(max_root)
                ),
            }),
        }
    }
}
