//! Seeds → disguise → classify, keeping only the timeouts.

use std::sync::Arc;

use crate::classify::{DecisionProcedure, TimeoutClassifier, Verdict};
use crate::config::GeneratorConfig;
use crate::disguise::{DisguiseTransformer, DisguisedConstraint};
use crate::matrix::MatrixSampler;
use crate::report::{QualifyingConstraint, RunSummary};
use crate::rng::{Pcg32, Rng, SeedableRng};
use crate::seed::{pell_seeds, PellSeed};
use crate::telemetry::{
    report_to_observer, Violation, ViolationKind, ViolationObserver, ViolationSeverity,
};
use crate::PellError;

/// Drives a full generation run.
///
/// ```
/// use std::time::Duration;
/// use opaque_pell::{DecisionProcedure, GeneratorConfig, PellError, Pipeline, Verdict};
/// use opaque_pell::classify::Query;
///
/// /// Pretends to run out of time on every query.
/// struct Stalling;
///
/// impl DecisionProcedure for Stalling {
///     fn name(&self) -> &'static str {
///         "stalling"
///     }
///
///     fn decide(&mut self, query: &Query<'_>) -> Result<Verdict, PellError> {
///         std::thread::sleep(query.budget);
///         Ok(Verdict::Unknown)
///     }
/// }
///
/// let config = GeneratorConfig {
///     timeout_limit: Duration::from_millis(5),
///     ..GeneratorConfig::quick()
/// };
/// let summary = Pipeline::from_config(config, Stalling)?.run()?;
/// assert_eq!(summary.qualifying_count(), 1);
/// # Ok::<(), PellError>(())
/// ```
pub struct Pipeline<P, R> {
    config: GeneratorConfig,
    classifier: TimeoutClassifier<P>,
    transformer: DisguiseTransformer<R>,
    observer: Option<Arc<dyn ViolationObserver>>,
}

impl<P: DecisionProcedure> Pipeline<P, Pcg32> {
    /// Pipeline seeded from `config.rng_seed`, or from entropy when unset.
    pub fn from_config(config: GeneratorConfig, procedure: P) -> Result<Self, PellError> {
        let rng = match config.rng_seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_entropy(),
        };
        Self::new(config, procedure, rng)
    }
}

impl<P: DecisionProcedure, R: Rng> Pipeline<P, R> {
    /// Pipeline with an explicit RNG. Validates `config`.
    pub fn new(config: GeneratorConfig, procedure: P, rng: R) -> Result<Self, PellError> {
        config.validate()?;
        let sampler =
            MatrixSampler::new(config.entry_range)?.with_max_attempts(config.max_sampling_attempts);
        Ok(Self {
            classifier: TimeoutClassifier::new(procedure).with_strategy(config.strategy),
            transformer: DisguiseTransformer::with_sampler(rng, sampler),
            config,
            observer: None,
        })
    }

    /// Also reports invariant violations to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ViolationObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Consumes the pipeline, returning the decision procedure.
    pub fn into_procedure(self) -> P {
        self.classifier.into_inner()
    }

    /// Runs every seed and returns the summary.
    pub fn run(&mut self) -> Result<RunSummary, PellError> {
        self.run_with(|_| {})
    }

    /// Runs every seed, handing each qualifying constraint to `on_qualifying` as
    /// soon as it is found.
    ///
    /// A `Sat` verdict stops the run with [`PellError::InvariantViolation`].
    pub fn run_with<F>(&mut self, mut on_qualifying: F) -> Result<RunSummary, PellError>
    where
        F: FnMut(&QualifyingConstraint),
    {
        let mode = self.config.mode;
        let mut summary = RunSummary::new(mode);

        // A fixed matrix makes every retry identical.
        let attempts_per_seed = if self.config.fixed_matrix.is_some() {
            1
        } else {
            self.config.retries_per_seed.saturating_add(1)
        };

        for seed in self.seeds()? {
            summary.seeds_examined += 1;

            for attempt in 1..=attempts_per_seed {
                let disguised = self
                    .transformer
                    .disguise(&seed, self.config.fixed_matrix)?;
                summary.disguises_tried += 1;

                if let Some(report) =
                    self.classify_disguise(&seed, &disguised, summary.qualifying.len() + 1)?
                {
                    tracing::info!(
                        index = report.index,
                        d = report.d,
                        matrix = %report.matrix,
                        elapsed_ms = report.elapsed.as_millis() as u64,
                        "qualifying constraint: {}",
                        report.product_form
                    );
                    on_qualifying(&report);
                    summary.qualifying.push(report);
                    break;
                }

                tracing::debug!(
                    d = seed.d(),
                    attempt,
                    attempts_per_seed,
                    matrix = %disguised.matrix(),
                    "disguise did not time out, discarded"
                );
            }
        }

        Ok(summary)
    }

    /// The mode's seed set, or `random_seeds` draws from `d_range`.
    fn seeds(&mut self) -> Result<Vec<PellSeed>, PellError> {
        match self.config.d_range.clone() {
            Some(range) => (0..self.config.random_seeds)
                .map(|_| self.transformer.random_seed(range.clone()))
                .collect(),
            None => Ok(pell_seeds(self.config.mode)
                .with_max_root(self.config.max_root)
                .collect()),
        }
    }

    fn classify_disguise(
        &mut self,
        seed: &PellSeed,
        disguised: &DisguisedConstraint,
        index: usize,
    ) -> Result<Option<QualifyingConstraint>, PellError> {
        // Expand first so an unreportable disguise never costs solver time.
        let expanded = match disguised.expanded() {
            Ok(expanded) => expanded,
            Err(PellError::CoefficientOverflow { context }) => {
                tracing::warn!(
                    d = seed.d(),
                    matrix = %disguised.matrix(),
                    "expansion overflows i64, disguise skipped: {}",
                    context
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let constraints = disguised.submission(self.config.submission)?;
        let limit = self.config.timeout_limit;
        let classification = match self.classifier.classify(&constraints, limit) {
            Ok(classification) => classification,
            Err(err @ PellError::SolverFailure { .. }) => {
                let violation = Violation::new(
                    ViolationSeverity::Error,
                    ViolationKind::Solver,
                    format!(
                        "decision procedure '{}' failed: {}",
                        self.classifier.procedure().name(),
                        err
                    ),
                    concat!(file!(), ":", line!()),
                )
                .with_discriminant(seed.d())
                .with_context("matrix", disguised.matrix().to_string());
                report_to_observer(self.observer.as_deref(), &violation);
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        if classification.verdict == Verdict::Sat {
            let violation = Violation::new(
                ViolationSeverity::Critical,
                ViolationKind::Unsatisfiability,
                format!(
                    "decision procedure '{}' found a model for a generated constraint",
                    self.classifier.procedure().name()
                ),
                concat!(file!(), ":", line!()),
            )
            .with_discriminant(seed.d())
            .with_context("matrix", disguised.matrix().to_string())
            .with_context("constraint", disguised.description())
            .with_context("fingerprint", format!("{:016x}", disguised.fingerprint()));
            report_to_observer(self.observer.as_deref(), &violation);

            return Err(PellError::InvariantViolation {
                context: format!(
                    "seed D={} with matrix {} was reported satisfiable: {}",
                    seed.d(),
                    disguised.matrix(),
                    disguised.description()
                ),
            });
        }

        if !classification.timed_out {
            return Ok(None);
        }

        Ok(Some(QualifyingConstraint::with_expansion(
            index,
            disguised,
            expanded,
            classification.elapsed,
            limit,
        )))
    }
}

impl<P, R> std::fmt::Debug for Pipeline<P, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("has_observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}
