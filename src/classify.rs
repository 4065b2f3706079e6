//! Timeout classification against an opaque decision procedure.
//!
//! The classifier never looks inside the procedure. It submits one conjunction,
//! times the call, and reports whether the procedure ran out of budget.

use std::fmt;
use std::time::Duration;

use web_time::Instant;

use crate::expr::Constraint;
use crate::PellError;

/// Outcome of a single satisfiability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// A model exists.
    Sat,
    /// No model exists.
    Unsat,
    /// The procedure gave up, usually because the budget ran out.
    Unknown,
}

impl Verdict {
    /// Lower-case name, as logged.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Verdict::Sat => "sat",
            Verdict::Unsat => "unsat",
            Verdict::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which solver configuration a procedure should use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStrategy {
    /// Quantifier-free nonlinear integer arithmetic (`qfnia`).
    #[default]
    NonlinearInteger,
    /// Whatever the procedure uses by default.
    Default,
}

impl SolverStrategy {
    /// Tactic name for procedures that accept one.
    #[must_use]
    pub const fn tactic_name(&self) -> Option<&'static str> {
        match self {
            SolverStrategy::NonlinearInteger => Some("qfnia"),
            SolverStrategy::Default => None,
        }
    }
}

/// One satisfiability question.
#[derive(Debug, Clone, Copy)]
pub struct Query<'a> {
    /// Conjunction to check.
    pub constraints: &'a [Constraint],
    /// Wall-clock budget the procedure must honour.
    pub budget: Duration,
    /// Solver configuration.
    pub strategy: SolverStrategy,
}

/// An external satisfiability checker.
///
/// Implementations declare one integer variable per distinct [`Var`](crate::expr::Var),
/// assert every constraint of the query, apply the budget and strategy, and run a
/// single check. Running out of time is `Ok(Verdict::Unknown)`. Running out of any
/// other resource, or crashing, is `Err(PellError::SolverFailure { .. })`.
pub trait DecisionProcedure {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &'static str;

    /// Runs one check.
    fn decide(&mut self, query: &Query<'_>) -> Result<Verdict, PellError>;
}

impl<P: DecisionProcedure + ?Sized> DecisionProcedure for &mut P {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decide(&mut self, query: &Query<'_>) -> Result<Verdict, PellError> {
        (**self).decide(query)
    }
}

impl<P: DecisionProcedure + ?Sized> DecisionProcedure for Box<P> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn decide(&mut self, query: &Query<'_>) -> Result<Verdict, PellError> {
        (**self).decide(query)
    }
}

/// Result of classifying one conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// `verdict == Unknown && elapsed >= limit`.
    pub timed_out: bool,
    /// Wall-clock time spent in the procedure.
    pub elapsed: Duration,
    /// What the procedure answered.
    pub verdict: Verdict,
}

/// Submits conjunctions to a [`DecisionProcedure`] and keeps the ones that time out.
///
/// ```
/// use std::time::Duration;
/// use opaque_pell::{DecisionProcedure, PellError, TimeoutClassifier, Verdict};
/// use opaque_pell::classify::Query;
///
/// struct AlwaysUnsat;
///
/// impl DecisionProcedure for AlwaysUnsat {
///     fn name(&self) -> &'static str {
///         "always-unsat"
///     }
///
///     fn decide(&mut self, _query: &Query<'_>) -> Result<Verdict, PellError> {
///         Ok(Verdict::Unsat)
///     }
/// }
///
/// let mut classifier = TimeoutClassifier::new(AlwaysUnsat);
/// let result = classifier.classify(&[], Duration::from_secs(1))?;
/// assert_eq!(result.verdict, Verdict::Unsat);
/// assert!(!result.timed_out);
/// # Ok::<(), PellError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TimeoutClassifier<P> {
    procedure: P,
    strategy: SolverStrategy,
}

impl<P: DecisionProcedure> TimeoutClassifier<P> {
    /// Classifier using the nonlinear integer strategy.
    pub fn new(procedure: P) -> Self {
        Self {
            procedure,
            strategy: SolverStrategy::default(),
        }
    }

    /// Overrides the solver strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: SolverStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// The strategy in use.
    pub fn strategy(&self) -> SolverStrategy {
        self.strategy
    }

    /// The wrapped procedure.
    pub fn procedure(&self) -> &P {
        &self.procedure
    }

    /// Consumes the classifier, returning the procedure.
    pub fn into_inner(self) -> P {
        self.procedure
    }

    /// Makes exactly one `decide` call and classifies the outcome.
    pub fn classify(
        &mut self,
        constraints: &[Constraint],
        timeout_limit: Duration,
    ) -> Result<Classification, PellError> {
        if timeout_limit.is_zero() {
            return Err(PellError::InvalidConfig {
                field: "timeout_limit",
                reason: "must be greater than zero".to_owned(),
            });
        }

        let query = Query {
            constraints,
            budget: timeout_limit,
            strategy: self.strategy,
        };

        let start = Instant::now();
        let verdict = self.procedure.decide(&query)?;
        let elapsed = start.elapsed();

        let timed_out = verdict == Verdict::Unknown && elapsed >= timeout_limit;
        if verdict == Verdict::Unknown && !timed_out {
            tracing::debug!(
                procedure = self.procedure.name(),
                elapsed_ms = elapsed.as_millis() as u64,
                limit_ms = timeout_limit.as_millis() as u64,
                "unknown verdict before the time limit, not a timeout"
            );
        }

        Ok(Classification {
            timed_out,
            elapsed,
            verdict,
        })
    }
}
