//! Z3 as a [`DecisionProcedure`].
//!
//! Each query runs in its own thread-local Z3 context. Integer constants are
//! declared per variable identity, so two `u`s from different disguises never
//! alias even though they share a name.

use std::collections::BTreeMap;

use z3::ast::{Bool, Int};
use z3::{with_z3_config, Config, Params, SatResult, Solver, Tactic};

use crate::classify::{DecisionProcedure, Query, Verdict};
use crate::expr::{Constraint, Relation, Term};
use crate::PellError;

const NAME: &str = "z3";

/// `memory_max_size` value meaning "no limit".
const NO_MEMORY_LIMIT: u32 = 0;

/// Reason fragments that mean Z3 gave up for something other than time.
const RESOURCE_FAILURE_MARKERS: [&str; 3] = ["memory", "memout", "resource"];

/// Z3-backed decision procedure.
///
/// The memory cap is Z3's process-wide `memory_max_size` parameter. Every
/// [`decide`](DecisionProcedure::decide) call writes it, so a capped procedure
/// does not leak its cap into a later uncapped one. Procedures with different
/// caps must not run concurrently.
///
/// ```no_run
/// use std::time::Duration;
/// use opaque_pell::backend::z3::Z3Procedure;
/// use opaque_pell::TimeoutClassifier;
///
/// let mut classifier = TimeoutClassifier::new(Z3Procedure::new().with_max_memory_mb(2048));
/// classifier.classify(&[], Duration::from_secs(1))?;
/// # Ok::<(), opaque_pell::PellError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Z3Procedure {
    max_memory_mb: Option<u32>,
}

impl Z3Procedure {
    /// Procedure with no memory limit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_memory_mb: None,
        }
    }

    /// Caps Z3's memory use. Exceeding it is a solver failure, not a timeout.
    #[must_use]
    pub const fn with_max_memory_mb(mut self, megabytes: u32) -> Self {
        self.max_memory_mb = Some(megabytes);
        self
    }

    /// The configured memory cap.
    #[must_use]
    pub const fn max_memory_mb(&self) -> Option<u32> {
        self.max_memory_mb
    }
}

impl DecisionProcedure for Z3Procedure {
    fn name(&self) -> &'static str {
        NAME
    }

    fn decide(&mut self, query: &Query<'_>) -> Result<Verdict, PellError> {
        let megabytes = self.max_memory_mb.unwrap_or(NO_MEMORY_LIMIT);
        z3::set_global_param("memory_max_size", &megabytes.to_string());

        let timeout_ms = u32::try_from(query.budget.as_millis())
            .unwrap_or(u32::MAX)
            .max(1);

        with_z3_config(&Config::new(), || {
            let solver = match query.strategy.tactic_name() {
                Some(tactic) => Tactic::new(tactic).solver(),
                None => Solver::new(),
            };

            let mut params = Params::new();
            params.set_u32("timeout", timeout_ms);
            solver.set_params(&params);

            let mut vars = BTreeMap::new();
            for constraint in query.constraints {
                solver.assert(&translate_constraint(constraint, &mut vars));
            }

            match solver.check() {
                SatResult::Sat => Ok(Verdict::Sat),
                SatResult::Unsat => Ok(Verdict::Unsat),
                SatResult::Unknown => {
                    let reason = solver.get_reason_unknown().unwrap_or_default();
                    let lowered = reason.to_lowercase();
                    if RESOURCE_FAILURE_MARKERS
                        .iter()
                        .any(|marker| lowered.contains(marker))
                    {
                        return Err(PellError::SolverFailure {
                            procedure: NAME,
                            context: format!("gave up with reason '{}'", reason),
                        });
                    }
                    tracing::trace!(reason = %reason, timeout_ms, "z3 returned unknown");
                    Ok(Verdict::Unknown)
                }
            }
        })
    }
}

fn translate_term(term: &Term, vars: &mut BTreeMap<u64, Int>) -> Int {
    match term {
        Term::Const(k) => Int::from_i64(*k),
        Term::Var(var) => vars
            .entry(var.id())
            .or_insert_with(|| Int::fresh_const(var.name()))
            .clone(),
        Term::Add(l, r) => {
            let (l, r) = (translate_term(l, vars), translate_term(r, vars));
            &l + &r
        }
        Term::Sub(l, r) => {
            let (l, r) = (translate_term(l, vars), translate_term(r, vars));
            &l - &r
        }
        Term::Mul(l, r) => {
            let (l, r) = (translate_term(l, vars), translate_term(r, vars));
            &l * &r
        }
        Term::Square(t) => {
            let t = translate_term(t, vars);
            &t * &t
        }
    }
}

fn translate_constraint(constraint: &Constraint, vars: &mut BTreeMap<u64, Int>) -> Bool {
    let lhs = translate_term(&constraint.lhs, vars);
    let rhs = translate_term(&constraint.rhs, vars);
    match constraint.relation {
        Relation::Gt => lhs.gt(&rhs),
        Relation::Ge => lhs.ge(&rhs),
        Relation::Lt => lhs.lt(&rhs),
        Relation::Le => lhs.le(&rhs),
        Relation::Eq => lhs.eq(&rhs),
    }
}
