//! Decision procedure stubs that replay a script instead of solving.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    dead_code
)]

use std::collections::VecDeque;
use std::time::Duration;

use opaque_pell::classify::{Query, SolverStrategy};
use opaque_pell::expr::describe;
use opaque_pell::rng::Rng;
use opaque_pell::{DecisionProcedure, PellError, Verdict};

/// One scripted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Answer `unsat` immediately.
    Unsat,
    /// Answer `sat` immediately.
    Sat,
    /// Answer `unknown` immediately, well before any budget.
    EarlyUnknown,
    /// Sleep for the whole budget, then answer `unknown`.
    TimeOut,
    /// Sleep for the whole budget, then answer `unsat`.
    SlowUnsat,
    /// Sleep for the whole budget, then answer `sat`.
    SlowSat,
    /// Fail as if the solver ran out of memory.
    Fail,
}

/// What the stub saw for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenQuery {
    pub text: String,
    pub len: usize,
    pub budget: Duration,
    pub strategy: SolverStrategy,
}

/// Replays `Step`s in order, then answers `fallback` forever.
#[derive(Debug)]
pub struct Scripted {
    steps: VecDeque<Step>,
    fallback: Step,
    pub seen: Vec<SeenQuery>,
}

impl Scripted {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            fallback: Step::Unsat,
            seen: Vec::new(),
        }
    }

    /// Answers `step` for every query.
    pub fn always(step: Step) -> Self {
        Self {
            steps: VecDeque::new(),
            fallback: step,
            seen: Vec::new(),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.len()
    }
}

impl DecisionProcedure for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn decide(&mut self, query: &Query<'_>) -> Result<Verdict, PellError> {
        self.seen.push(SeenQuery {
            text: describe(query.constraints),
            len: query.constraints.len(),
            budget: query.budget,
            strategy: query.strategy,
        });
        match self.steps.pop_front().unwrap_or(self.fallback) {
            Step::Unsat => Ok(Verdict::Unsat),
            Step::Sat => Ok(Verdict::Sat),
            Step::EarlyUnknown => Ok(Verdict::Unknown),
            Step::TimeOut => {
                std::thread::sleep(query.budget);
                Ok(Verdict::Unknown)
            }
            Step::SlowUnsat => {
                std::thread::sleep(query.budget);
                Ok(Verdict::Unsat)
            }
            Step::SlowSat => {
                std::thread::sleep(query.budget);
                Ok(Verdict::Sat)
            }
            Step::Fail => Err(PellError::SolverFailure {
                procedure: "scripted",
                context: "max. memory exceeded".to_owned(),
            }),
        }
    }
}

/// Returns the same word on every call, so every sampled entry is identical.
#[derive(Debug, Clone, Copy)]
pub struct ConstantRng(pub u64);

impl Rng for ConstantRng {
    fn next_u32(&mut self) -> u32 {
        self.0 as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0
    }
}
