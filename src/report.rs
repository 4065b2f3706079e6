//! Records of qualifying constraints and whole runs.

use std::fmt;

use serde::{Serialize, Serializer};
use web_time::Duration;

use crate::disguise::{DisguisedConstraint, QuadraticForm};
use crate::matrix::TransformMatrix;
use crate::seed::GeneratorMode;
use crate::PellError;

fn duration_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

/// A disguise on which the decision procedure timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualifyingConstraint {
    /// 1-based position among the run's qualifying constraints.
    pub index: usize,
    /// Seed discriminant.
    pub d: i64,
    /// Substitution used.
    pub matrix: TransformMatrix,
    /// Names of the new variables.
    pub variables: (String, String),
    /// `a*u + b*v > 0`, `c*u + d*v > 0`.
    pub domain: Vec<String>,
    /// `u, v ∈ Z, new constraint: (...)^2 - D*(...)^2 == 1`.
    pub product_form: String,
    /// Expanded coefficients.
    pub expanded: QuadraticForm,
    /// Expanded equation text.
    pub expanded_form: String,
    /// Time the procedure spent before giving up.
    #[serde(rename = "elapsed_secs", serialize_with = "duration_secs")]
    pub elapsed: Duration,
    /// Budget it was given.
    #[serde(rename = "timeout_limit_secs", serialize_with = "duration_secs")]
    pub timeout_limit: Duration,
    /// Stable hash of `(D, matrix)`.
    pub fingerprint: u64,
}

impl QualifyingConstraint {
    /// Builds the record for `disguised`.
    pub fn from_disguise(
        index: usize,
        disguised: &DisguisedConstraint,
        elapsed: Duration,
        timeout_limit: Duration,
    ) -> Result<Self, PellError> {
        let expanded = disguised.expanded()?;
        Ok(Self::with_expansion(
            index,
            disguised,
            expanded,
            elapsed,
            timeout_limit,
        ))
    }

    /// Record for `disguised` whose expansion is already known.
    pub fn with_expansion(
        index: usize,
        disguised: &DisguisedConstraint,
        expanded: QuadraticForm,
        elapsed: Duration,
        timeout_limit: Duration,
    ) -> Self {
        let (u, v) = disguised.vars();
        Self {
            index,
            d: disguised.d(),
            matrix: disguised.matrix(),
            variables: (u.name().to_owned(), v.name().to_owned()),
            domain: disguised.domain().iter().map(ToString::to_string).collect(),
            product_form: disguised.description().to_owned(),
            expanded,
            expanded_form: expanded.render(u.name(), v.name()),
            elapsed,
            timeout_limit,
            fingerprint: disguised.fingerprint(),
        }
    }

    /// Serializes to compact JSON.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Serializes to indented JSON.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json_pretty(&self) -> Option<String> {
        serde_json::to_string_pretty(self).ok()
    }
}

impl fmt::Display for QualifyingConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (u, v) = &self.variables;
        writeln!(f, "{}", "=".repeat(30))?;
        writeln!(f, "Qualifying constraint #{}:", self.index)?;
        writeln!(f, "Pell seed: D={}", self.d)?;
        writeln!(f, "New variables and domain: {}, {} ∈ Z", u, v)?;
        writeln!(f, "Domain constraints: {}", self.domain.join(", "))?;
        writeln!(f, "Transform matrix: {}", self.matrix)?;
        writeln!(f, "Constraint structure: {}", self.product_form)?;
        writeln!(f, "Expanded form: {}", self.expanded_form)?;
        write!(
            f,
            "Time to timeout: {:.3}s (limit: {}s)",
            self.elapsed.as_secs_f64(),
            self.timeout_limit.as_secs_f64()
        )
    }
}

/// Outcome of a whole [`Pipeline`](crate::Pipeline) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Mode the seeds came from.
    pub mode: GeneratorMode,
    /// Seeds taken from the generator.
    pub seeds_examined: usize,
    /// Disguises submitted to the procedure (more than seeds when retrying).
    pub disguises_tried: usize,
    /// Every qualifying constraint, in emission order.
    pub qualifying: Vec<QualifyingConstraint>,
}

impl RunSummary {
    /// Empty summary for `mode`.
    #[must_use]
    pub fn new(mode: GeneratorMode) -> Self {
        Self {
            mode,
            seeds_examined: 0,
            disguises_tried: 0,
            qualifying: Vec::new(),
        }
    }

    /// Number of qualifying constraints.
    #[must_use]
    pub fn qualifying_count(&self) -> usize {
        self.qualifying.len()
    }

    /// Serializes to compact JSON.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    /// Serializes to indented JSON.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json_pretty(&self) -> Option<String> {
        serde_json::to_string_pretty(self).ok()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.qualifying {
            writeln!(f, "{}", report)?;
        }
        if self.qualifying.is_empty() {
            write!(
                f,
                "no qualifying (timed-out) constraints in mode {}",
                self.mode
            )
        } else {
            write!(
                f,
                "{} qualifying constraint(s) emitted",
                self.qualifying.len()
            )
        }
    }
}
