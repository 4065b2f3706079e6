use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// This enum contains all error messages this library can return. Most API functions will generally return a [`Result<T, PellError>`].
///
/// [`Result<T, PellError>`]: std::result::Result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PellError {
    /// The seed generator was asked for a mode other than `simple` or `complete`.
    InvalidMode {
        /// The mode selector that was rejected.
        mode: String,
    },
    /// A seed was requested for a discriminant that is not a positive perfect square.
    ///
    /// Non-square discriminants admit nontrivial Pell solutions, so the resulting
    /// constraint would be satisfiable.
    NonSquareDiscriminant {
        /// The rejected discriminant.
        d: i64,
    },
    /// A seed root was out of the supported range.
    InvalidRoot {
        /// The rejected root (or range bound).
        root: i64,
        /// Why the root was rejected.
        reason: String,
    },
    /// An explicitly supplied transform matrix has a zero determinant.
    SingularMatrix {
        /// Top-left entry.
        a: i64,
        /// Top-right entry.
        b: i64,
        /// Bottom-left entry.
        c: i64,
        /// Bottom-right entry.
        d: i64,
    },
    /// The matrix entry range can never produce an invertible matrix.
    InvalidEntryRange {
        /// Lower bound of the range (inclusive).
        min: i64,
        /// Upper bound of the range (inclusive).
        max: i64,
        /// Why the range was rejected.
        reason: String,
    },
    /// Bounded rejection sampling did not find an invertible matrix.
    MatrixSamplingExhausted {
        /// How many draws were attempted.
        attempts: u32,
        /// Lower bound of the entry range.
        min: i64,
        /// Upper bound of the entry range.
        max: i64,
    },
    /// A configuration value was out of range.
    InvalidConfig {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// Expanding the quadratic form would overflow 64-bit coefficients.
    CoefficientOverflow {
        /// A description of the overflowing computation.
        context: String,
    },
    /// The external decision procedure failed for a reason other than running out of time.
    ///
    /// A crash or memory exhaustion is not evidence of resistance to analysis and
    /// is never reported as a timeout.
    SolverFailure {
        /// Name of the decision procedure.
        procedure: &'static str,
        /// A description of the failure.
        context: String,
    },
    /// A generated constraint was reported satisfiable.
    ///
    /// Generated constraints are unsatisfiable by construction, so this indicates a bug
    /// in seed generation or the disguise transform. Please report it.
    InvariantViolation {
        /// A description of the violated invariant.
        context: String,
    },
}

impl Display for PellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PellError::InvalidMode { mode } => {
                write!(
                    f,
                    "Unknown generator mode '{}'. Use \"simple\" or \"complete\"",
                    mode
                )
            }
            PellError::NonSquareDiscriminant { d } => {
                write!(
                    f,
                    "Discriminant {} is not a positive perfect square; the Pell equation would be solvable",
                    d
                )
            }
            PellError::InvalidRoot { root, reason } => {
                write!(f, "Invalid seed root {}: {}", root, reason)
            }
            PellError::SingularMatrix { a, b, c, d } => {
                write!(
                    f,
                    "Transform matrix [[{}, {}], [{}, {}]] has zero determinant",
                    a, b, c, d
                )
            }
            PellError::InvalidEntryRange { min, max, reason } => {
                write!(f, "Invalid matrix entry range [{}, {}]: {}", min, max, reason)
            }
            PellError::MatrixSamplingExhausted { attempts, min, max } => {
                write!(
                    f,
                    "Could not sample an invertible matrix from [{}, {}] after {} attempts",
                    min, max, attempts
                )
            }
            PellError::InvalidConfig { field, reason } => {
                write!(f, "Invalid configuration for '{}': {}", field, reason)
            }
            PellError::CoefficientOverflow { context } => {
                write!(f, "Coefficient overflow: {}", context)
            }
            PellError::SolverFailure { procedure, context } => {
                write!(f, "Solver failure ({}): {}", procedure, context)
            }
            PellError::InvariantViolation { context } => {
                write!(
                    f,
                    "Invariant violation (please report as bug): {}",
                    context
                )
            }
        }
    }
}

impl Error for PellError {}
