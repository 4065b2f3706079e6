//! Structured telemetry for invariant violations.
//!
//! Generated constraints are unsatisfiable by construction. When something
//! contradicts that (a solver reporting `sat`, a sampler fed an impossible range),
//! the event is recorded as a structured [`Violation`] instead of a bare log line,
//! so it can be:
//!
//! - Logged via tracing (default behavior)
//! - Collected programmatically in tests
//! - Forwarded to custom observers
//!
//! # Example
//!
//! ```
//! use opaque_pell::telemetry::{CollectingObserver, ViolationKind};
//! use std::sync::Arc;
//!
//! let observer = Arc::new(CollectingObserver::new());
//! // ... hand `observer.clone()` to a Pipeline via `with_observer` ...
//! assert!(!observer.has_violation(ViolationKind::Unsatisfiability));
//! ```

use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Severity of a violation.
///
/// Severities are ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Unexpected but recoverable; operation continued with a fallback.
    Warning,
    /// Serious issue; the operation was rejected or degraded.
    Error,
    /// Critical invariant broken; generated output cannot be trusted.
    Critical,
}

impl ViolationSeverity {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories of violations.
///
/// # Forward Compatibility
///
/// This enum is `#[non_exhaustive]`. Always include a wildcard arm when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViolationKind {
    /// Configuration or argument constraint violated (e.g. an empty random range).
    Configuration,
    /// Matrix sampling came close to, or reached, its retry bound.
    Sampling,
    /// The decision procedure misbehaved (crash, resource exhaustion).
    Solver,
    /// A generated constraint was reported satisfiable.
    ///
    /// These violations indicate bugs in seed generation or the disguise transform.
    Unsatisfiability,
}

impl ViolationKind {
    /// Returns a string representation suitable for logging/metrics labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Sampling => "sampling",
            Self::Solver => "solver",
            Self::Unsatisfiability => "unsatisfiability",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded violation.
///
/// # Example
///
/// ```
/// use opaque_pell::telemetry::{Violation, ViolationSeverity, ViolationKind};
///
/// let violation = Violation::new(
///     ViolationSeverity::Critical,
///     ViolationKind::Unsatisfiability,
///     "solver reported sat",
///     "pipeline.rs:42",
/// ).with_discriminant(49)
///  .with_context("matrix", "[[1, 0], [0, 1]]");
///
/// assert_eq!(violation.discriminant, Some(49));
/// assert!(violation.to_string().contains("d=49"));
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct Violation {
    /// The severity level of this violation.
    pub severity: ViolationSeverity,
    /// The category where the violation occurred.
    pub kind: ViolationKind,
    /// Human-readable description of what went wrong.
    pub message: String,
    /// Source location where the violation was detected (file:line).
    pub location: &'static str,
    /// The Pell discriminant of the seed involved, if applicable.
    pub discriminant: Option<i64>,
    /// Additional structured context as key-value pairs.
    pub context: BTreeMap<String, String>,
}

impl Violation {
    /// Creates a new violation.
    #[must_use]
    pub fn new(
        severity: ViolationSeverity,
        kind: ViolationKind,
        message: impl Into<String>,
        location: &'static str,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location,
            discriminant: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the seed discriminant involved in this violation.
    #[must_use]
    pub fn with_discriminant(mut self, d: i64) -> Self {
        self.discriminant = Some(d);
        self
    }

    /// Adds a context key-value pair.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Serializes this violation to a JSON string.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}/{}] {} (at {}",
            self.severity, self.kind, self.message, self.location
        )?;
        if let Some(d) = self.discriminant {
            write!(f, ", d={d}")?;
        }
        if !self.context.is_empty() {
            write!(f, ", context={:?}", self.context)?;
        }
        write!(f, ")")
    }
}

/// Trait for observing violations.
pub trait ViolationObserver: Send + Sync {
    /// Called when a violation is detected.
    fn on_violation(&self, violation: &Violation);
}

/// Built-in observer that logs violations via the `tracing` crate.
///
/// - `Warning` severity → `tracing::warn!`
/// - `Error` and `Critical` severity → `tracing::error!`
#[derive(Debug, Default, Clone)]
pub struct TracingObserver;

impl TracingObserver {
    /// Creates a new tracing observer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &Violation) {
        let kind = violation.kind.as_str();
        let location = violation.location;
        let d = violation
            .discriminant
            .map_or_else(|| "null".to_owned(), |d| d.to_string());

        let context_str = if violation.context.is_empty() {
            "{}".to_owned()
        } else {
            let pairs: Vec<String> = violation
                .context
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            format!("{{{}}}", pairs.join(", "))
        };

        match violation.severity {
            ViolationSeverity::Warning => {
                tracing::warn!(
                    severity = "warning",
                    kind,
                    location,
                    d = %d,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
            ViolationSeverity::Error => {
                tracing::error!(
                    severity = "error",
                    kind,
                    location,
                    d = %d,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
            ViolationSeverity::Critical => {
                tracing::error!(
                    severity = "critical",
                    kind,
                    location,
                    d = %d,
                    context = %context_str,
                    "{}",
                    violation.message
                );
            },
        }
    }
}

/// Built-in observer that collects violations for testing.
///
/// ```
/// use opaque_pell::telemetry::{CollectingObserver, Violation, ViolationKind, ViolationObserver, ViolationSeverity};
///
/// let observer = CollectingObserver::new();
/// observer.on_violation(&Violation::new(
///     ViolationSeverity::Warning,
///     ViolationKind::Sampling,
///     "test violation",
///     "test.rs:1",
/// ));
///
/// assert_eq!(observer.len(), 1);
/// assert!(observer.has_violation(ViolationKind::Sampling));
/// ```
#[derive(Debug, Default)]
pub struct CollectingObserver {
    violations: Mutex<Vec<Violation>>,
}

impl CollectingObserver {
    /// Creates a new collecting observer with an empty violation list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of all collected violations.
    #[must_use]
    pub fn violations(&self) -> Vec<Violation> {
        self.violations.lock().clone()
    }

    /// Returns the number of collected violations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.violations.lock().len()
    }

    /// Returns true if no violations have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.lock().is_empty()
    }

    /// Checks if any violation of the specified kind has been collected.
    #[must_use]
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.violations.lock().iter().any(|v| v.kind == kind)
    }

    /// Returns all violations at or above the specified severity.
    #[must_use]
    pub fn violations_at_severity(&self, min_severity: ViolationSeverity) -> Vec<Violation> {
        self.violations
            .lock()
            .iter()
            .filter(|v| v.severity >= min_severity)
            .cloned()
            .collect()
    }

    /// Clears all collected violations.
    pub fn clear(&self) {
        self.violations.lock().clear();
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &Violation) {
        self.violations.lock().push(violation.clone());
    }
}

/// Macro for reporting violations with location tracking.
///
/// Creates a [`Violation`] with the current file and line and logs it through
/// [`TracingObserver`].
///
/// ```
/// use opaque_pell::{report_violation, telemetry::{ViolationSeverity, ViolationKind}};
///
/// report_violation!(ViolationSeverity::Warning, ViolationKind::Sampling,
///     "rejected {} singular draws", 12);
/// ```
#[macro_export]
macro_rules! report_violation {
    ($severity:expr, $kind:expr, $msg:literal) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::Violation::new(
            $severity,
            $kind,
            $msg,
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};

    ($severity:expr, $kind:expr, $fmt:literal, $($arg:tt)+) => {{
        use $crate::telemetry::ViolationObserver as _;
        let violation = $crate::telemetry::Violation::new(
            $severity,
            $kind,
            format!($fmt, $($arg)+),
            concat!(file!(), ":", line!()),
        );
        $crate::telemetry::TracingObserver.on_violation(&violation);
    }};
}

/// Reports a prepared violation to tracing and, if present, to an extra observer.
pub fn report_to_observer<O: ViolationObserver + ?Sized>(
    observer: Option<&O>,
    violation: &Violation,
) {
    TracingObserver.on_violation(violation);
    if let Some(observer) = observer {
        observer.on_violation(violation);
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_severity_ordering() {
        assert!(ViolationSeverity::Warning < ViolationSeverity::Error);
        assert!(ViolationSeverity::Error < ViolationSeverity::Critical);
    }

    #[test]
    fn test_violation_display_includes_context() {
        let v = Violation::new(
            ViolationSeverity::Critical,
            ViolationKind::Unsatisfiability,
            "sat verdict",
            "x.rs:1",
        )
        .with_discriminant(9)
        .with_context("matrix", "[[1, 0], [0, 1]]");

        let text = v.to_string();
        assert!(text.starts_with("[critical/unsatisfiability] sat verdict (at x.rs:1"));
        assert!(text.contains("d=9"));
        assert!(text.contains("matrix"));
    }

    #[test]
    fn test_collecting_observer_filters_by_severity() {
        let observer = CollectingObserver::new();
        observer.on_violation(&Violation::new(
            ViolationSeverity::Warning,
            ViolationKind::Sampling,
            "w",
            "a:1",
        ));
        observer.on_violation(&Violation::new(
            ViolationSeverity::Critical,
            ViolationKind::Unsatisfiability,
            "c",
            "a:2",
        ));

        assert_eq!(observer.len(), 2);
        assert_eq!(
            observer
                .violations_at_severity(ViolationSeverity::Error)
                .len(),
            1
        );
        observer.clear();
        assert!(observer.is_empty());
    }

    #[test]
    fn test_report_to_observer_forwards() {
        let observer = Arc::new(CollectingObserver::new());
        let v = Violation::new(
            ViolationSeverity::Error,
            ViolationKind::Solver,
            "crash",
            "b:3",
        );
        report_to_observer(Some(observer.as_ref()), &v);
        report_to_observer::<CollectingObserver>(None, &v);
        assert_eq!(observer.len(), 1);
        assert!(observer.has_violation(ViolationKind::Solver));
    }

    #[test]
    fn test_report_violation_macro_compiles_both_arms() {
        report_violation!(
            ViolationSeverity::Warning,
            ViolationKind::Configuration,
            "plain message"
        );
        report_violation!(
            ViolationSeverity::Warning,
            ViolationKind::Configuration,
            "formatted {}",
            1
        );
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ViolationKind::Unsatisfiability).unwrap();
        assert_eq!(json, "\"unsatisfiability\"");
    }
}
