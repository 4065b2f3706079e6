//! Invertible integer substitutions and their rejection sampler.

use std::fmt;
use std::ops::RangeInclusive;

use crate::rng::Rng;
use crate::telemetry::{ViolationKind, ViolationSeverity};
use crate::{report_violation, PellError};

/// Default bound on sampling draws before [`PellError::MatrixSamplingExhausted`].
pub const DEFAULT_MAX_SAMPLING_ATTEMPTS: u32 = 10_000;

/// The substitution `x = a*u + b*v`, `y = c*u + d*v`.
///
/// The determinant `a*d - b*c` is never zero. Unimodularity (`|det| = 1`) is not
/// required: the disguise only relies on the forward map from `(u, v)` to `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct TransformMatrix {
    a: i64,
    b: i64,
    c: i64,
    d: i64,
}

impl TransformMatrix {
    /// Builds the matrix `[[a, b], [c, d]]`, rejecting a zero determinant.
    pub fn new(a: i64, b: i64, c: i64, d: i64) -> Result<Self, PellError> {
        let matrix = Self { a, b, c, d };
        if matrix.determinant() == 0 {
            return Err(PellError::SingularMatrix { a, b, c, d });
        }
        Ok(matrix)
    }

    /// The identity substitution. A valid but trivially weak disguise.
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            a: 1,
            b: 0,
            c: 0,
            d: 1,
        }
    }

    /// Entries as `(a, b, c, d)`.
    #[must_use]
    pub const fn entries(&self) -> (i64, i64, i64, i64) {
        (self.a, self.b, self.c, self.d)
    }

    /// `a*d - b*c`, computed without overflow.
    #[must_use]
    pub fn determinant(&self) -> i128 {
        i128::from(self.a) * i128::from(self.d) - i128::from(self.b) * i128::from(self.c)
    }

    /// True when `|det| = 1`, i.e. the substitution is a bijection on `Z^2`.
    #[must_use]
    pub fn is_unimodular(&self) -> bool {
        self.determinant().abs() == 1
    }

    /// Maps `(u, v)` to `(x, y)`. `None` on overflow.
    #[must_use]
    pub fn apply(&self, u: i128, v: i128) -> Option<(i128, i128)> {
        let x = i128::from(self.a)
            .checked_mul(u)?
            .checked_add(i128::from(self.b).checked_mul(v)?)?;
        let y = i128::from(self.c)
            .checked_mul(u)?
            .checked_add(i128::from(self.d).checked_mul(v)?)?;
        Some((x, y))
    }
}

impl fmt::Display for TransformMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[[{}, {}], [{}, {}]]", self.a, self.b, self.c, self.d)
    }
}

/// Inclusive range for sampled matrix entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct EntryRange {
    /// Smallest entry (inclusive).
    pub min: i64,
    /// Largest entry (inclusive).
    pub max: i64,
}

impl Default for EntryRange {
    fn default() -> Self {
        Self { min: -10, max: 10 }
    }
}

impl EntryRange {
    /// Builds and validates `[min, max]`.
    pub fn new(min: i64, max: i64) -> Result<Self, PellError> {
        let range = Self { min, max };
        range.validate()?;
        Ok(range)
    }

    /// Symmetric range `[-bound, bound]`.
    pub fn symmetric(bound: i64) -> Result<Self, PellError> {
        Self::new(bound.saturating_neg(), bound)
    }

    /// Rejects ranges that can never yield an invertible matrix.
    ///
    /// A single value `k` only gives `[[k, k], [k, k]]`, which is singular. Two
    /// distinct values `p`, `q` admit `[[p, q], [q, p]]` (determinant `p^2 - q^2`),
    /// or `[[q, q], [p, q]]` (determinant `2*q^2`) when `p = -q`.
    pub fn validate(&self) -> Result<(), PellError> {
        if self.min > self.max {
            return Err(PellError::InvalidEntryRange {
                min: self.min,
                max: self.max,
                reason: "range is empty".to_owned(),
            });
        }
        if self.min == self.max {
            return Err(PellError::InvalidEntryRange {
                min: self.min,
                max: self.max,
                reason: "a single value only yields singular matrices".to_owned(),
            });
        }
        Ok(())
    }

    /// Largest absolute value of any entry.
    #[must_use]
    pub fn max_abs(&self) -> u64 {
        self.min.unsigned_abs().max(self.max.unsigned_abs())
    }

    /// As a std range.
    #[must_use]
    pub fn as_range(&self) -> RangeInclusive<i64> {
        self.min..=self.max
    }
}

/// Bounded rejection sampler for nonzero-determinant matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixSampler {
    range: EntryRange,
    max_attempts: u32,
}

impl Default for MatrixSampler {
    fn default() -> Self {
        Self {
            range: EntryRange::default(),
            max_attempts: DEFAULT_MAX_SAMPLING_ATTEMPTS,
        }
    }
}

impl MatrixSampler {
    /// Sampler over `range` with the default attempt bound.
    pub fn new(range: EntryRange) -> Result<Self, PellError> {
        range.validate()?;
        Ok(Self {
            range,
            max_attempts: DEFAULT_MAX_SAMPLING_ATTEMPTS,
        })
    }

    /// Overrides the attempt bound (at least one draw is always made).
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// The entry range.
    #[must_use]
    pub fn range(&self) -> EntryRange {
        self.range
    }

    /// The attempt bound.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Draws `a, b, c, d` uniformly from the range until the determinant is nonzero.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TransformMatrix, PellError> {
        self.range.validate()?;
        let range = self.range.as_range();
        let warn_at = self.max_attempts / 10 * 9;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 && attempt == warn_at {
                tracing::warn!(
                    attempt,
                    max_attempts = self.max_attempts,
                    min = self.range.min,
                    max = self.range.max,
                    "matrix sampling close to exhaustion"
                );
            }
            let a = rng.gen_range_i64_inclusive(range.clone());
            let b = rng.gen_range_i64_inclusive(range.clone());
            let c = rng.gen_range_i64_inclusive(range.clone());
            let d = rng.gen_range_i64_inclusive(range.clone());
            match TransformMatrix::new(a, b, c, d) {
                Ok(matrix) => {
                    if attempt > 1 {
                        tracing::trace!(attempt, %matrix, "sampled invertible matrix");
                    }
                    return Ok(matrix);
                }
                Err(_) => {
                    tracing::trace!(attempt, a, b, c, d, "rejected singular matrix");
                }
            }
        }

        report_violation!(
            ViolationSeverity::Error,
            ViolationKind::Sampling,
            "no invertible matrix in [{}, {}] after {} draws",
            self.range.min,
            self.range.max,
            self.max_attempts
        );
        Err(PellError::MatrixSamplingExhausted {
            attempts: self.max_attempts,
            min: self.range.min,
            max: self.range.max,
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::rng::{Pcg32, SeedableRng};

    /// Always returns the same word, so every draw lands on the same entry.
    struct ConstantRng(u64);

    impl Rng for ConstantRng {
        fn next_u32(&mut self) -> u32 {
            self.0 as u32
        }

        fn next_u64(&mut self) -> u64 {
            self.0
        }
    }

    #[test]
    fn test_singular_rejected() {
        assert_eq!(
            TransformMatrix::new(1, 2, 2, 4),
            Err(PellError::SingularMatrix {
                a: 1,
                b: 2,
                c: 2,
                d: 4
            })
        );
        assert!(TransformMatrix::new(0, 0, 0, 0).is_err());
    }

    #[test]
    fn test_determinant_and_unimodular() {
        let m = TransformMatrix::new(2, 1, 1, 1).unwrap();
        assert_eq!(m.determinant(), 1);
        assert!(m.is_unimodular());

        let m = TransformMatrix::new(3, 0, 0, 2).unwrap();
        assert_eq!(m.determinant(), 6);
        assert!(!m.is_unimodular());

        assert!(TransformMatrix::identity().is_unimodular());
    }

    #[test]
    fn test_determinant_does_not_overflow() {
        let m = TransformMatrix::new(i64::MAX, i64::MIN, i64::MIN, i64::MAX).unwrap();
        assert!(m.determinant() < 0);
    }

    #[test]
    fn test_apply() {
        let m = TransformMatrix::new(2, -3, 1, 5).unwrap();
        assert_eq!(m.apply(1, 1), Some((-1, 6)));
        assert_eq!(TransformMatrix::identity().apply(7, -4), Some((7, -4)));
        assert_eq!(m.apply(i128::MAX, 0), None);
    }

    #[test]
    fn test_display_grid() {
        let m = TransformMatrix::new(-1, 2, 3, -4).unwrap();
        assert_eq!(m.to_string(), "[[-1, 2], [3, -4]]");
    }

    #[test]
    fn test_entry_range_validation() {
        assert_eq!(EntryRange::default().as_range(), -10..=10);
        assert!(EntryRange::new(0, 0).is_err());
        assert!(EntryRange::new(5, -5).is_err());
        assert!(EntryRange::new(0, 1).is_ok());
        assert!(EntryRange::new(-1, 0).is_ok());
        assert!(EntryRange::new(i64::MIN, i64::MAX).is_ok());
        assert_eq!(EntryRange::new(-7, 3).unwrap().max_abs(), 7);
        assert_eq!(EntryRange::new(i64::MIN, 0).unwrap().max_abs(), 1 << 63);
    }

    #[test]
    fn test_single_value_ranges_rejected() {
        for k in [-3, 1, 5, i64::MAX] {
            assert!(
                matches!(
                    EntryRange::new(k, k),
                    Err(PellError::InvalidEntryRange { .. })
                ),
                "{{{}}} accepted",
                k
            );
            assert!(MatrixSampler::new(EntryRange { min: k, max: k }).is_err());
        }
    }

    #[test]
    fn test_two_value_ranges_always_sample() {
        // Includes the p = -q case, where only mixed matrices are invertible.
        for (min, max) in [(-1, 1), (1, 2), (0, 1), (-5, -4), (-1, 0)] {
            let sampler = MatrixSampler::new(EntryRange::new(min, max).unwrap()).unwrap();
            let mut rng = Pcg32::seed_from_u64(3);
            for _ in 0..200 {
                let m = sampler.sample(&mut rng).unwrap();
                assert_ne!(m.determinant(), 0);
            }
        }
        assert_eq!(EntryRange::symmetric(4).unwrap(), EntryRange { min: -4, max: 4 });
    }

    #[test]
    fn test_sampler_fails_fast_on_zero_range() {
        let sampler = MatrixSampler {
            range: EntryRange { min: 0, max: 0 },
            max_attempts: 10,
        };
        let mut rng = Pcg32::seed_from_u64(1);
        assert!(matches!(
            sampler.sample(&mut rng),
            Err(PellError::InvalidEntryRange { .. })
        ));
    }

    #[test]
    fn test_sampler_exhaustion_is_explicit() {
        // Every draw is the same value, so every matrix is singular.
        let sampler = MatrixSampler::new(EntryRange::new(1, 2).unwrap())
            .unwrap()
            .with_max_attempts(25);
        let mut rng = ConstantRng(0);
        assert_eq!(
            sampler.sample(&mut rng),
            Err(PellError::MatrixSamplingExhausted {
                attempts: 25,
                min: 1,
                max: 2
            })
        );
    }

    #[test]
    fn test_sampler_is_reproducible() {
        let sampler = MatrixSampler::default();
        let mut rng1 = Pcg32::seed_from_u64(2024);
        let mut rng2 = Pcg32::seed_from_u64(2024);
        for _ in 0..50 {
            assert_eq!(
                sampler.sample(&mut rng1).unwrap(),
                sampler.sample(&mut rng2).unwrap()
            );
        }
    }

    #[test]
    fn test_sampler_never_returns_singular() {
        let sampler = MatrixSampler::default();
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..5000 {
            let m = sampler.sample(&mut rng).unwrap();
            assert_ne!(m.determinant(), 0);
            let (a, b, c, d) = m.entries();
            for entry in [a, b, c, d] {
                assert!((-10..=10).contains(&entry));
            }
        }
    }

    #[test]
    fn test_with_max_attempts_floor() {
        assert_eq!(MatrixSampler::default().with_max_attempts(0).max_attempts(), 1);
    }
}
