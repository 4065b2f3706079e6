//! Seed generation: degenerate Pell systems that have no positive solution.
//!
//! A seed is the conjunction `x > 0, y > 0, x^2 - D*y^2 == 1` with `D = k^2`.
//! Factoring gives `(x - k*y)(x + k*y) = 1`, which over the integers forces
//! `x - k*y = x + k*y = ±1` and hence `y = 0`, contradicting `y > 0`. Only perfect
//! squares are ever accepted: for non-square `D` the classical Pell equation has
//! infinitely many solutions.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::expr::{Constraint, ConstraintSet, Term, Var};
use crate::rng::Rng;
use crate::PellError;

/// Largest root used by [`GeneratorMode::Complete`] (so `D <= 49`).
pub const COMPLETE_MAX_ROOT: u32 = 7;

/// Upper bound on seed roots, keeping `D` and every expanded coefficient well inside `i64`.
pub const MAX_SEED_ROOT: i64 = 10_000;

/// Which seeds the generator enumerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
    /// A single seed with `D = 1`.
    Simple,
    /// Seeds with `D = k^2` for `k = 1..=max_root` (default 7).
    Complete,
}

impl GeneratorMode {
    /// Mode selector as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            GeneratorMode::Simple => "simple",
            GeneratorMode::Complete => "complete",
        }
    }
}

impl fmt::Display for GeneratorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorMode {
    type Err = PellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(GeneratorMode::Simple),
            "complete" => Ok(GeneratorMode::Complete),
            other => Err(PellError::InvalidMode {
                mode: other.to_owned(),
            }),
        }
    }
}

/// An unsatisfiable seed system `x > 0, y > 0, x^2 - D*y^2 == 1` with `D = root^2`.
#[derive(Debug, Clone)]
pub struct PellSeed {
    root: i64,
    d: i64,
    x: Var,
    y: Var,
    constraints: ConstraintSet,
}

impl PellSeed {
    /// Builds the seed for `D = root^2`.
    pub fn from_root(root: i64) -> Result<Self, PellError> {
        if root < 1 {
            return Err(PellError::InvalidRoot {
                root,
                reason: "root must be at least 1".to_owned(),
            });
        }
        if root > MAX_SEED_ROOT {
            return Err(PellError::InvalidRoot {
                root,
                reason: format!("root must not exceed {}", MAX_SEED_ROOT),
            });
        }

        let d = root * root;
        let x = Var::fresh("x");
        let y = Var::fresh("y");

        let pell = Constraint::eq(
            Term::square(Term::var(&x)) - Term::constant(d) * Term::square(Term::var(&y)),
            Term::constant(1),
        );
        let mut constraints = ConstraintSet::new();
        constraints.push(Constraint::positive(Term::var(&x)));
        constraints.push(Constraint::positive(Term::var(&y)));
        constraints.push(pell);

        Ok(Self {
            root,
            d,
            x,
            y,
            constraints,
        })
    }

    /// Builds the seed for discriminant `d`, which must be a positive perfect square.
    pub fn new(d: i64) -> Result<Self, PellError> {
        match exact_sqrt(d) {
            Some(root) if root >= 1 => Self::from_root(root),
            _ => Err(PellError::NonSquareDiscriminant { d }),
        }
    }

    /// Picks a uniformly random square discriminant within `range`.
    ///
    /// Fails when the range contains no positive perfect square.
    pub fn random_in_range<R: Rng + ?Sized>(
        range: RangeInclusive<i64>,
        rng: &mut R,
    ) -> Result<Self, PellError> {
        let roots = square_roots_in(&range)?;
        Self::from_root(rng.gen_range_i64_inclusive(roots))
    }

    /// The discriminant `D`.
    #[must_use]
    pub fn d(&self) -> i64 {
        self.d
    }

    /// `k` with `D = k^2`.
    #[must_use]
    pub fn root(&self) -> i64 {
        self.root
    }

    /// The seed variables `(x, y)`.
    #[must_use]
    pub fn vars(&self) -> (&Var, &Var) {
        (&self.x, &self.y)
    }

    /// `[x > 0, y > 0, x^2 - D*y^2 == 1]`.
    #[must_use]
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Human-readable form, e.g. `x > 0, y > 0, x^2 - 4*y^2 == 1`.
    #[must_use]
    pub fn description(&self) -> String {
        format!(
            "{} > 0, {} > 0, {}^2 - {}*{}^2 == 1",
            self.x, self.y, self.x, self.d, self.y
        )
    }

    /// Evaluates `x^2 - D*y^2`, or `None` on overflow.
    #[must_use]
    pub fn pell_value(&self, x: i128, y: i128) -> Option<i128> {
        let x2 = x.checked_mul(x)?;
        let dy2 = i128::from(self.d).checked_mul(y.checked_mul(y)?)?;
        x2.checked_sub(dy2)
    }
}

impl fmt::Display for PellSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

/// Lazy, finite, restartable sequence of seeds.
///
/// Cloning an unstarted sequence yields the same `D` values again, each with fresh
/// variable identities.
#[derive(Debug, Clone)]
pub struct PellSeeds {
    mode: GeneratorMode,
    next_root: u32,
    max_root: u32,
}

impl PellSeeds {
    /// Overrides the upper root bound (only meaningful for `Complete`).
    #[must_use]
    pub fn with_max_root(mut self, max_root: u32) -> Self {
        if self.mode == GeneratorMode::Complete {
            self.max_root = max_root.min(MAX_SEED_ROOT as u32);
        }
        self
    }

    /// The mode this sequence enumerates.
    #[must_use]
    pub fn mode(&self) -> GeneratorMode {
        self.mode
    }

    fn for_mode(mode: GeneratorMode) -> Self {
        let max_root = match mode {
            GeneratorMode::Simple => 1,
            GeneratorMode::Complete => COMPLETE_MAX_ROOT,
        };
        Self {
            mode,
            next_root: 1,
            max_root,
        }
    }
}

impl Iterator for PellSeeds {
    type Item = PellSeed;

    fn next(&mut self) -> Option<PellSeed> {
        if self.next_root > self.max_root {
            return None;
        }
        let root = self.next_root;
        self.next_root += 1;
        // Roots are bounded by MAX_SEED_ROOT, so construction cannot fail here.
        PellSeed::from_root(i64::from(root)).ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.max_root + 1).saturating_sub(self.next_root) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PellSeeds {}

/// Enumerates the seeds for `mode`.
///
/// ```
/// use opaque_pell::{pell_seeds, GeneratorMode};
///
/// let ds: Vec<i64> = pell_seeds(GeneratorMode::Complete).map(|s| s.d()).collect();
/// assert_eq!(ds, vec![1, 4, 9, 16, 25, 36, 49]);
/// ```
#[must_use]
pub fn pell_seeds(mode: GeneratorMode) -> PellSeeds {
    PellSeeds::for_mode(mode)
}

/// Parses a mode selector and enumerates its seeds.
///
/// An unknown selector fails before any seed is produced.
pub fn pell_seeds_from_str(mode: &str) -> Result<PellSeeds, PellError> {
    Ok(pell_seeds(mode.parse()?))
}

/// Roots `k` in `1..=MAX_SEED_ROOT` whose square lies in `range`.
///
/// ```
/// use opaque_pell::seed::square_roots_in;
///
/// assert_eq!(square_roots_in(&(1..=100)).unwrap(), 1..=10);
/// assert_eq!(square_roots_in(&(5..=30)).unwrap(), 3..=5);
/// assert!(square_roots_in(&(2..=3)).is_err());
/// ```
pub fn square_roots_in(range: &RangeInclusive<i64>) -> Result<RangeInclusive<i64>, PellError> {
    let (low, high) = (*range.start(), *range.end());
    if high < 1 || low > high {
        return Err(PellError::InvalidRoot {
            root: high,
            reason: format!("range [{}, {}] contains no positive square", low, high),
        });
    }
    let min_root = ceil_sqrt(low.max(1));
    let max_root = floor_sqrt(high).min(MAX_SEED_ROOT);
    if min_root > max_root {
        return Err(PellError::InvalidRoot {
            root: min_root,
            reason: format!("range [{}, {}] contains no usable square", low, high),
        });
    }
    Ok(min_root..=max_root)
}

fn floor_sqrt(n: i64) -> i64 {
    if n < 1 {
        return 0;
    }
    // f64 gets within one of the answer for any i64; fix up exactly.
    let mut r = (n as f64).sqrt() as i64;
    while r > 0 && r.checked_mul(r).map_or(true, |sq| sq > n) {
        r -= 1;
    }
    while (r + 1).checked_mul(r + 1).is_some_and(|sq| sq <= n) {
        r += 1;
    }
    r
}

fn ceil_sqrt(n: i64) -> i64 {
    let r = floor_sqrt(n);
    if r * r == n {
        r
    } else {
        r + 1
    }
}

/// Returns `k` if `n == k^2` for some `k >= 0`.
#[must_use]
pub fn exact_sqrt(n: i64) -> Option<i64> {
    if n < 0 {
        return None;
    }
    let r = floor_sqrt(n);
    (r * r == n).then_some(r)
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

    #[test]
    fn test_simple_mode_yields_single_unit_seed() {
        let seeds: Vec<PellSeed> = pell_seeds(GeneratorMode::Simple).collect();
        assert_eq!(seeds.len(), 1);
        assert_eq!(seeds[0].d(), 1);
        assert_eq!(seeds[0].root(), 1);
    }

    #[test]
    fn test_complete_mode_yields_squares_up_to_49() {
        let ds: Vec<i64> = pell_seeds(GeneratorMode::Complete).map(|s| s.d()).collect();
        assert_eq!(ds, vec![1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn test_with_max_root_tunes_complete_only() {
        let ds: Vec<i64> = pell_seeds(GeneratorMode::Complete)
            .with_max_root(3)
            .map(|s| s.d())
            .collect();
        assert_eq!(ds, vec![1, 4, 9]);

        let simple = pell_seeds(GeneratorMode::Simple).with_max_root(5);
        assert_eq!(simple.len(), 1);
    }

    #[test]
    fn test_exact_size_and_restart() {
        let seeds = pell_seeds(GeneratorMode::Complete);
        assert_eq!(seeds.len(), 7);
        let restart = seeds.clone();
        let first: Vec<i64> = seeds.map(|s| s.d()).collect();
        let second: Vec<i64> = restart.map(|s| s.d()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_each_seed_has_fresh_vars() {
        let mut seeds = pell_seeds(GeneratorMode::Complete);
        let a = seeds.next().unwrap();
        let b = seeds.next().unwrap();
        assert_ne!(a.vars().0, b.vars().0);
        assert_eq!(a.vars().0.name(), "x");
        assert_eq!(a.vars().1.name(), "y");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "simple".parse::<GeneratorMode>().unwrap(),
            GeneratorMode::Simple
        );
        assert_eq!(
            "complete".parse::<GeneratorMode>().unwrap(),
            GeneratorMode::Complete
        );
        assert_eq!(
            "Complete".parse::<GeneratorMode>(),
            Err(PellError::InvalidMode {
                mode: "Complete".to_owned()
            })
        );
        assert!(pell_seeds_from_str("exhaustive").is_err());
        assert_eq!(pell_seeds_from_str("simple").unwrap().len(), 1);
    }

    #[test]
    fn test_seed_constraints_and_description() {
        let seed = PellSeed::from_root(2).unwrap();
        assert_eq!(seed.constraints().len(), 3);
        assert_eq!(seed.description(), "x > 0, y > 0, x^2 - 4*y^2 == 1");
        let rendered: Vec<String> = seed.constraints().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["x > 0", "y > 0", "x^2 - 4*y^2 == 1"]);
    }

    #[test]
    fn test_non_square_rejected() {
        for d in [2, 3, 5, 8, 10, 48, 50, 61] {
            assert_eq!(
                PellSeed::new(d).unwrap_err(),
                PellError::NonSquareDiscriminant { d }
            );
        }
        assert!(PellSeed::new(0).is_err());
        assert!(PellSeed::new(-4).is_err());
        assert_eq!(PellSeed::new(36).unwrap().root(), 6);
    }

    #[test]
    fn test_root_bounds() {
        assert!(PellSeed::from_root(0).is_err());
        assert!(PellSeed::from_root(-3).is_err());
        assert!(PellSeed::from_root(MAX_SEED_ROOT).is_ok());
        assert!(PellSeed::from_root(MAX_SEED_ROOT + 1).is_err());
    }

    #[test]
    fn test_pell_value_matches_constraint() {
        let seed = PellSeed::from_root(3).unwrap();
        let (x, y) = seed.vars();
        let pell = &seed.constraints()[2];
        for (xv, yv) in [(1i128, 0i128), (3, 1), (10, 3), (28, 9)] {
            let expected = seed.pell_value(xv, yv) == Some(1);
            assert_eq!(pell.holds(&[(x, xv), (y, yv)]), Some(expected));
        }
    }

    #[test]
    fn test_trivial_solution_excluded_by_domain() {
        // (1, 0) solves the equation but violates y > 0
        let seed = PellSeed::from_root(1).unwrap();
        let (x, y) = seed.vars();
        assert_eq!(seed.constraints()[2].holds(&[(x, 1), (y, 0)]), Some(true));
        assert_eq!(seed.constraints()[1].holds(&[(x, 1), (y, 0)]), Some(false));
    }

    #[test]
    fn test_random_in_range_picks_squares() {
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..200 {
            let seed = PellSeed::random_in_range(1..=100, &mut rng).unwrap();
            assert!((1..=100).contains(&seed.d()));
            assert_eq!(exact_sqrt(seed.d()), Some(seed.root()));
        }
    }

    #[test]
    fn test_square_roots_in_caps_at_max_root() {
        assert_eq!(square_roots_in(&(1..=1)).unwrap(), 1..=1);
        assert_eq!(square_roots_in(&(-5..=4)).unwrap(), 1..=2);
        assert_eq!(
            square_roots_in(&(1..=i64::MAX)).unwrap(),
            1..=MAX_SEED_ROOT
        );
        assert!(square_roots_in(&(10..=5)).is_err());
    }

    #[test]
    fn test_random_in_range_without_squares_fails() {
        let mut rng = Pcg32::seed_from_u64(11);
        assert!(PellSeed::random_in_range(2..=3, &mut rng).is_err());
        assert!(PellSeed::random_in_range(-10..=0, &mut rng).is_err());
        assert_eq!(
            PellSeed::random_in_range(10..=16, &mut rng).unwrap().d(),
            16
        );
    }

    #[test]
    fn test_exact_sqrt() {
        assert_eq!(exact_sqrt(0), Some(0));
        assert_eq!(exact_sqrt(49), Some(7));
        assert_eq!(exact_sqrt(50), None);
        assert_eq!(exact_sqrt(-1), None);
        assert_eq!(exact_sqrt(3_037_000_499 * 3_037_000_499), Some(3_037_000_499));
        assert_eq!(exact_sqrt(i64::MAX), None);
    }
}
