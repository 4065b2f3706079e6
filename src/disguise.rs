//! The disguise transform: an invertible linear change of variables applied to a seed.
//!
//! Substituting `x = a*u + b*v`, `y = c*u + d*v` into a seed gives
//!
//! ```text
//! a*u + b*v > 0,  c*u + d*v > 0,  (a*u + b*v)^2 - D*(c*u + d*v)^2 == 1
//! ```
//!
//! Any integer `(u, v)` satisfying that system maps to an integer `(x, y)` satisfying
//! the seed, which has no solution, so the disguise has none either. The domain
//! constraints must travel with the equation: the equation alone is satisfiable
//! (`u^2 - v^2 == 1` at `(1, 0)` for the identity matrix).

use std::fmt;
use std::ops::RangeInclusive;

use crate::expr::{Constraint, ConstraintSet, Term, Var};
use crate::hash::fnv1a_hash;
use crate::matrix::{MatrixSampler, TransformMatrix};
use crate::rng::Rng;
use crate::seed::PellSeed;
use crate::PellError;

/// Which rendering of the disguised equation gets submitted to a solver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionForm {
    /// `(a*u + b*v)^2 - D*(c*u + d*v)^2 == 1`, left unexpanded.
    #[default]
    Product,
    /// `coef_uu*u^2 + coef_uv*u*v + coef_vv*v^2 == 1`.
    Expanded,
}

/// Fully expanded quadratic form `coef_uu*u^2 + coef_uv*u*v + coef_vv*v^2 == rhs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct QuadraticForm {
    /// Coefficient of `u^2`: `a^2 - D*c^2`.
    pub coef_uu: i64,
    /// Coefficient of `u*v`: `2*a*b - 2*D*c*d`.
    pub coef_uv: i64,
    /// Coefficient of `v^2`: `b^2 - D*d^2`.
    pub coef_vv: i64,
    /// Right-hand side (always 1 for a Pell disguise).
    pub rhs: i64,
}

impl QuadraticForm {
    /// Expands `(a*u + b*v)^2 - D*(c*u + d*v)^2 == 1`.
    pub fn expand(d: i64, matrix: &TransformMatrix) -> Result<Self, PellError> {
        let (a, b, c, dd) = matrix.entries();
        let overflow = |what: &str| PellError::CoefficientOverflow {
            context: format!("{} for D={} and matrix {}", what, d, matrix),
        };

        let coef_uu = a
            .checked_mul(a)
            .zip(c.checked_mul(c).and_then(|c2| c2.checked_mul(d)))
            .and_then(|(a2, dc2)| a2.checked_sub(dc2))
            .ok_or_else(|| overflow("coef_uu"))?;
        let coef_uv = a
            .checked_mul(b)
            .and_then(|ab| ab.checked_mul(2))
            .zip(
                c.checked_mul(dd)
                    .and_then(|cd| cd.checked_mul(d))
                    .and_then(|dcd| dcd.checked_mul(2)),
            )
            .and_then(|(two_ab, two_dcd)| two_ab.checked_sub(two_dcd))
            .ok_or_else(|| overflow("coef_uv"))?;
        let coef_vv = b
            .checked_mul(b)
            .zip(dd.checked_mul(dd).and_then(|d2| d2.checked_mul(d)))
            .and_then(|(b2, dd2)| b2.checked_sub(dd2))
            .ok_or_else(|| overflow("coef_vv"))?;

        Ok(Self {
            coef_uu,
            coef_uv,
            coef_vv,
            rhs: 1,
        })
    }

    /// `coef_uu*u^2 + coef_uv*u*v + coef_vv*v^2`, or `None` on overflow.
    #[must_use]
    pub fn evaluate(&self, u: i128, v: i128) -> Option<i128> {
        let uu = i128::from(self.coef_uu).checked_mul(u.checked_mul(u)?)?;
        let uv = i128::from(self.coef_uv).checked_mul(u.checked_mul(v)?)?;
        let vv = i128::from(self.coef_vv).checked_mul(v.checked_mul(v)?)?;
        uu.checked_add(uv)?.checked_add(vv)
    }

    /// The equation as a constraint over `u`, `v`.
    #[must_use]
    pub fn to_constraint(&self, u: &Var, v: &Var) -> Constraint {
        let monomials = [
            (self.coef_uu, Term::square(Term::var(u))),
            (self.coef_uv, Term::var(u) * Term::var(v)),
            (self.coef_vv, Term::square(Term::var(v))),
        ];
        let lhs = monomials
            .into_iter()
            .filter(|(coef, _)| *coef != 0)
            .map(|(coef, mono)| Term::constant(coef) * mono)
            .reduce(|acc, term| acc + term)
            .unwrap_or(Term::Const(0));
        Constraint::eq(lhs, Term::constant(self.rhs))
    }

    /// Renders with the given variable names, e.g. `3*u^2 - 4*u*v + v^2 == 1`.
    #[must_use]
    pub fn render(&self, u: &str, v: &str) -> String {
        let monomials = [
            (self.coef_uu, format!("{u}^2")),
            (self.coef_uv, format!("{u}*{v}")),
            (self.coef_vv, format!("{v}^2")),
        ];

        let mut out = String::new();
        for (coef, mono) in monomials.iter().filter(|(coef, _)| *coef != 0) {
            let magnitude = coef.unsigned_abs();
            let sign = if *coef < 0 { "-" } else { "+" };
            if out.is_empty() {
                if *coef < 0 {
                    out.push('-');
                }
            } else {
                out.push(' ');
                out.push_str(sign);
                out.push(' ');
            }
            if magnitude != 1 {
                out.push_str(&magnitude.to_string());
                out.push('*');
            }
            out.push_str(mono);
        }
        if out.is_empty() {
            out.push('0');
        }
        out.push_str(" == ");
        out.push_str(&self.rhs.to_string());
        out
    }
}

impl fmt::Display for QuadraticForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render("u", "v"))
    }
}

/// A seed rewritten in fresh variables `(u, v)` under an invertible substitution.
#[derive(Debug, Clone)]
pub struct DisguisedConstraint {
    d: i64,
    matrix: TransformMatrix,
    u: Var,
    v: Var,
    domain: [Constraint; 2],
    equation: Constraint,
    description: String,
}

impl DisguisedConstraint {
    /// The seed discriminant.
    #[must_use]
    pub fn d(&self) -> i64 {
        self.d
    }

    /// The substitution used.
    #[must_use]
    pub fn matrix(&self) -> TransformMatrix {
        self.matrix
    }

    /// The new variables `(u, v)`.
    #[must_use]
    pub fn vars(&self) -> (&Var, &Var) {
        (&self.u, &self.v)
    }

    /// `[a*u + b*v > 0, c*u + d*v > 0]`, the images of `x > 0` and `y > 0`.
    #[must_use]
    pub fn domain(&self) -> &[Constraint; 2] {
        &self.domain
    }

    /// `(a*u + b*v)^2 - D*(c*u + d*v)^2 == 1`.
    #[must_use]
    pub fn equation(&self) -> &Constraint {
        &self.equation
    }

    /// `u, v ∈ Z, new constraint: (...)^2 - D*(...)^2 == 1`.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The expanded quadratic form of the equation.
    pub fn expanded(&self) -> Result<QuadraticForm, PellError> {
        QuadraticForm::expand(self.d, &self.matrix)
    }

    /// Domain constraints followed by the product-form equation.
    #[must_use]
    pub fn constraints(&self) -> ConstraintSet {
        let mut set: ConstraintSet = self.domain.iter().cloned().collect();
        set.push(self.equation.clone());
        set
    }

    /// Domain constraints followed by the expanded equation.
    pub fn expanded_constraints(&self) -> Result<ConstraintSet, PellError> {
        let form = self.expanded()?;
        let mut set: ConstraintSet = self.domain.iter().cloned().collect();
        set.push(form.to_constraint(&self.u, &self.v));
        Ok(set)
    }

    /// The conjunction for the requested submission form.
    pub fn submission(&self, form: SubmissionForm) -> Result<ConstraintSet, PellError> {
        match form {
            SubmissionForm::Product => Ok(self.constraints()),
            SubmissionForm::Expanded => self.expanded_constraints(),
        }
    }

    /// Stable identifier of `(D, matrix)`, equal across runs and machines.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let (a, b, c, d) = self.matrix.entries();
        fnv1a_hash(&(self.d, [a, b, c, d]))
    }
}

impl fmt::Display for DisguisedConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

/// Applies `matrix` to `seed`. Pure apart from allocating fresh `u`, `v`.
#[must_use]
pub fn disguise_with(seed: &PellSeed, matrix: TransformMatrix) -> DisguisedConstraint {
    let (a, b, c, d) = matrix.entries();
    let u = Var::fresh("u");
    let v = Var::fresh("v");

    let x_image = Term::linear(a, &u, b, &v);
    let y_image = Term::linear(c, &u, d, &v);

    let domain = [
        Constraint::positive(x_image.clone()),
        Constraint::positive(y_image.clone()),
    ];
    let equation = Constraint::eq(
        Term::square(x_image) - Term::constant(seed.d()) * Term::square(y_image),
        Term::constant(1),
    );
    let description = format!("{u}, {v} ∈ Z, new constraint: {equation}");

    DisguisedConstraint {
        d: seed.d(),
        matrix,
        u,
        v,
        domain,
        equation,
        description,
    }
}

/// Disguises seeds with matrices drawn from an injected RNG.
///
/// ```
/// use opaque_pell::{DisguiseTransformer, PellSeed, TransformMatrix};
/// use opaque_pell::rng::{Pcg32, SeedableRng};
///
/// let seed = PellSeed::new(4)?;
/// let mut transformer = DisguiseTransformer::new(Pcg32::seed_from_u64(7));
///
/// let random = transformer.disguise(&seed, None)?;
/// assert_ne!(random.matrix().determinant(), 0);
///
/// let fixed = transformer.disguise(&seed, Some(TransformMatrix::identity()))?;
/// assert_eq!(fixed.expanded()?.to_string(), "u^2 - 4*v^2 == 1");
/// # Ok::<(), opaque_pell::PellError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DisguiseTransformer<R> {
    rng: R,
    sampler: MatrixSampler,
}

impl<R: Rng> DisguiseTransformer<R> {
    /// Transformer with the default sampler (`[-10, 10]`).
    pub fn new(rng: R) -> Self {
        Self::with_sampler(rng, MatrixSampler::default())
    }

    /// Transformer with a custom sampler.
    pub fn with_sampler(rng: R, sampler: MatrixSampler) -> Self {
        Self { rng, sampler }
    }

    /// The sampler in use.
    pub fn sampler(&self) -> &MatrixSampler {
        &self.sampler
    }

    /// Draws one invertible matrix.
    pub fn sample_matrix(&mut self) -> Result<TransformMatrix, PellError> {
        self.sampler.sample(&mut self.rng)
    }

    /// Draws a seed with a random square `D` in `range`.
    pub fn random_seed(&mut self, range: RangeInclusive<i64>) -> Result<PellSeed, PellError> {
        PellSeed::random_in_range(range, &mut self.rng)
    }

    /// Disguises `seed` with `matrix`, or with a freshly sampled one when `None`.
    pub fn disguise(
        &mut self,
        seed: &PellSeed,
        matrix: Option<TransformMatrix>,
    ) -> Result<DisguisedConstraint, PellError> {
        let matrix = match matrix {
            Some(matrix) => matrix,
            None => self.sample_matrix()?,
        };
        Ok(disguise_with(seed, matrix))
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
    use crate::expr::all_hold;
    use crate::rng::{Pcg32, SeedableRng};

    fn matrix(a: i64, b: i64, c: i64, d: i64) -> TransformMatrix {
        TransformMatrix::new(a, b, c, d).unwrap()
    }

    #[test]
    fn test_identity_on_unit_seed_reduces_to_hyperbola() {
        let seed = PellSeed::new(1).unwrap();
        let disguised = disguise_with(&seed, TransformMatrix::identity());
        let form = disguised.expanded().unwrap();
        assert_eq!(
            form,
            QuadraticForm {
                coef_uu: 1,
                coef_uv: 0,
                coef_vv: -1,
                rhs: 1
            }
        );
        assert_eq!(form.to_string(), "u^2 - v^2 == 1");
    }

    #[test]
    fn test_product_form_text() {
        let seed = PellSeed::new(4).unwrap();
        let disguised = disguise_with(&seed, matrix(2, -3, 1, 5));
        assert_eq!(
            disguised.equation().to_string(),
            "(2*u - 3*v)^2 - 4*(u + 5*v)^2 == 1"
        );
        assert_eq!(
            disguised.description(),
            "u, v ∈ Z, new constraint: (2*u - 3*v)^2 - 4*(u + 5*v)^2 == 1"
        );
        let domain: Vec<String> = disguised.domain().iter().map(ToString::to_string).collect();
        assert_eq!(domain, vec!["2*u - 3*v > 0", "u + 5*v > 0"]);
    }

    #[test]
    fn test_expansion_coefficients() {
        let form = QuadraticForm::expand(4, &matrix(2, -3, 1, 5)).unwrap();
        // a^2 - D c^2 = 4 - 4; 2ab - 2Dcd = -12 - 40; b^2 - D d^2 = 9 - 100
        assert_eq!(form.coef_uu, 0);
        assert_eq!(form.coef_uv, -52);
        assert_eq!(form.coef_vv, -91);
        assert_eq!(form.to_string(), "-52*u*v - 91*v^2 == 1");
    }

    #[test]
    fn test_expansion_overflow_is_error() {
        let m = matrix(i64::MAX, 0, 0, 1);
        assert!(matches!(
            QuadraticForm::expand(1, &m),
            Err(PellError::CoefficientOverflow { .. })
        ));
    }

    #[test]
    fn test_render_edge_cases() {
        let zero = QuadraticForm {
            coef_uu: 0,
            coef_uv: 0,
            coef_vv: 0,
            rhs: 1,
        };
        assert_eq!(zero.to_string(), "0 == 1");

        let units = QuadraticForm {
            coef_uu: -1,
            coef_uv: 1,
            coef_vv: -1,
            rhs: 1,
        };
        assert_eq!(units.render("p", "q"), "-p^2 + p*q - q^2 == 1");
    }

    #[test]
    fn test_expanded_constraint_agrees_with_evaluate() {
        let seed = PellSeed::new(9).unwrap();
        let disguised = disguise_with(&seed, matrix(3, 1, -2, 4));
        let form = disguised.expanded().unwrap();
        let (u, v) = disguised.vars();
        let eq = form.to_constraint(u, v);
        for (uv, vv) in [(0i128, 0i128), (1, 2), (-3, 5), (7, -7)] {
            let expected = form.evaluate(uv, vv) == Some(1);
            assert_eq!(eq.holds(&[(u, uv), (v, vv)]), Some(expected));
        }
    }

    #[test]
    fn test_constraint_sets_have_domain_first() {
        let seed = PellSeed::new(16).unwrap();
        let disguised = disguise_with(&seed, matrix(1, 2, 3, 4));
        let product = disguised.submission(SubmissionForm::Product).unwrap();
        let expanded = disguised.submission(SubmissionForm::Expanded).unwrap();
        assert_eq!(product.len(), 3);
        assert_eq!(expanded.len(), 3);
        assert_eq!(product[0], expanded[0]);
        assert_eq!(product[1], expanded[1]);
        assert_ne!(product[2], expanded[2]);
        assert_eq!(expanded[2].to_string(), "-143*u^2 - 380*u*v - 252*v^2 == 1");
    }

    #[test]
    fn test_identity_texts() {
        let seed = PellSeed::new(1).unwrap();
        let disguised = disguise_with(&seed, TransformMatrix::identity());
        assert_eq!(
            crate::expr::describe(&disguised.constraints()),
            "u > 0, v > 0, u^2 - v^2 == 1"
        );
        assert_eq!(
            crate::expr::describe(&disguised.expanded_constraints().unwrap()),
            "u > 0, v > 0, u^2 - v^2 == 1"
        );
    }

    #[test]
    fn test_identity_trivial_solution_rejected_by_domain() {
        let seed = PellSeed::new(1).unwrap();
        let disguised = disguise_with(&seed, TransformMatrix::identity());
        let (u, v) = disguised.vars();
        // (1, 0) satisfies the bare equation...
        assert_eq!(disguised.equation().holds(&[(u, 1), (v, 0)]), Some(true));
        // ...but not the whole disguise.
        assert_eq!(
            all_hold(&disguised.constraints(), &[(u, 1), (v, 0)]),
            Some(false)
        );
    }

    #[test]
    fn test_disguise_is_deterministic_for_fixed_matrix() {
        let seed = PellSeed::new(25).unwrap();
        let m = matrix(-4, 7, 2, 9);
        let first = disguise_with(&seed, m);
        let second = disguise_with(&seed, m);
        assert_eq!(first.description(), second.description());
        assert_eq!(first.expanded().unwrap(), second.expanded().unwrap());
        assert_eq!(first.fingerprint(), second.fingerprint());
        // Fresh identities each time
        assert_ne!(first.vars().0, second.vars().0);
    }

    #[test]
    fn test_disguise_does_not_touch_seed() {
        let seed = PellSeed::new(36).unwrap();
        let before: Vec<String> = seed.constraints().iter().map(ToString::to_string).collect();
        let _ = disguise_with(&seed, matrix(1, 1, 0, 1));
        let after: Vec<String> = seed.constraints().iter().map(ToString::to_string).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_fingerprint_distinguishes_matrices() {
        let seed = PellSeed::new(4).unwrap();
        let a = disguise_with(&seed, matrix(1, 2, 3, 4));
        let b = disguise_with(&seed, matrix(2, 1, 3, 4));
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_transformer_prefers_supplied_matrix() {
        let seed = PellSeed::new(49).unwrap();
        let mut transformer = DisguiseTransformer::new(Pcg32::seed_from_u64(3));
        let m = matrix(5, -2, 3, 1);
        assert_eq!(transformer.disguise(&seed, Some(m)).unwrap().matrix(), m);
    }

    #[test]
    fn test_transformer_seeded_runs_match() {
        let seed = PellSeed::new(49).unwrap();
        let mut t1 = DisguiseTransformer::new(Pcg32::seed_from_u64(99));
        let mut t2 = DisguiseTransformer::new(Pcg32::seed_from_u64(99));
        for _ in 0..20 {
            assert_eq!(
                t1.disguise(&seed, None).unwrap().matrix(),
                t2.disguise(&seed, None).unwrap().matrix()
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn invertible() -> impl Strategy<Value = TransformMatrix> {
        (-10i64..=10, -10i64..=10, -10i64..=10, -10i64..=10)
            .prop_filter_map("singular", |(a, b, c, d)| {
                TransformMatrix::new(a, b, c, d).ok()
            })
    }

    proptest! {
        /// Property: the expanded form evaluates exactly like the product form.
        #[test]
        fn prop_expansion_identity(
            root in 1i64..=7,
            m in invertible(),
            u in -1000i128..=1000,
            v in -1000i128..=1000,
        ) {
            let seed = PellSeed::from_root(root).unwrap();
            let disguised = disguise_with(&seed, m);
            let form = disguised.expanded().unwrap();
            let (uv, vv) = disguised.vars();

            let product = disguised.equation().lhs.eval(&|var: &Var| {
                if var == uv { Some(u) } else if var == vv { Some(v) } else { None }
            });
            prop_assert_eq!(product, form.evaluate(u, v));
        }

        /// Property: a point satisfying the disguise maps to a point satisfying the seed.
        ///
        /// The disguise is unsatisfiable, so this checks the equivalent pointwise
        /// statement: each disguised constraint holds at (u, v) exactly when the
        /// matching seed constraint holds at (x, y) = M(u, v).
        #[test]
        fn prop_substitution_commutes(
            root in 1i64..=7,
            m in invertible(),
            u in -200i128..=200,
            v in -200i128..=200,
        ) {
            let seed = PellSeed::from_root(root).unwrap();
            let disguised = disguise_with(&seed, m);
            let (uvar, vvar) = disguised.vars();
            let (xvar, yvar) = seed.vars();
            let (x, y) = m.apply(u, v).unwrap();

            let seed_side: Vec<Option<bool>> = seed
                .constraints()
                .iter()
                .map(|c| c.holds(&[(xvar, x), (yvar, y)]))
                .collect();
            let disguised_side: Vec<Option<bool>> = disguised
                .constraints()
                .iter()
                .map(|c| c.holds(&[(uvar, u), (vvar, v)]))
                .collect();
            prop_assert_eq!(seed_side, disguised_side);
        }
    }
}
