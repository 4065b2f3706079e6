//! Solver-independent integer constraint AST.
//!
//! Seeds and disguises are built from [`Term`]s and [`Constraint`]s rather than
//! from any solver's native expression type. A [`DecisionProcedure`](crate::DecisionProcedure)
//! translates them on submission, and tests can evaluate them exactly under an
//! integer assignment.
//!
//! ```
//! use opaque_pell::expr::{Constraint, Term, Var};
//!
//! let x = Var::fresh("x");
//! let y = Var::fresh("y");
//! let pell = Constraint::eq(
//!     Term::square(Term::var(&x)) - Term::constant(4) * Term::square(Term::var(&y)),
//!     Term::constant(1),
//! );
//! assert_eq!(pell.to_string(), "x^2 - 4*y^2 == 1");
//! assert_eq!(pell.holds(&[(&x, 3), (&y, 1)]), Some(false));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

/// Ordered conjunction of constraints. Seeds and disguises hold three.
pub type ConstraintSet = SmallVec<[Constraint; 4]>;

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(0);

/// A symbolic integer variable.
///
/// Identity is the numeric id, not the name: two `u` variables from different
/// disguises are distinct.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var {
    id: u64,
    name: Arc<str>,
}

impl Var {
    /// Allocates a variable with a fresh identity.
    #[must_use]
    pub fn fresh(name: &str) -> Self {
        Self {
            id: NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name),
        }
    }

    /// Process-unique identity of this variable.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Display name of this variable.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A polynomial integer expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    /// Integer literal.
    Const(i64),
    /// Variable reference.
    Var(Var),
    /// Sum of two terms.
    Add(Box<Term>, Box<Term>),
    /// Difference of two terms.
    Sub(Box<Term>, Box<Term>),
    /// Product of two terms.
    Mul(Box<Term>, Box<Term>),
    /// Square of a term. Kept distinct from `Mul` so product forms print as `(..)^2`.
    Square(Box<Term>),
}

impl Term {
    /// Integer literal.
    #[must_use]
    pub const fn constant(value: i64) -> Self {
        Term::Const(value)
    }

    /// Variable reference.
    #[must_use]
    pub fn var(var: &Var) -> Self {
        Term::Var(var.clone())
    }

    /// `t^2`.
    #[must_use]
    pub fn square(term: Term) -> Self {
        Term::Square(Box::new(term))
    }

    /// `k*var`, or just `var` when `k == 1`.
    #[must_use]
    pub fn scaled(k: i64, var: &Var) -> Self {
        if k == 1 {
            Term::var(var)
        } else {
            Term::constant(k) * Term::var(var)
        }
    }

    /// `a*u + b*v`, dropping a zero coefficient.
    #[must_use]
    pub fn linear(a: i64, u: &Var, b: i64, v: &Var) -> Self {
        match (a, b) {
            (0, 0) => Term::Const(0),
            (0, _) => Term::scaled(b, v),
            (_, 0) => Term::scaled(a, u),
            _ => Term::scaled(a, u) + Term::scaled(b, v),
        }
    }

    /// Evaluates the term under `lookup`, returning `None` on an unbound variable
    /// or on `i128` overflow.
    pub fn eval<F>(&self, lookup: &F) -> Option<i128>
    where
        F: Fn(&Var) -> Option<i128>,
    {
        match self {
            Term::Const(k) => Some(i128::from(*k)),
            Term::Var(v) => lookup(v),
            Term::Add(l, r) => l.eval(lookup)?.checked_add(r.eval(lookup)?),
            Term::Sub(l, r) => l.eval(lookup)?.checked_sub(r.eval(lookup)?),
            Term::Mul(l, r) => l.eval(lookup)?.checked_mul(r.eval(lookup)?),
            Term::Square(t) => {
                let value = t.eval(lookup)?;
                value.checked_mul(value)
            }
        }
    }

    /// Collects every distinct variable in the term, in first-occurrence order.
    pub fn collect_vars(&self, out: &mut Vec<Var>) {
        match self {
            Term::Const(_) => {}
            Term::Var(v) => {
                if !out.contains(v) {
                    out.push(v.clone());
                }
            }
            Term::Add(l, r) | Term::Sub(l, r) | Term::Mul(l, r) => {
                l.collect_vars(out);
                r.collect_vars(out);
            }
            Term::Square(t) => t.collect_vars(out),
        }
    }

    /// If the term starts with a negative coefficient, returns the same term with that
    /// coefficient negated, so a surrounding sum can print `a - b` instead of `a + -b`.
    fn negated_lead(&self) -> Option<Term> {
        match self {
            Term::Const(k) if *k < 0 => k.checked_neg().map(Term::Const),
            Term::Mul(l, r) => match l.as_ref() {
                Term::Const(k) if *k < 0 => Some(Term::Mul(
                    Box::new(Term::Const(k.checked_neg()?)),
                    r.clone(),
                )),
                _ => None,
            },
            _ => None,
        }
    }

    const fn is_sum(&self) -> bool {
        matches!(self, Term::Add(..) | Term::Sub(..))
    }

    fn fmt_factor(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sum() {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Const(k) => write!(f, "{}", k),
            Term::Var(v) => write!(f, "{}", v),
            Term::Add(l, r) => {
                write!(f, "{}", l)?;
                match r.negated_lead() {
                    Some(positive) => write!(f, " - {}", positive),
                    None => write!(f, " + {}", r),
                }
            }
            Term::Sub(l, r) => {
                write!(f, "{} - ", l)?;
                r.fmt_factor(f)
            }
            Term::Mul(l, r) => {
                // Unit coefficients are elided: `1*u` prints as `u`, `-1*u` as `-u`.
                match (l.as_ref(), r.as_ref()) {
                    (Term::Const(1), rhs) if !rhs.is_sum() => write!(f, "{}", rhs),
                    (Term::Const(-1), rhs) if !rhs.is_sum() => write!(f, "-{}", rhs),
                    _ => {
                        l.fmt_factor(f)?;
                        f.write_str("*")?;
                        r.fmt_factor(f)
                    }
                }
            }
            Term::Square(t) => match t.as_ref() {
                Term::Var(_) | Term::Const(_) => write!(f, "{}^2", t),
                _ => write!(f, "({})^2", t),
            },
        }
    }
}

impl std::ops::Add for Term {
    type Output = Term;

    fn add(self, rhs: Term) -> Term {
        Term::Add(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Sub for Term {
    type Output = Term;

    fn sub(self, rhs: Term) -> Term {
        Term::Sub(Box::new(self), Box::new(rhs))
    }
}

impl std::ops::Mul for Term {
    type Output = Term;

    fn mul(self, rhs: Term) -> Term {
        Term::Mul(Box::new(self), Box::new(rhs))
    }
}

/// Comparison operator of a [`Constraint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `==`
    Eq,
}

impl Relation {
    /// Operator symbol as printed in constraint text.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Relation::Gt => ">",
            Relation::Ge => ">=",
            Relation::Lt => "<",
            Relation::Le => "<=",
            Relation::Eq => "==",
        }
    }

    fn compare(self, lhs: i128, rhs: i128) -> bool {
        match self {
            Relation::Gt => lhs > rhs,
            Relation::Ge => lhs >= rhs,
            Relation::Lt => lhs < rhs,
            Relation::Le => lhs <= rhs,
            Relation::Eq => lhs == rhs,
        }
    }
}

/// An atomic integer constraint `lhs REL rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constraint {
    /// Left-hand side.
    pub lhs: Term,
    /// Comparison operator.
    pub relation: Relation,
    /// Right-hand side.
    pub rhs: Term,
}

impl Constraint {
    /// Builds `lhs REL rhs`.
    #[must_use]
    pub const fn new(lhs: Term, relation: Relation, rhs: Term) -> Self {
        Self { lhs, relation, rhs }
    }

    /// `lhs == rhs`
    #[must_use]
    pub const fn eq(lhs: Term, rhs: Term) -> Self {
        Self::new(lhs, Relation::Eq, rhs)
    }

    /// `lhs > rhs`
    #[must_use]
    pub const fn gt(lhs: Term, rhs: Term) -> Self {
        Self::new(lhs, Relation::Gt, rhs)
    }

    /// `term > 0`
    #[must_use]
    pub const fn positive(term: Term) -> Self {
        Self::gt(term, Term::Const(0))
    }

    /// Evaluates the constraint under `lookup`. `None` means a variable was unbound
    /// or the evaluation overflowed.
    pub fn eval<F>(&self, lookup: &F) -> Option<bool>
    where
        F: Fn(&Var) -> Option<i128>,
    {
        let lhs = self.lhs.eval(lookup)?;
        let rhs = self.rhs.eval(lookup)?;
        Some(self.relation.compare(lhs, rhs))
    }

    /// Convenience wrapper over [`eval`](Self::eval) for a short assignment list.
    #[must_use]
    pub fn holds(&self, assignment: &[(&Var, i128)]) -> Option<bool> {
        self.eval(&|v: &Var| {
            assignment
                .iter()
                .find(|(bound, _)| *bound == v)
                .map(|(_, value)| *value)
        })
    }

    /// Every distinct variable on both sides, in first-occurrence order.
    #[must_use]
    pub fn vars(&self) -> Vec<Var> {
        let mut out = Vec::new();
        self.lhs.collect_vars(&mut out);
        self.rhs.collect_vars(&mut out);
        out
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.relation.symbol(), self.rhs)
    }
}

/// Evaluates a whole conjunction. `None` if any member could not be evaluated.
#[must_use]
pub fn all_hold(constraints: &[Constraint], assignment: &[(&Var, i128)]) -> Option<bool> {
    let mut result = true;
    for constraint in constraints {
        result &= constraint.holds(assignment)?;
    }
    Some(result)
}

/// Joins a conjunction as `c1, c2, c3`.
#[must_use]
pub fn describe(constraints: &[Constraint]) -> String {
    constraints
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_vars_are_distinct() {
        let a = Var::fresh("u");
        let b = Var::fresh("u");
        assert_ne!(a, b);
        assert_eq!(a.name(), b.name());
        assert!(b.id() > a.id());
    }

    #[test]
    fn test_linear_display_folds_signs() {
        let u = Var::fresh("u");
        let v = Var::fresh("v");
        assert_eq!(Term::linear(2, &u, -3, &v).to_string(), "2*u - 3*v");
        assert_eq!(Term::linear(-1, &u, 1, &v).to_string(), "-u + v");
        assert_eq!(Term::linear(0, &u, 5, &v).to_string(), "5*v");
        assert_eq!(Term::linear(1, &u, 0, &v).to_string(), "u");
        assert_eq!(Term::square(Term::linear(1, &u, 0, &v)).to_string(), "u^2");
        assert_eq!(Term::square(Term::linear(-1, &u, 0, &v)).to_string(), "(-u)^2");
    }

    #[test]
    fn test_product_form_display() {
        let u = Var::fresh("u");
        let v = Var::fresh("v");
        let lhs = Term::square(Term::linear(2, &u, -3, &v))
            - Term::constant(4) * Term::square(Term::linear(1, &u, 5, &v));
        let c = Constraint::eq(lhs, Term::constant(1));
        assert_eq!(c.to_string(), "(2*u - 3*v)^2 - 4*(u + 5*v)^2 == 1");
    }

    #[test]
    fn test_sub_parenthesizes_sums() {
        let x = Var::fresh("x");
        let t = Term::var(&x) - (Term::constant(1) + Term::var(&x));
        assert_eq!(t.to_string(), "x - (1 + x)");
    }

    #[test]
    fn test_eval_exact() {
        let u = Var::fresh("u");
        let v = Var::fresh("v");
        let t = Term::square(Term::linear(3, &u, 1, &v));
        let value = t.eval(&|var: &Var| {
            if *var == u {
                Some(2)
            } else if *var == v {
                Some(-1)
            } else {
                None
            }
        });
        assert_eq!(value, Some(25));
    }

    #[test]
    fn test_eval_unbound_is_none() {
        let u = Var::fresh("u");
        let other = Var::fresh("u");
        let c = Constraint::positive(Term::var(&u));
        assert_eq!(c.holds(&[(&other, 1)]), None);
    }

    #[test]
    fn test_eval_overflow_is_none() {
        let x = Var::fresh("x");
        let t = Term::square(Term::square(Term::var(&x)));
        let huge = i128::from(i64::MAX);
        assert_eq!(t.eval(&|_: &Var| Some(huge)), None);
    }

    #[test]
    fn test_relations() {
        let x = Var::fresh("x");
        let three = [(&x, 3i128)];
        let cases = [
            (Relation::Gt, true),
            (Relation::Ge, true),
            (Relation::Lt, false),
            (Relation::Le, false),
            (Relation::Eq, false),
        ];
        for (rel, expected) in cases {
            let c = Constraint::new(Term::var(&x), rel, Term::constant(2));
            assert_eq!(c.holds(&three), Some(expected), "{}", rel.symbol());
        }
    }

    #[test]
    fn test_vars_first_occurrence_order() {
        let u = Var::fresh("u");
        let v = Var::fresh("v");
        let c = Constraint::eq(
            Term::square(Term::linear(1, &v, 2, &u)),
            Term::var(&u) * Term::var(&v),
        );
        assert_eq!(c.vars(), vec![v, u]);
    }

    #[test]
    fn test_all_hold_and_describe() {
        let x = Var::fresh("x");
        let set = [
            Constraint::positive(Term::var(&x)),
            Constraint::eq(Term::var(&x), Term::constant(4)),
        ];
        assert_eq!(all_hold(&set, &[(&x, 4)]), Some(true));
        assert_eq!(all_hold(&set, &[(&x, 5)]), Some(false));
        assert_eq!(describe(&set), "x > 0, x == 4");
    }
}
