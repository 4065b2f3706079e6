//! Concrete [`DecisionProcedure`](crate::DecisionProcedure) implementations.

#[cfg(feature = "z3-solver")]
pub mod z3;
