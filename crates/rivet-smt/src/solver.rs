//! The narrow decision-procedure interface consumed by the pipeline.

use crate::terms::{SmtSort, SmtTerm};

/// Result of a `solve` call.
///
/// `Error` covers both solver-reported failures and `unknown` answers
/// (e.g. a resource limit was hit); the pipeline treats either as an
/// inconclusive run, never as a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Sat,
    Unsat,
    Error(String),
}

/// A concrete value extracted from a satisfying assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelValue {
    Int(i64),
    Bool(bool),
}

impl ModelValue {
    pub fn as_int(self) -> Option<i64> {
        match self {
            ModelValue::Int(n) => Some(n),
            ModelValue::Bool(_) => None,
        }
    }

    pub fn as_bool(self) -> Option<bool> {
        match self {
            ModelValue::Bool(b) => Some(b),
            ModelValue::Int(_) => None,
        }
    }
}

/// Abstract decision procedure.
///
/// State is mutated monotonically: the pipeline declares symbols, adds
/// constraints, solves once, and then queries model values. There is no
/// retraction at this layer; backtracking search strategies own one
/// procedure instance per explored path.
pub trait DecisionProcedure {
    type Error: std::error::Error;

    /// Declare a variable before it appears in a constraint.
    fn declare(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error>;

    /// Assert a constraint.
    fn add_constraint(&mut self, term: &SmtTerm) -> Result<(), Self::Error>;

    /// Run the (potentially unbounded) satisfiability check.
    fn solve(&mut self) -> Result<SolveOutcome, Self::Error>;

    /// Query the model value of a declared variable.
    ///
    /// Only valid after a `solve` call returned [`SolveOutcome::Sat`];
    /// implementations must report an error otherwise. `Ok(None)` means the
    /// solver left the variable unconstrained.
    fn value_of(&mut self, name: &str, sort: &SmtSort) -> Result<Option<ModelValue>, Self::Error>;
}
