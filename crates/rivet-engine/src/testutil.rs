//! Scripted decision procedure for unit tests.

use std::collections::BTreeMap;
use std::fmt;

use rivet_smt::solver::{DecisionProcedure, ModelValue, SolveOutcome};
use rivet_smt::terms::{SmtSort, SmtTerm};

#[derive(Debug)]
pub struct ScriptedError(pub String);

impl fmt::Display for ScriptedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ScriptedError {}

/// A solver whose verdict and model are fixed up front.
///
/// Model lookup order: exact entry in `values`, then prefix rules, then the
/// per-sort default (`Bool` defaults to `default_bool`, `Int` to 0). Guard
/// and violation literals are generated names, so tests usually steer them
/// with prefix rules rather than exact entries.
pub struct ScriptedSolver {
    pub outcome: SolveOutcome,
    pub values: BTreeMap<String, ModelValue>,
    pub prefix_bools: Vec<(String, bool)>,
    pub default_bool: bool,
    pub declared: Vec<(String, SmtSort)>,
    pub constraints: Vec<SmtTerm>,
    pub solve_calls: usize,
    solved: bool,
}

impl ScriptedSolver {
    pub fn new(outcome: SolveOutcome) -> Self {
        Self {
            outcome,
            values: BTreeMap::new(),
            prefix_bools: Vec::new(),
            default_bool: true,
            declared: Vec::new(),
            constraints: Vec::new(),
            solve_calls: 0,
            solved: false,
        }
    }

    /// A solver that must never be reached.
    pub fn unreachable() -> Self {
        let mut solver = Self::new(SolveOutcome::Error("solver must not be called".into()));
        solver.default_bool = false;
        solver
    }

    pub fn with_value(mut self, name: &str, value: ModelValue) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    pub fn with_prefix_bool(mut self, prefix: &str, value: bool) -> Self {
        self.prefix_bools.push((prefix.to_string(), value));
        self
    }
}

impl DecisionProcedure for ScriptedSolver {
    type Error = ScriptedError;

    fn declare(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error> {
        self.declared.push((name.to_string(), *sort));
        Ok(())
    }

    fn add_constraint(&mut self, term: &SmtTerm) -> Result<(), Self::Error> {
        self.constraints.push(term.clone());
        Ok(())
    }

    fn solve(&mut self) -> Result<SolveOutcome, Self::Error> {
        self.solve_calls += 1;
        self.solved = true;
        Ok(self.outcome.clone())
    }

    fn value_of(&mut self, name: &str, sort: &SmtSort) -> Result<Option<ModelValue>, Self::Error> {
        if !self.solved || self.outcome != SolveOutcome::Sat {
            return Err(ScriptedError("value_of before a sat result".into()));
        }
        if let Some(value) = self.values.get(name) {
            return Ok(Some(*value));
        }
        for (prefix, value) in &self.prefix_bools {
            if name.starts_with(prefix.as_str()) {
                return Ok(Some(ModelValue::Bool(*value)));
            }
        }
        Ok(Some(match sort {
            SmtSort::Bool => ModelValue::Bool(self.default_bool),
            SmtSort::Int => ModelValue::Int(0),
        }))
    }
}
