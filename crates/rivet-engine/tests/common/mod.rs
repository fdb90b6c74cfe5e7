//! Shared test helpers: a scripted decision procedure and equation builders.

use std::collections::BTreeMap;
use std::fmt;

use rivet_ir::equation::{Step, StepKind};
use rivet_ir::expr::Expr;
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

/// A solver with a fixed verdict and a scripted model.
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

pub fn assign(lhs: &str, rhs: Expr) -> Step {
    Step::new(
        StepKind::Assignment {
            lhs: lhs.into(),
            rhs,
        },
        Expr::bool(true),
    )
}

pub fn assert_step(property_id: &str, cond: Expr) -> Step {
    Step::new(
        StepKind::Assert {
            property_id: property_id.into(),
            cond,
            description: String::new(),
        },
        Expr::bool(true),
    )
}

pub fn shared_write(symbol: &str, thread: usize) -> Step {
    Step::new(
        StepKind::SharedWrite {
            symbol: symbol.into(),
        },
        Expr::bool(true),
    )
    .with_thread(thread)
}
