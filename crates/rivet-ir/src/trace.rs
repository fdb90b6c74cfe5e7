//! Concrete counterexample traces.
//!
//! A trace is derived from the subset of equation steps whose frozen guard
//! evaluated true under a satisfying assignment. Trace reconstruction lives
//! in the engine; this module only defines the data and its rendering.

use std::fmt;

use serde::Serialize;

use crate::equation::SourceLocation;

/// A concretized model value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConcreteValue {
    Int(i64),
    Bool(bool),
}

impl fmt::Display for ConcreteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcreteValue::Int(n) => write!(f, "{n}"),
            ConcreteValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Assignment recorded on a trace step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceAssignment {
    pub symbol: String,
    /// `None` when the solver did not assign the symbol a value.
    pub value: Option<ConcreteValue>,
}

/// Property check recorded on a trace step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceProperty {
    pub id: String,
    pub description: String,
    pub violated: bool,
}

/// One active step of a counterexample trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceStep {
    /// Index of the originating step in the equation.
    pub step_index: usize,
    /// Step-kind label (`ASSIGNMENT`, `ASSERT`, ...).
    pub label: String,
    pub thread: usize,
    pub source: SourceLocation,
    pub assignment: Option<TraceAssignment>,
    pub property: Option<TraceProperty>,
}

/// An ordered sequence of concrete steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Trace {
    pub steps: Vec<TraceStep>,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The prefix ending at the first violated assertion matching
    /// `property_id` (or any violated assertion when `None`). Returns `None`
    /// when no such step exists.
    pub fn prefix_through_violation(&self, property_id: Option<&str>) -> Option<Trace> {
        let end = self.steps.iter().position(|step| {
            step.property
                .as_ref()
                .map(|p| p.violated && property_id.map(|id| id == p.id).unwrap_or(true))
                .unwrap_or(false)
        })?;
        Some(Trace {
            steps: self.steps[..=end].to_vec(),
        })
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return writeln!(f, "Trace: (empty)");
        }
        writeln!(f, "Trace:")?;
        for (i, step) in self.steps.iter().enumerate() {
            write!(
                f,
                "  Step {} [t{}] {} {}",
                i + 1,
                step.thread,
                step.label,
                step.source
            )?;
            if let Some(assignment) = &step.assignment {
                match &assignment.value {
                    Some(value) => write!(f, ": {} = {}", assignment.symbol, value)?,
                    None => write!(f, ": {} = ?", assignment.symbol)?,
                }
            }
            if let Some(property) = &step.property {
                let verdict = if property.violated { "FAILURE" } else { "SUCCESS" };
                write!(f, ": [{}] {verdict}", property.id)?;
                if !property.description.is_empty() {
                    write!(f, ": {}", property.description)?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
