//! Verdict state machine and counterexample trace reconstruction.
//!
//! Trace building is a pure read of the model plus the frozen-guard
//! mapping: it never mutates the equation and is safe to call repeatedly
//! against the same solved state.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use rivet_ir::equation::{Equation, StepKind};
use rivet_ir::namespace::{Namespace, Sort};
use rivet_ir::properties::{PropertyStatus, PropertyTable};
use rivet_ir::trace::{ConcreteValue, Trace, TraceAssignment, TraceProperty, TraceStep};
use rivet_smt::solver::{DecisionProcedure, ModelValue, SolveOutcome};
use rivet_smt::terms::SmtSort;

use crate::convert::{smt_sort, Conversion};
use crate::error::EngineError;

/// Per-run verdict state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Unsolved,
    CounterexampleFound,
    NoCounterexample,
    /// Solver error or timeout. Terminal; reported, never retried here.
    Inconclusive,
}

/// Holds the solved decision procedure together with the conversion maps
/// and answers verdict and trace queries against it.
pub struct Verdict<'a, D: DecisionProcedure> {
    equation: &'a Equation,
    ns: &'a Namespace,
    conversion: &'a Conversion,
    solver: &'a mut D,
    status: RunStatus,
    reason: Option<String>,
}

impl<'a, D: DecisionProcedure> Verdict<'a, D> {
    pub fn new(
        equation: &'a Equation,
        ns: &'a Namespace,
        conversion: &'a Conversion,
        solver: &'a mut D,
    ) -> Self {
        Self {
            equation,
            ns,
            conversion,
            solver,
            status: RunStatus::Unsolved,
            reason: None,
        }
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Why the run is inconclusive, if it is.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Run the decision procedure and transition the state machine.
    pub fn solve(&mut self) -> RunStatus {
        self.status = match self.solver.solve() {
            Ok(SolveOutcome::Sat) => RunStatus::CounterexampleFound,
            Ok(SolveOutcome::Unsat) => RunStatus::NoCounterexample,
            Ok(SolveOutcome::Error(reason)) => {
                warn!(%reason, "decision procedure inconclusive");
                self.reason = Some(reason);
                RunStatus::Inconclusive
            }
            Err(err) => {
                let reason = err.to_string();
                warn!(%reason, "decision procedure failed");
                self.reason = Some(reason);
                RunStatus::Inconclusive
            }
        };
        info!(status = ?self.status, "solve finished");
        self.status
    }

    /// Merge the verdict into the property table, recording touched ids.
    ///
    /// Sat: properties with a true violation literal become `Fail`.
    /// Unsat: every converted property becomes `Pass`.
    /// Inconclusive: converted, still-undetermined properties become
    /// `Error` — an unsolved run is never silently reported as `Pass`.
    pub fn apply_to_properties(
        &mut self,
        properties: &mut PropertyTable,
        updated: &mut BTreeSet<String>,
    ) -> Result<(), EngineError> {
        let conversion = self.conversion;
        match self.status {
            RunStatus::Unsolved => Ok(()),
            RunStatus::CounterexampleFound => {
                for (property_id, instances) in &conversion.instances {
                    let mut violated = false;
                    for instance in instances {
                        if literal_true(self.solver, &instance.violation_literal)? {
                            violated = true;
                            break;
                        }
                    }
                    if violated {
                        set_status(properties, updated, property_id, PropertyStatus::Fail);
                    }
                }
                Ok(())
            }
            RunStatus::NoCounterexample => {
                for property_id in conversion.instances.keys() {
                    set_status(properties, updated, property_id, PropertyStatus::Pass);
                }
                Ok(())
            }
            RunStatus::Inconclusive => {
                for property_id in conversion.instances.keys() {
                    set_status(properties, updated, property_id, PropertyStatus::Error);
                }
                Ok(())
            }
        }
    }

    /// Every step whose frozen guard evaluates true in the model, in
    /// original order.
    pub fn build_full_trace(&mut self) -> Result<Trace, EngineError> {
        self.require_model()?;
        debug!("building error trace");
        let equation = self.equation;
        let conversion = self.conversion;
        let mut steps = Vec::new();
        for (index, step) in equation.iter_active() {
            let Some(literal) = conversion.frozen_guards.get(&index) else {
                continue;
            };
            if !literal_true(self.solver, literal)? {
                continue;
            }
            steps.push(self.trace_step(index, step)?);
        }
        Ok(Trace { steps })
    }

    /// The prefix of the full trace ending at the first failing assertion.
    pub fn build_shortest_trace(&mut self) -> Result<Trace, EngineError> {
        let full = self.build_full_trace()?;
        Ok(full.prefix_through_violation(None).unwrap_or(full))
    }

    /// The prefix ending at the first failing assertion of `property_id`.
    /// Fails with [`EngineError::TraceNotFound`] when no active failing
    /// instance exists for that identifier.
    pub fn build_trace(&mut self, property_id: &str) -> Result<Trace, EngineError> {
        let full = self.build_full_trace()?;
        full.prefix_through_violation(Some(property_id))
            .ok_or_else(|| EngineError::TraceNotFound(property_id.to_string()))
    }

    fn require_model(&self) -> Result<(), EngineError> {
        if self.status != RunStatus::CounterexampleFound {
            return Err(EngineError::Solver(
                "trace requested without a satisfiable model".into(),
            ));
        }
        Ok(())
    }

    fn trace_step(&mut self, index: usize, step: &rivet_ir::equation::Step) -> Result<TraceStep, EngineError> {
        let assignment = match &step.kind {
            StepKind::Assignment { lhs, .. } => {
                let sort = self.ns.sort_of(lhs).unwrap_or(Sort::Int);
                let value = self
                    .solver
                    .value_of(lhs, &smt_sort(sort))
                    .map_err(EngineError::solver)?
                    .map(concrete);
                Some(TraceAssignment {
                    symbol: lhs.clone(),
                    value,
                })
            }
            _ => None,
        };

        let property = match &step.kind {
            StepKind::Assert {
                property_id,
                description,
                ..
            } => {
                let violation_literal = self
                    .conversion
                    .instances
                    .get(property_id)
                    .and_then(|instances| {
                        instances.iter().find(|instance| instance.step_index == index)
                    })
                    .map(|instance| instance.violation_literal.clone());
                let violated = match violation_literal {
                    Some(literal) => literal_true(self.solver, &literal)?,
                    None => false,
                };
                Some(TraceProperty {
                    id: property_id.clone(),
                    description: description.clone(),
                    violated,
                })
            }
            _ => None,
        };

        Ok(TraceStep {
            step_index: index,
            label: step.kind.label().to_string(),
            thread: step.thread,
            source: step.source.clone(),
            assignment,
            property,
        })
    }
}

fn concrete(value: ModelValue) -> ConcreteValue {
    match value {
        ModelValue::Int(n) => ConcreteValue::Int(n),
        ModelValue::Bool(b) => ConcreteValue::Bool(b),
    }
}

fn literal_true<D: DecisionProcedure>(solver: &mut D, name: &str) -> Result<bool, EngineError> {
    Ok(solver
        .value_of(name, &SmtSort::Bool)
        .map_err(EngineError::solver)?
        .and_then(ModelValue::as_bool)
        .unwrap_or(false))
}

fn set_status(
    properties: &mut PropertyTable,
    updated: &mut BTreeSet<String>,
    property_id: &str,
    status: PropertyStatus,
) {
    let Some(property) = properties.get_mut(property_id) else {
        return;
    };
    if property.status.is_protected() || property.status == status {
        return;
    }
    property.status = status;
    updated.insert(property_id.to_string());
}
