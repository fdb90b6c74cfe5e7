//! Pipeline orchestration.
//!
//! `postprocess_equation` prepares the frozen equation (memory-model
//! constraints, slicing, validation); `run_verification` drives one full
//! run through conversion, solving, verdict application, status
//! reconciliation, and report output. Each stage runs to completion before
//! the next begins; the single blocking call is the decision procedure's
//! `solve`.

use std::collections::BTreeSet;

use tracing::{debug, info};

use rivet_ir::equation::Equation;
use rivet_ir::namespace::Namespace;
use rivet_ir::properties::PropertyTable;
use rivet_ir::trace::Trace;
use rivet_smt::solver::DecisionProcedure;

use crate::config::VerifyOptions;
use crate::convert::{convert_equation, freeze_guards};
use crate::coverage::output_coverage_report;
use crate::error::EngineError;
use crate::memory_model::memory_model;
use crate::slice::slice_equation;
use crate::status::{
    update_status_from_equation, update_status_of_not_checked_properties,
    update_status_of_unknown_properties,
};
use crate::verdict::{RunStatus, Verdict};
use crate::witness::{output_graphml_for_equation, output_graphml_for_trace};

/// Result of one verification run.
#[derive(Debug)]
pub struct RunReport {
    pub status: RunStatus,
    /// Property identifiers whose status changed during this run.
    pub updated_properties: BTreeSet<String>,
    /// Full counterexample trace, present iff a counterexample was found.
    pub trace: Option<Trace>,
    /// Why the run is inconclusive, if it is.
    pub reason: Option<String>,
}

impl RunReport {
    /// The prefix of the counterexample ending at the first failing
    /// assertion of `property_id`.
    pub fn property_trace(&self, property_id: &str) -> Result<Trace, EngineError> {
        self.trace
            .as_ref()
            .and_then(|trace| trace.prefix_through_violation(Some(property_id)))
            .ok_or_else(|| EngineError::TraceNotFound(property_id.to_string()))
    }

    /// The prefix of the counterexample ending at the first failing
    /// assertion of any property.
    pub fn shortest_trace(&self) -> Option<Trace> {
        let trace = self.trace.as_ref()?;
        trace.prefix_through_violation(None).or_else(|| Some(trace.clone()))
    }
}

/// Post-process the frozen equation: add memory-model ordering constraints,
/// slice, and validate the result.
pub fn postprocess_equation(
    equation: &mut Equation,
    ns: &mut Namespace,
    properties: &PropertyTable,
    options: &VerifyOptions,
) -> Result<(), EngineError> {
    let model = memory_model(options, ns);
    let constraints = model.apply(equation, ns);
    let sliced = slice_equation(equation, properties, options.slice);
    info!(
        steps = equation.len(),
        constraints, sliced, "equation post-processed"
    );
    equation.validate(ns, properties)?;
    Ok(())
}

/// Run the full verdict pipeline over a frozen equation.
pub fn run_verification<D: DecisionProcedure>(
    equation: &mut Equation,
    ns: &mut Namespace,
    properties: &mut PropertyTable,
    options: &VerifyOptions,
    solver: &mut D,
) -> Result<RunReport, EngineError> {
    options.validate()?;
    postprocess_equation(equation, ns, properties, options)?;

    let mut updated = BTreeSet::new();
    update_status_from_equation(properties, &mut updated, equation);

    let mut conversion = convert_equation(equation, ns, properties, solver)?;
    freeze_guards(equation, ns, &mut conversion, solver)?;

    let mut trace = None;
    let mut reason = None;
    let status = if conversion.converted_assertions == 0 {
        info!("no unresolved assertions; decision procedure not invoked");
        RunStatus::Unsolved
    } else {
        let mut verdict = Verdict::new(equation, ns, &conversion, solver);
        let status = verdict.solve();
        verdict.apply_to_properties(properties, &mut updated)?;
        if status == RunStatus::CounterexampleFound {
            trace = Some(verdict.build_full_trace()?);
        }
        reason = verdict.reason().map(str::to_string);
        status
    };

    update_status_of_not_checked_properties(properties, &mut updated);
    update_status_of_unknown_properties(properties, &mut updated);
    debug!(updated = updated.len(), "property statuses reconciled");

    let witness_path = options.graphml_witness.as_deref();
    let program_file = options.program_file.as_deref();
    match (&trace, status) {
        (Some(trace), _) => output_graphml_for_trace(witness_path, trace, program_file)?,
        (None, RunStatus::NoCounterexample) => {
            output_graphml_for_equation(witness_path, equation, program_file)?
        }
        _ => {}
    }
    output_coverage_report(options.coverage_report.as_deref(), equation)?;

    Ok(RunReport {
        status,
        updated_properties: updated,
        trace,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MemoryModelChoice, SliceMode};
    use crate::testutil::ScriptedSolver;
    use rivet_ir::equation::{Step, StepKind};
    use rivet_ir::expr::Expr;
    use rivet_ir::namespace::Sort;
    use rivet_ir::properties::{initial_property_table, PropertyStatus};
    use rivet_smt::solver::SolveOutcome;

    fn setup() -> (Equation, Namespace) {
        let mut ns = Namespace::new();
        ns.declare("x", Sort::Int);
        let mut eq = Equation::new();
        eq.push(Step::new(
            StepKind::Assignment {
                lhs: "x".into(),
                rhs: Expr::int(1),
            },
            Expr::bool(true),
        ));
        eq.push(Step::new(
            StepKind::Assert {
                property_id: "p".into(),
                cond: Expr::symbol("x").gt(Expr::int(0)),
                description: String::new(),
            },
            Expr::bool(true),
        ));
        (eq, ns)
    }

    #[test]
    fn invalid_options_abort_before_any_work() {
        let (mut eq, mut ns) = setup();
        let mut table = initial_property_table(&[], &eq);
        let options = VerifyOptions {
            unwinding_assertions: true,
            partial_loops: true,
            ..Default::default()
        };
        let mut solver = ScriptedSolver::unreachable();
        let err =
            run_verification(&mut eq, &mut ns, &mut table, &options, &mut solver).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert_eq!(solver.solve_calls, 0);
        assert!(solver.constraints.is_empty());
    }

    #[test]
    fn unsat_run_passes_checked_properties() {
        let (mut eq, mut ns) = setup();
        let mut table = initial_property_table(&[], &eq);
        let options = VerifyOptions::default();
        let mut solver = ScriptedSolver::new(SolveOutcome::Unsat);

        let report =
            run_verification(&mut eq, &mut ns, &mut table, &options, &mut solver).unwrap();
        assert_eq!(report.status, RunStatus::NoCounterexample);
        assert_eq!(table["p"].status, PropertyStatus::Pass);
        assert!(report.trace.is_none());
        assert_eq!(solver.solve_calls, 1);
    }

    #[test]
    fn sat_run_yields_trace_and_failure() {
        let (mut eq, mut ns) = setup();
        let mut table = initial_property_table(&[], &eq);
        let options = VerifyOptions::default();
        let mut solver =
            ScriptedSolver::new(SolveOutcome::Sat).with_prefix_bool("viol", true);

        let report =
            run_verification(&mut eq, &mut ns, &mut table, &options, &mut solver).unwrap();
        assert_eq!(report.status, RunStatus::CounterexampleFound);
        assert_eq!(table["p"].status, PropertyStatus::Fail);
        let trace = report.trace.as_ref().unwrap();
        assert!(!trace.is_empty());
        assert!(report.updated_properties.contains("p"));
        // shortest trace ends at the failing assertion
        let shortest = report.shortest_trace().unwrap();
        assert!(shortest.steps.last().unwrap().property.is_some());
        assert!(report.property_trace("p").is_ok());
        assert!(matches!(
            report.property_trace("absent"),
            Err(EngineError::TraceNotFound(_))
        ));
    }

    #[test]
    fn constant_true_assertion_skips_the_solver() {
        let mut ns = Namespace::new();
        let mut eq = Equation::new();
        eq.push(Step::new(
            StepKind::Assert {
                property_id: "tautology".into(),
                cond: Expr::int(2).gt(Expr::int(1)),
                description: String::new(),
            },
            Expr::bool(true),
        ));
        let mut table = initial_property_table(&[], &eq);
        let options = VerifyOptions::default();
        let mut solver = ScriptedSolver::unreachable();

        let report =
            run_verification(&mut eq, &mut ns, &mut table, &options, &mut solver).unwrap();
        assert_eq!(report.status, RunStatus::Unsolved);
        assert_eq!(table["tautology"].status, PropertyStatus::Pass);
        assert_eq!(solver.solve_calls, 0);
    }

    #[test]
    fn inconclusive_run_reports_reason_and_errors_property() {
        let (mut eq, mut ns) = setup();
        let mut table = initial_property_table(&[], &eq);
        let options = VerifyOptions::default();
        let mut solver = ScriptedSolver::new(SolveOutcome::Error("timeout".into()));

        let report =
            run_verification(&mut eq, &mut ns, &mut table, &options, &mut solver).unwrap();
        assert_eq!(report.status, RunStatus::Inconclusive);
        assert_eq!(report.reason.as_deref(), Some("timeout"));
        assert_eq!(table["p"].status, PropertyStatus::Error);
    }

    #[test]
    fn memory_model_is_applied_during_postprocessing() {
        let mut ns = Namespace::new();
        ns.declare_shared("g", Sort::Int);
        let mut eq = Equation::new();
        eq.push(Step::new(
            StepKind::SharedWrite { symbol: "g".into() },
            Expr::bool(true),
        ));
        eq.push(
            Step::new(StepKind::SharedWrite { symbol: "g".into() }, Expr::bool(true))
                .with_thread(1),
        );
        let table = PropertyTable::new();
        let options = VerifyOptions {
            memory_model: MemoryModelChoice::Sc,
            slice: SliceMode::Off,
            ..Default::default()
        };

        postprocess_equation(&mut eq, &mut ns, &table, &options).unwrap();
        assert!(eq.len() > 2, "ordering constraints were appended");
    }

    #[test]
    fn validation_failure_is_a_conversion_error() {
        let mut ns = Namespace::new();
        let mut eq = Equation::new();
        // assignment to an undeclared symbol
        eq.push(Step::new(
            StepKind::Assignment {
                lhs: "ghost".into(),
                rhs: Expr::int(1),
            },
            Expr::bool(true),
        ));
        let mut table = PropertyTable::new();
        let options = VerifyOptions {
            slice: SliceMode::Off,
            ..Default::default()
        };
        let mut solver = ScriptedSolver::unreachable();
        let err =
            run_verification(&mut eq, &mut ns, &mut table, &options, &mut solver).unwrap_err();
        assert!(matches!(err, EngineError::Conversion(_)));
    }
}
