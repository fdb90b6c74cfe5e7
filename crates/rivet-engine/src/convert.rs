//! Equation-to-constraints conversion and guard freezing.
//!
//! The converter walks the post-processed equation in order and emits one
//! or more constraints per active step. For each active assertion of a live
//! property it allocates a *violation literal* `v ⇔ (guard ∧ ¬cond)` and
//! records the instance, then asserts the disjunction of all violation
//! literals — an assertion fails iff its guard holds and its condition is
//! false. Solver state is mutated monotonically; nothing is ever retracted.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use rivet_ir::equation::{Equation, StepKind};
use rivet_ir::expr::Expr;
use rivet_ir::namespace::{Namespace, Sort};
use rivet_ir::properties::PropertyTable;
use rivet_smt::solver::DecisionProcedure;
use rivet_smt::terms::{SmtSort, SmtTerm};

use crate::error::EngineError;

/// One converted assertion instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionInstance {
    pub step_index: usize,
    /// Bool literal equivalent to `guard ∧ ¬cond` for this instance.
    pub violation_literal: String,
}

/// Outcome of conversion: the mapping the verdict builder needs to read
/// step activity and property violations back out of a model.
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    /// Per-step frozen guard literal, filled in by [`freeze_guards`].
    pub frozen_guards: BTreeMap<usize, String>,
    /// Property identifier → converted assertion instances.
    pub instances: BTreeMap<String, Vec<AssertionInstance>>,
    /// Number of assertion instances converted for live properties.
    pub converted_assertions: usize,
}

impl Conversion {
    /// Properties that had at least one instance converted this run.
    pub fn converted_properties(&self) -> impl Iterator<Item = &String> {
        self.instances.keys()
    }
}

pub(crate) fn smt_sort(sort: Sort) -> SmtSort {
    match sort {
        Sort::Bool => SmtSort::Bool,
        Sort::Int => SmtSort::Int,
    }
}

/// Lower an IR expression to a solver term. Total: sort errors are caught
/// by validation before conversion starts.
pub(crate) fn lower(expr: &Expr) -> SmtTerm {
    match expr {
        Expr::Symbol(name) => SmtTerm::Var(name.clone()),
        Expr::IntLit(n) => SmtTerm::IntLit(*n),
        Expr::BoolLit(b) => SmtTerm::BoolLit(*b),
        Expr::Add(a, b) => lower(a).add(lower(b)),
        Expr::Sub(a, b) => lower(a).sub(lower(b)),
        Expr::Mul(a, b) => lower(a).mul(lower(b)),
        Expr::Eq(a, b) => lower(a).eq(lower(b)),
        Expr::Lt(a, b) => lower(a).lt(lower(b)),
        Expr::Le(a, b) => lower(a).le(lower(b)),
        Expr::Gt(a, b) => lower(a).gt(lower(b)),
        Expr::Ge(a, b) => lower(a).ge(lower(b)),
        Expr::And(terms) => SmtTerm::And(terms.iter().map(lower).collect()),
        Expr::Or(terms) => SmtTerm::Or(terms.iter().map(lower).collect()),
        Expr::Not(inner) => lower(inner).not(),
        Expr::Implies(a, b) => lower(a).implies(lower(b)),
        Expr::Ite(c, t, e) => SmtTerm::ite(lower(c), lower(t), lower(e)),
    }
}

struct Declarations {
    seen: BTreeSet<String>,
}

impl Declarations {
    fn new() -> Self {
        Self {
            seen: BTreeSet::new(),
        }
    }

    fn declare_expr<D: DecisionProcedure>(
        &mut self,
        expr: &Expr,
        ns: &Namespace,
        solver: &mut D,
        step_index: usize,
    ) -> Result<(), EngineError> {
        let mut symbols = BTreeSet::new();
        expr.free_symbols_into(&mut symbols);
        for name in symbols {
            self.declare_symbol(&name, ns, solver, step_index)?;
        }
        Ok(())
    }

    fn declare_symbol<D: DecisionProcedure>(
        &mut self,
        name: &str,
        ns: &Namespace,
        solver: &mut D,
        step_index: usize,
    ) -> Result<(), EngineError> {
        if !self.seen.insert(name.to_string()) {
            return Ok(());
        }
        let sort = ns.sort_of(name).ok_or_else(|| {
            EngineError::conversion_at(step_index, format!("undeclared symbol `{name}`"))
        })?;
        solver
            .declare(name, &smt_sort(sort))
            .map_err(EngineError::solver)
    }
}

/// Convert the active steps of a (sliced, memory-model-augmented) equation
/// into decision-procedure constraints.
pub fn convert_equation<D: DecisionProcedure>(
    equation: &Equation,
    ns: &mut Namespace,
    properties: &PropertyTable,
    solver: &mut D,
) -> Result<Conversion, EngineError> {
    let mut conversion = Conversion::default();
    let mut declarations = Declarations::new();
    let mut violation_literals: Vec<String> = Vec::new();

    for (index, step) in equation.iter_active() {
        declarations.declare_expr(&step.guard, ns, solver, index)?;
        let guard = lower(&step.guard);

        match &step.kind {
            StepKind::Assignment { lhs, rhs } => {
                declarations.declare_symbol(lhs, ns, solver, index)?;
                declarations.declare_expr(rhs, ns, solver, index)?;
                let constraint = guard.implies(SmtTerm::var(lhs.clone()).eq(lower(rhs)));
                solver.add_constraint(&constraint).map_err(EngineError::solver)?;
            }
            StepKind::Assume { cond } | StepKind::Constraint { cond, .. } => {
                declarations.declare_expr(cond, ns, solver, index)?;
                let constraint = guard.implies(lower(cond));
                solver.add_constraint(&constraint).map_err(EngineError::solver)?;
            }
            StepKind::Assert {
                property_id, cond, ..
            } => {
                let status = properties
                    .get(property_id)
                    .ok_or_else(|| {
                        EngineError::conversion_at(
                            index,
                            format!("assertion references unknown property `{property_id}`"),
                        )
                    })?
                    .status;
                if status.is_terminal() {
                    continue;
                }
                declarations.declare_expr(cond, ns, solver, index)?;
                let literal = ns.fresh("viol", Sort::Bool);
                declarations.declare_symbol(&literal, ns, solver, index)?;
                let definition = SmtTerm::var(literal.clone())
                    .eq(SmtTerm::and(vec![guard, lower(cond).not()]));
                solver.add_constraint(&definition).map_err(EngineError::solver)?;

                conversion
                    .instances
                    .entry(property_id.clone())
                    .or_default()
                    .push(AssertionInstance {
                        step_index: index,
                        violation_literal: literal.clone(),
                    });
                conversion.converted_assertions += 1;
                violation_literals.push(literal);
            }
            StepKind::SharedRead { symbol } | StepKind::SharedWrite { symbol } => {
                // No constraint of its own; ordering lives in the appended
                // Constraint steps. Declare the symbol so clock constraints
                // and trace extraction can reference it.
                declarations.declare_symbol(symbol, ns, solver, index)?;
            }
            StepKind::FunctionCall { .. } | StepKind::FunctionReturn { .. } | StepKind::Location => {}
        }
    }

    // The verification formula: some converted assertion is violated.
    if !violation_literals.is_empty() {
        let disjunction =
            SmtTerm::or(violation_literals.iter().map(|l| SmtTerm::var(l.clone())).collect());
        solver.add_constraint(&disjunction).map_err(EngineError::solver)?;
    }

    debug!(
        assertions = conversion.converted_assertions,
        properties = conversion.instances.len(),
        "equation converted"
    );
    Ok(conversion)
}

/// Freeze step guards: allocate one Bool literal per active step, asserted
/// equal to the step's guard, so that "is this step active" is answerable
/// from the model without re-deriving it. Required by trace building.
pub fn freeze_guards<D: DecisionProcedure>(
    equation: &Equation,
    ns: &mut Namespace,
    conversion: &mut Conversion,
    solver: &mut D,
) -> Result<(), EngineError> {
    for (index, step) in equation.iter_active() {
        let literal = ns.fresh("guard", Sort::Bool);
        solver
            .declare(&literal, &SmtSort::Bool)
            .map_err(EngineError::solver)?;
        let definition = SmtTerm::var(literal.clone()).eq(lower(&step.guard));
        solver.add_constraint(&definition).map_err(EngineError::solver)?;
        conversion.frozen_guards.insert(index, literal);
    }
    debug!(frozen = conversion.frozen_guards.len(), "guards frozen");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedSolver;
    use rivet_ir::equation::Step;
    use rivet_ir::properties::{initial_property_table, PropertyStatus};
    use rivet_smt::solver::SolveOutcome;

    fn simple_equation() -> (Equation, Namespace) {
        let mut ns = Namespace::new();
        ns.declare("x", Sort::Int);
        let mut eq = Equation::new();
        eq.push(Step::new(
            StepKind::Assignment {
                lhs: "x".into(),
                rhs: Expr::int(5),
            },
            Expr::bool(true),
        ));
        eq.push(Step::new(
            StepKind::Assert {
                property_id: "p".into(),
                cond: Expr::symbol("x").eq(Expr::int(5)),
                description: String::new(),
            },
            Expr::bool(true),
        ));
        (eq, ns)
    }

    #[test]
    fn records_one_instance_per_live_assert() {
        let (eq, mut ns) = simple_equation();
        let table = initial_property_table(&[], &eq);
        let mut solver = ScriptedSolver::new(SolveOutcome::Sat);

        let conversion = convert_equation(&eq, &mut ns, &table, &mut solver).unwrap();
        assert_eq!(conversion.converted_assertions, 1);
        assert_eq!(conversion.instances["p"].len(), 1);
        assert_eq!(conversion.instances["p"][0].step_index, 1);
        // assignment + violation definition + final disjunction
        assert_eq!(solver.constraints.len(), 3);
    }

    #[test]
    fn resolved_properties_are_not_converted() {
        let (eq, mut ns) = simple_equation();
        let mut table = initial_property_table(&[], &eq);
        table.get_mut("p").unwrap().status = PropertyStatus::Pass;
        let mut solver = ScriptedSolver::new(SolveOutcome::Sat);

        let conversion = convert_equation(&eq, &mut ns, &table, &mut solver).unwrap();
        assert_eq!(conversion.converted_assertions, 0);
        assert!(conversion.instances.is_empty());
        // only the assignment constraint; no disjunction
        assert_eq!(solver.constraints.len(), 1);
    }

    #[test]
    fn ignored_steps_are_skipped() {
        let (mut eq, mut ns) = simple_equation();
        let table = initial_property_table(&[], &eq);
        eq.set_ignored(0, true);
        let mut solver = ScriptedSolver::new(SolveOutcome::Sat);

        convert_equation(&eq, &mut ns, &table, &mut solver).unwrap();
        // only the violation definition and the final disjunction remain
        assert_eq!(solver.constraints.len(), 2);
    }

    #[test]
    fn undeclared_symbol_is_a_conversion_error() {
        let mut ns = Namespace::new();
        let mut eq = Equation::new();
        eq.push(Step::new(
            StepKind::Assume {
                cond: Expr::symbol("ghost").gt(Expr::int(0)),
            },
            Expr::bool(true),
        ));
        let table = PropertyTable::new();
        let mut solver = ScriptedSolver::new(SolveOutcome::Sat);

        let err = convert_equation(&eq, &mut ns, &table, &mut solver).unwrap_err();
        assert!(matches!(err, EngineError::Conversion(_)));
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn unknown_property_is_a_conversion_error() {
        let mut ns = Namespace::new();
        let mut eq = Equation::new();
        eq.push(Step::new(
            StepKind::Assert {
                property_id: "phantom".into(),
                cond: Expr::bool(true),
                description: String::new(),
            },
            Expr::bool(true),
        ));
        let mut solver = ScriptedSolver::new(SolveOutcome::Sat);

        let err = convert_equation(&eq, &mut ns, &PropertyTable::new(), &mut solver).unwrap_err();
        assert!(matches!(err, EngineError::Conversion(_)));
    }

    #[test]
    fn freeze_allocates_one_literal_per_active_step() {
        let (eq, mut ns) = simple_equation();
        let table = initial_property_table(&[], &eq);
        let mut solver = ScriptedSolver::new(SolveOutcome::Sat);

        let mut conversion = convert_equation(&eq, &mut ns, &table, &mut solver).unwrap();
        freeze_guards(&eq, &mut ns, &mut conversion, &mut solver).unwrap();

        assert_eq!(conversion.frozen_guards.len(), 2);
        assert!(conversion.frozen_guards[&0].starts_with("guard!"));
        assert!(conversion.frozen_guards[&1].starts_with("guard!"));
    }

    #[test]
    fn lowering_preserves_structure() {
        let expr = Expr::symbol("g").implies(
            Expr::symbol("x").add(Expr::int(1)).le(Expr::int(10)),
        );
        let term = lower(&expr);
        assert_eq!(
            term,
            SmtTerm::var("g").implies(
                SmtTerm::var("x").add(SmtTerm::int(1)).le(SmtTerm::int(10))
            )
        );
    }
}
