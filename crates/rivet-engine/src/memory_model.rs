//! Concurrency memory models as ordering-constraint injection.
//!
//! Each shared-memory access gets an integer clock symbol; the selected
//! model appends `Constraint` steps relating the clocks of accesses in
//! program order (relaxed per model) and serializing writes to the same
//! variable across threads. Existing steps are never altered or removed,
//! so the set of feasible single-threaded behaviors is unchanged.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use rivet_ir::equation::{Equation, SharedAccess, Step, StepKind};
use rivet_ir::expr::Expr;
use rivet_ir::namespace::{Namespace, Sort};

use crate::config::{MemoryModelChoice, VerifyOptions};

/// A memory-model strategy. Selected once at start-up from configuration;
/// dispatching through the tagged enum keeps backends free of any runtime
/// class hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryModel {
    SequentialConsistency,
    Tso,
    Pso,
}

/// Select the strategy for this run. Unrecognized configuration values are
/// rejected earlier, when the option string is parsed into
/// [`MemoryModelChoice`].
pub fn memory_model(options: &VerifyOptions, _ns: &Namespace) -> MemoryModel {
    match options.memory_model {
        MemoryModelChoice::Sc => MemoryModel::SequentialConsistency,
        MemoryModelChoice::Tso => MemoryModel::Tso,
        MemoryModelChoice::Pso => MemoryModel::Pso,
    }
}

impl MemoryModel {
    /// True when program order between `first` and `second` (same thread,
    /// `first` earlier) is *not* enforced under this model.
    fn relaxes(self, first: &SharedAccess, second: &SharedAccess) -> bool {
        match self {
            MemoryModel::SequentialConsistency => false,
            // Store buffering: a write may be delayed past a later read of a
            // different variable.
            MemoryModel::Tso => first.write && !second.write && first.symbol != second.symbol,
            // Additionally, writes to different variables may reorder.
            MemoryModel::Pso => first.write && first.symbol != second.symbol,
        }
    }

    /// Apply the strategy once to an equation, appending ordering
    /// constraints. Returns the number of constraint steps added.
    ///
    /// Single-threaded equations are detected cheaply (shared accesses from
    /// at most one thread) and left untouched.
    pub fn apply(self, equation: &mut Equation, ns: &mut Namespace) -> usize {
        let accesses = equation.shared_accesses();
        let threads: BTreeSet<usize> = accesses.iter().map(|a| a.thread).collect();
        if threads.len() <= 1 {
            debug!("single-threaded equation; memory model is a no-op");
            return 0;
        }

        let mut clocks: BTreeMap<usize, String> = BTreeMap::new();
        for access in &accesses {
            clocks.insert(access.index, ns.fresh("mm::clk", Sort::Int));
        }
        let clock = |access: &SharedAccess| Expr::symbol(clocks[&access.index].clone());
        let guard_of =
            |equation: &Equation, access: &SharedAccess| equation.steps()[access.index].guard.clone();

        let mut constraints: Vec<Step> = Vec::new();

        // Program order within each thread, relaxed per model.
        for thread in &threads {
            let sequence: Vec<&SharedAccess> =
                accesses.iter().filter(|a| a.thread == *thread).collect();
            for pair in sequence.windows(2) {
                let (first, second) = (pair[0], pair[1]);
                if self.relaxes(first, second) {
                    continue;
                }
                let cond = clock(first).lt(clock(second));
                let guard = Expr::and(vec![
                    guard_of(equation, first),
                    guard_of(equation, second),
                ]);
                constraints.push(Step::new(
                    StepKind::Constraint {
                        cond,
                        description: format!("program order, thread {thread}"),
                    },
                    guard,
                ));
            }
        }

        // Writes to the same variable from different threads never share a
        // clock value.
        for (i, first) in accesses.iter().enumerate() {
            if !first.write {
                continue;
            }
            for second in accesses.iter().skip(i + 1) {
                if !second.write || first.symbol != second.symbol || first.thread == second.thread
                {
                    continue;
                }
                let cond = Expr::not(clock(first).eq(clock(second)));
                let guard = Expr::and(vec![
                    guard_of(equation, first),
                    guard_of(equation, second),
                ]);
                constraints.push(Step::new(
                    StepKind::Constraint {
                        cond,
                        description: format!("write serialization, `{}`", first.symbol),
                    },
                    guard,
                ));
            }
        }

        let added = constraints.len();
        for step in constraints {
            equation.push(step);
        }
        debug!(added, threads = threads.len(), "memory model applied");
        added
    }
}
