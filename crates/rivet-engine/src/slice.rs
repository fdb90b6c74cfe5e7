//! Property-directed equation slicing.
//!
//! A single backward sweep computes the dependency closure of the seeded
//! steps and marks everything outside it ignored. Only assignments, pure
//! function calls, and (in [`SliceMode::Properties`]) assertions of
//! already-resolved properties are ever removed; assumptions, constraints,
//! and shared accesses are conservatively kept so that the feasibility of
//! every kept property is unchanged. Guard truth plays no role here — it is
//! a run-time notion not known until solving.

use std::collections::BTreeSet;

use tracing::debug;

use rivet_ir::equation::{Equation, StepKind};
use rivet_ir::properties::PropertyTable;

use crate::config::SliceMode;

/// Mark steps outside the dependency closure ignored. Returns how many
/// steps were newly sliced away. Relative order of survivors is preserved
/// (steps are flagged, never moved).
pub fn slice_equation(
    equation: &mut Equation,
    properties: &PropertyTable,
    mode: SliceMode,
) -> usize {
    if mode == SliceMode::Off {
        return 0;
    }

    let live = |property_id: &str| {
        properties
            .get(property_id)
            .map(|p| !p.status.is_terminal())
            .unwrap_or(true)
    };

    let mut needed: BTreeSet<String> = BTreeSet::new();
    let mut to_ignore: Vec<usize> = Vec::new();

    for index in (0..equation.len()).rev() {
        let step = &equation.steps()[index];
        if step.ignored {
            continue;
        }
        match &step.kind {
            StepKind::Assignment { lhs, .. } => {
                if needed.contains(lhs) {
                    step.reads_into(&mut needed);
                } else {
                    to_ignore.push(index);
                }
            }
            StepKind::FunctionCall { pure: true, .. } => {
                to_ignore.push(index);
            }
            StepKind::Assert { property_id, .. } => {
                let keep = match mode {
                    SliceMode::Properties => live(property_id),
                    SliceMode::Formula => true,
                    SliceMode::Off => unreachable!(),
                };
                if keep {
                    step.reads_into(&mut needed);
                } else {
                    to_ignore.push(index);
                }
            }
            // Everything else is kept and contributes its reads.
            _ => step.reads_into(&mut needed),
        }
    }

    let sliced = to_ignore.len();
    for index in to_ignore {
        equation.set_ignored(index, true);
    }
    debug!(sliced, remaining = equation.active_len(), "equation sliced");
    sliced
}
