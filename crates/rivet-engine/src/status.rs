//! Property-status reconciliation passes.
//!
//! Three independent, idempotent passes merge static determinations into
//! the authoritative status table. Each pass records the identifiers it
//! touched (for incremental runs that re-evaluate only part of the table)
//! and none of them ever downgrades a property already marked `Fail` or
//! `Error`.

use std::collections::BTreeSet;

use tracing::debug;

use rivet_ir::equation::{Equation, StepKind};
use rivet_ir::properties::{PropertyStatus, PropertyTable};

fn promote_to_pass(
    properties: &mut PropertyTable,
    updated: &mut BTreeSet<String>,
    property_id: &str,
) {
    let Some(property) = properties.get_mut(property_id) else {
        return;
    };
    if property.status.is_protected() || property.status == PropertyStatus::Pass {
        return;
    }
    property.status = PropertyStatus::Pass;
    updated.insert(property_id.to_string());
}

/// Pass 1: assertions whose condition is a compile-time constant true can
/// never fail regardless of path, so their properties are `Pass` without
/// any solver call.
pub fn update_status_from_equation(
    properties: &mut PropertyTable,
    updated: &mut BTreeSet<String>,
    equation: &Equation,
) {
    for (_, step) in equation.assert_steps() {
        let StepKind::Assert {
            property_id, cond, ..
        } = &step.kind
        else {
            continue;
        };
        if cond.is_trivially_true() {
            promote_to_pass(properties, updated, property_id);
        }
    }
    debug!(updated = updated.len(), "from-equation status pass done");
}

/// Pass 2: a property never reached by symbolic execution has no checkable
/// instance and is treated as vacuously satisfied, given the
/// unwinding/path bound used.
pub fn update_status_of_not_checked_properties(
    properties: &mut PropertyTable,
    updated: &mut BTreeSet<String>,
) {
    let not_checked: Vec<String> = properties
        .iter()
        .filter(|(_, p)| p.status == PropertyStatus::NotChecked)
        .map(|(id, _)| id.clone())
        .collect();
    for property_id in not_checked {
        promote_to_pass(properties, updated, &property_id);
    }
}

/// Pass 3: at the end of the checking algorithm, everything still
/// `Unknown` is declared `Pass`.
///
/// This is a deliberate approximation, not a proof: a bounded or partial
/// exploration that neither found a violation nor proved absence is
/// reported as passing, with soundness bounded by the unwind/path limits
/// applied elsewhere. Do not "fix" this without accepting that it changes
/// the observable verification guarantees.
pub fn update_status_of_unknown_properties(
    properties: &mut PropertyTable,
    updated: &mut BTreeSet<String>,
) {
    let unknown: Vec<String> = properties
        .iter()
        .filter(|(_, p)| p.status == PropertyStatus::Unknown)
        .map(|(id, _)| id.clone())
        .collect();
    for property_id in unknown {
        promote_to_pass(properties, updated, &property_id);
    }
}
