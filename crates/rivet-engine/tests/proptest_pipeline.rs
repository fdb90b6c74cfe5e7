//! Randomized invariants over slicing and status reconciliation.

use std::collections::BTreeSet;

use proptest::prelude::*;

use rivet_engine::config::SliceMode;
use rivet_engine::slice::slice_equation;
use rivet_engine::status::{
    update_status_of_not_checked_properties, update_status_of_unknown_properties,
};
use rivet_ir::equation::StepKind;
use rivet_ir::properties::{initial_property_table, PropertyStatus, PropertyTable};
use rivet_ir::proptest_generators::arb_equation;

fn arb_status() -> impl Strategy<Value = PropertyStatus> {
    prop_oneof![
        Just(PropertyStatus::NotChecked),
        Just(PropertyStatus::Unknown),
        Just(PropertyStatus::Pass),
        Just(PropertyStatus::Fail),
        Just(PropertyStatus::Error),
    ]
}

fn arb_table() -> impl Strategy<Value = PropertyTable> {
    proptest::collection::btree_map(
        "[a-c][0-9]",
        arb_status().prop_map(|status| rivet_ir::properties::Property {
            description: String::new(),
            source: Default::default(),
            status,
        }),
        0..6,
    )
}

proptest! {
    /// Slicing only flags steps; it never reorders, removes, or edits them.
    #[test]
    fn slicing_preserves_step_identity_and_order(eq in arb_equation(16)) {
        let table = initial_property_table(&[], &eq);
        let mut sliced = eq.clone();
        slice_equation(&mut sliced, &table, SliceMode::Properties);

        prop_assert_eq!(sliced.len(), eq.len());
        for (before, after) in eq.steps().iter().zip(sliced.steps()) {
            let mut neutral = after.clone();
            neutral.ignored = before.ignored;
            prop_assert_eq!(before, &neutral);
        }
    }

    /// Every live assertion survives slicing in both modes.
    #[test]
    fn live_asserts_survive_slicing(eq in arb_equation(16)) {
        let table = initial_property_table(&[], &eq);
        for mode in [SliceMode::Properties, SliceMode::Formula] {
            let mut sliced = eq.clone();
            slice_equation(&mut sliced, &table, mode);
            for (index, step) in eq.assert_steps() {
                if !step.ignored {
                    prop_assert!(
                        !sliced.steps()[index].ignored,
                        "assert at {} was sliced in {:?} mode", index, mode
                    );
                }
            }
        }
    }

    /// Formula-mode slicing never removes more than properties mode keeps:
    /// assumptions, constraints, and shared accesses always survive.
    #[test]
    fn non_candidates_always_survive(eq in arb_equation(16)) {
        let table = initial_property_table(&[], &eq);
        let mut sliced = eq.clone();
        slice_equation(&mut sliced, &table, SliceMode::Properties);
        for (index, step) in eq.steps().iter().enumerate() {
            let removable = matches!(
                step.kind,
                StepKind::Assignment { .. } | StepKind::FunctionCall { pure: true, .. }
            );
            if !removable && !step.ignored {
                prop_assert!(!sliced.steps()[index].ignored);
            }
        }
    }

    /// No reconciliation pass ever transitions a property out of Fail or
    /// Error, and the two promotion passes are idempotent.
    #[test]
    fn reconciliation_monotone_and_idempotent(table in arb_table()) {
        let mut working = table.clone();
        let mut updated = BTreeSet::new();
        update_status_of_not_checked_properties(&mut working, &mut updated);
        update_status_of_unknown_properties(&mut working, &mut updated);

        for (id, before) in &table {
            let after = working[id].status;
            if before.status.is_protected() {
                prop_assert_eq!(after, before.status);
            }
            prop_assert!(after.is_terminal() || after == before.status);
        }

        let first_round = working.clone();
        let mut second_updated = BTreeSet::new();
        update_status_of_not_checked_properties(&mut working, &mut second_updated);
        update_status_of_unknown_properties(&mut working, &mut second_updated);
        prop_assert_eq!(&working, &first_round);
        prop_assert!(second_updated.is_empty());
    }

    /// The dependency cone argument directly: if a surviving step reads a
    /// symbol, every earlier assignment to that symbol also survives.
    #[test]
    fn sliced_equations_are_dependency_closed(eq in arb_equation(16)) {
        let table = initial_property_table(&[], &eq);
        let mut sliced = eq.clone();
        slice_equation(&mut sliced, &table, SliceMode::Properties);

        for (index, step) in sliced.iter_active() {
            let mut reads = BTreeSet::new();
            step.reads_into(&mut reads);
            for (earlier, candidate) in eq.steps().iter().enumerate().take(index) {
                if candidate.ignored {
                    continue;
                }
                if let Some(target) = candidate.write_target() {
                    if reads.contains(target) {
                        prop_assert!(
                            !sliced.steps()[earlier].ignored,
                            "assignment to `{}` at {} was sliced but read at {}",
                            target, earlier, index
                        );
                    }
                }
            }
        }
    }
}
