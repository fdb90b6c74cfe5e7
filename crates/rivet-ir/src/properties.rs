//! Property table and status lifecycle.
//!
//! Properties are created before symbolic execution begins and mutated only
//! by the status reconciler and the verdict builder. The table is passed
//! explicitly to every component that reads or updates it so that
//! path-parallel exploration strategies can hold one table per path.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::equation::{Equation, SourceLocation};

/// Lifecycle status of a property.
///
/// `Pass`, `Fail`, and `Error` are terminal once justified by a solver
/// verdict or a static determination; `NotChecked` and `Unknown` are
/// provisional.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PropertyStatus {
    /// The property was never reached by symbolic execution.
    NotChecked,
    /// Reached but not yet conclusively resolved.
    Unknown,
    Pass,
    Fail,
    /// The decision procedure could not resolve the property.
    Error,
}

impl PropertyStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PropertyStatus::Pass | PropertyStatus::Fail | PropertyStatus::Error
        )
    }

    /// Statuses that the reconciler must never overwrite.
    pub fn is_protected(self) -> bool {
        matches!(self, PropertyStatus::Fail | PropertyStatus::Error)
    }
}

impl fmt::Display for PropertyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyStatus::NotChecked => write!(f, "NOT CHECKED"),
            PropertyStatus::Unknown => write!(f, "UNKNOWN"),
            PropertyStatus::Pass => write!(f, "SUCCESS"),
            PropertyStatus::Fail => write!(f, "FAILURE"),
            PropertyStatus::Error => write!(f, "ERROR"),
        }
    }
}

/// A single named correctness condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: SourceLocation,
    pub status: PropertyStatus,
}

/// Properties keyed by their stable identifier.
pub type PropertyTable = BTreeMap<String, Property>;

/// Property declaration as supplied by the execution engine's front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: SourceLocation,
}

/// Build the initial table: declared properties start `NotChecked`;
/// properties with at least one assertion step in the equation were reached
/// by symbolic execution and start `Unknown`.
pub fn initial_property_table(declared: &[PropertyDecl], equation: &Equation) -> PropertyTable {
    let mut table: PropertyTable = declared
        .iter()
        .map(|decl| {
            (
                decl.id.clone(),
                Property {
                    description: decl.description.clone(),
                    source: decl.source.clone(),
                    status: PropertyStatus::NotChecked,
                },
            )
        })
        .collect();

    for (_, step) in equation.assert_steps() {
        if let crate::equation::StepKind::Assert {
            property_id,
            description,
            ..
        } = &step.kind
        {
            let entry = table.entry(property_id.clone()).or_insert_with(|| Property {
                description: description.clone(),
                source: step.source.clone(),
                status: PropertyStatus::NotChecked,
            });
            if entry.status == PropertyStatus::NotChecked {
                entry.status = PropertyStatus::Unknown;
            }
        }
    }

    table
}

/// Count properties per status.
pub fn count_by_status(table: &PropertyTable) -> BTreeMap<PropertyStatus, usize> {
    let mut counts = BTreeMap::new();
    for property in table.values() {
        *counts.entry(property.status).or_insert(0) += 1;
    }
    counts
}

/// True when at least one property failed or errored.
pub fn has_failures(table: &PropertyTable) -> bool {
    table.values().any(|p| p.status.is_protected())
}
