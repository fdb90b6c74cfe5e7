//! The symbolic-execution equation: an ordered sequence of guarded steps.
//!
//! The equation is produced once by the execution engine (append-only) and
//! then owned exclusively by the post-processing pipeline. Steps are stored
//! in a single arena and referenced by index; the pipeline never reorders or
//! removes them — the slicer flips per-step `ignored` flags and the memory
//! model appends synthetic `Constraint` steps at the tail.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::expr::{Expr, SortError};
use crate::namespace::{Namespace, Sort};
use crate::properties::PropertyTable;

/// Source position a step originates from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub function: String,
    #[serde(default)]
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, function: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            function: function.into(),
            line,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.file.is_empty() && self.function.is_empty()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            return write!(f, "<unknown>");
        }
        write!(f, "{}:{}", self.file, self.line)?;
        if !self.function.is_empty() {
            write!(f, " ({})", self.function)?;
        }
        Ok(())
    }
}

/// Step kind with the payload relevant to that kind embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// `lhs := rhs` under the step guard.
    Assignment { lhs: String, rhs: Expr },
    /// Path assumption.
    Assume { cond: Expr },
    /// Property check; `property_id` must exist in the property table.
    Assert {
        property_id: String,
        cond: Expr,
        #[serde(default)]
        description: String,
    },
    /// Read of a shared variable (visible to the memory model).
    SharedRead { symbol: String },
    /// Write of a shared variable (visible to the memory model).
    SharedWrite { symbol: String },
    /// Function call; `pure` calls have no externally visible effects and
    /// may be sliced away.
    FunctionCall {
        function: String,
        #[serde(default)]
        pure: bool,
    },
    FunctionReturn { function: String },
    /// Pure program-location marker.
    Location,
    /// Synthetic ordering constraint appended by the memory model.
    Constraint { cond: Expr, description: String },
}

impl StepKind {
    pub fn label(&self) -> &'static str {
        match self {
            StepKind::Assignment { .. } => "ASSIGNMENT",
            StepKind::Assume { .. } => "ASSUME",
            StepKind::Assert { .. } => "ASSERT",
            StepKind::SharedRead { .. } => "SHARED-READ",
            StepKind::SharedWrite { .. } => "SHARED-WRITE",
            StepKind::FunctionCall { .. } => "FUNCTION-CALL",
            StepKind::FunctionReturn { .. } => "FUNCTION-RETURN",
            StepKind::Location => "LOCATION",
            StepKind::Constraint { .. } => "CONSTRAINT",
        }
    }
}

/// One guarded step of the equation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub kind: StepKind,
    pub guard: Expr,
    #[serde(default)]
    pub thread: usize,
    #[serde(default)]
    pub source: SourceLocation,
    /// Set by the slicer; ignored steps are skipped by the converter but
    /// remain in place so indices stay stable.
    #[serde(default)]
    pub ignored: bool,
}

impl Step {
    pub fn new(kind: StepKind, guard: Expr) -> Self {
        Self {
            kind,
            guard,
            thread: 0,
            source: SourceLocation::default(),
            ignored: false,
        }
    }

    pub fn with_thread(mut self, thread: usize) -> Self {
        self.thread = thread;
        self
    }

    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = source;
        self
    }

    pub fn is_assert(&self) -> bool {
        matches!(self.kind, StepKind::Assert { .. })
    }

    pub fn property_id(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Assert { property_id, .. } => Some(property_id),
            _ => None,
        }
    }

    /// Symbol written by this step, if any.
    pub fn write_target(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Assignment { lhs, .. } => Some(lhs),
            _ => None,
        }
    }

    /// Collect symbols read by the payload and the guard.
    pub fn reads_into(&self, out: &mut BTreeSet<String>) {
        self.guard.free_symbols_into(out);
        match &self.kind {
            StepKind::Assignment { rhs, .. } => rhs.free_symbols_into(out),
            StepKind::Assume { cond }
            | StepKind::Assert { cond, .. }
            | StepKind::Constraint { cond, .. } => cond.free_symbols_into(out),
            StepKind::SharedRead { symbol } | StepKind::SharedWrite { symbol } => {
                out.insert(symbol.clone());
            }
            StepKind::FunctionCall { .. } | StepKind::FunctionReturn { .. } | StepKind::Location => {
            }
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<15} [t{}] guard {}", self.kind.label(), self.thread, self.guard)?;
        match &self.kind {
            StepKind::Assignment { lhs, rhs } => write!(f, ": {lhs} := {rhs}")?,
            StepKind::Assume { cond } => write!(f, ": {cond}")?,
            StepKind::Assert {
                property_id, cond, ..
            } => write!(f, ": [{property_id}] {cond}")?,
            StepKind::SharedRead { symbol } => write!(f, ": {symbol}")?,
            StepKind::SharedWrite { symbol } => write!(f, ": {symbol}")?,
            StepKind::FunctionCall { function, pure } => {
                write!(f, ": {function}{}", if *pure { " (pure)" } else { "" })?
            }
            StepKind::FunctionReturn { function } => write!(f, ": {function}")?,
            StepKind::Location => {}
            StepKind::Constraint { cond, description } => {
                write!(f, ": {cond}  ; {description}")?
            }
        }
        if self.ignored {
            write!(f, "  (sliced)")?;
        }
        Ok(())
    }
}

/// A shared-memory access extracted from the equation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedAccess {
    pub index: usize,
    pub symbol: String,
    pub write: bool,
    pub thread: usize,
}

/// Structural invariant violations detected by [`Equation::validate`].
///
/// These indicate a bug in the producing engine, not user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("step {index}: assertion references unknown property `{property_id}`")]
    UnknownProperty { index: usize, property_id: String },
    #[error("step {index}: guard is not boolean")]
    NonBooleanGuard { index: usize },
    #[error("step {index}: guard is ill-sorted: {source}")]
    IllSortedGuard {
        index: usize,
        #[source]
        source: SortError,
    },
    #[error("step {index}: {context} payload is ill-sorted: {source}")]
    IllSortedPayload {
        index: usize,
        context: &'static str,
        #[source]
        source: SortError,
    },
    #[error("step {index}: condition of {context} is not boolean")]
    NonBooleanCondition { index: usize, context: &'static str },
    #[error("step {index}: assignment target `{symbol}` is not declared")]
    UndeclaredTarget { index: usize, symbol: String },
    #[error("step {index}: assignment to `{lhs}` has mismatched sorts")]
    AssignmentSortMismatch { index: usize, lhs: String },
    #[error("step {index}: shared access to undeclared symbol `{symbol}`")]
    UndeclaredSharedSymbol { index: usize, symbol: String },
}

/// The ordered, mutable record of symbolic-execution steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Equation {
    steps: Vec<Step>,
}

impl Equation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Append a step at the tail, returning its index.
    pub fn push(&mut self, step: Step) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn set_ignored(&mut self, index: usize, ignored: bool) {
        self.steps[index].ignored = ignored;
    }

    /// Steps not marked ignored, with their indices, in original order.
    pub fn iter_active(&self) -> impl Iterator<Item = (usize, &Step)> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, step)| !step.ignored)
    }

    pub fn active_len(&self) -> usize {
        self.iter_active().count()
    }

    /// All assertion steps (including ignored ones), with indices.
    pub fn assert_steps(&self) -> impl Iterator<Item = (usize, &Step)> {
        self.steps
            .iter()
            .enumerate()
            .filter(|(_, step)| step.is_assert())
    }

    /// Shared-memory accesses among active steps, in program order.
    pub fn shared_accesses(&self) -> Vec<SharedAccess> {
        self.iter_active()
            .filter_map(|(index, step)| match &step.kind {
                StepKind::SharedRead { symbol } => Some(SharedAccess {
                    index,
                    symbol: symbol.clone(),
                    write: false,
                    thread: step.thread,
                }),
                StepKind::SharedWrite { symbol } => Some(SharedAccess {
                    index,
                    symbol: symbol.clone(),
                    write: true,
                    thread: step.thread,
                }),
                _ => None,
            })
            .collect()
    }

    /// Check the structural invariants required before conversion.
    pub fn validate(&self, ns: &Namespace, properties: &PropertyTable) -> Result<(), ValidationError> {
        for (index, step) in self.steps.iter().enumerate() {
            match step.guard.sort(ns) {
                Ok(Sort::Bool) => {}
                Ok(_) => return Err(ValidationError::NonBooleanGuard { index }),
                Err(source) => return Err(ValidationError::IllSortedGuard { index, source }),
            }
            match &step.kind {
                StepKind::Assert {
                    property_id, cond, ..
                } => {
                    if !properties.contains_key(property_id) {
                        return Err(ValidationError::UnknownProperty {
                            index,
                            property_id: property_id.clone(),
                        });
                    }
                    check_bool(ns, cond, index, "assertion")?;
                }
                StepKind::Assume { cond } => check_bool(ns, cond, index, "assumption")?,
                StepKind::Constraint { cond, .. } => check_bool(ns, cond, index, "constraint")?,
                StepKind::Assignment { lhs, rhs } => {
                    let Some(lhs_sort) = ns.sort_of(lhs) else {
                        return Err(ValidationError::UndeclaredTarget {
                            index,
                            symbol: lhs.clone(),
                        });
                    };
                    let rhs_sort = rhs.sort(ns).map_err(|source| {
                        ValidationError::IllSortedPayload {
                            index,
                            context: "assignment",
                            source,
                        }
                    })?;
                    if lhs_sort != rhs_sort {
                        return Err(ValidationError::AssignmentSortMismatch {
                            index,
                            lhs: lhs.clone(),
                        });
                    }
                }
                StepKind::SharedRead { symbol } | StepKind::SharedWrite { symbol } => {
                    if ns.lookup(symbol).is_none() {
                        return Err(ValidationError::UndeclaredSharedSymbol {
                            index,
                            symbol: symbol.clone(),
                        });
                    }
                }
                StepKind::FunctionCall { .. } | StepKind::FunctionReturn { .. } | StepKind::Location => {}
            }
        }
        Ok(())
    }
}

fn check_bool(
    ns: &Namespace,
    cond: &Expr,
    index: usize,
    context: &'static str,
) -> Result<(), ValidationError> {
    match cond.sort(ns) {
        Ok(Sort::Bool) => Ok(()),
        Ok(_) => Err(ValidationError::NonBooleanCondition { index, context }),
        Err(source) => Err(ValidationError::IllSortedPayload {
            index,
            context,
            source,
        }),
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, step) in self.steps.iter().enumerate() {
            writeln!(f, "{index:>4}: {step}")?;
        }
        Ok(())
    }
}
