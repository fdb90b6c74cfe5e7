//! Coverage report output.
//!
//! Summarizes, per function, the fraction of reachable steps still active
//! after post-processing (not sliced away and not guarded by a constant
//! false). Written as JSON; an unset destination is a no-op, not an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use rivet_ir::equation::Equation;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunctionCoverage {
    pub covered: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoverageReport {
    pub functions: BTreeMap<String, FunctionCoverage>,
    pub covered: usize,
    pub total: usize,
}

impl CoverageReport {
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.covered as f64 / self.total as f64
    }
}

/// Compute coverage for the post-processed equation.
pub fn coverage_from_equation(equation: &Equation) -> CoverageReport {
    let mut report = CoverageReport::default();
    for step in equation.steps() {
        let function = if step.source.function.is_empty() {
            "<unknown>".to_string()
        } else {
            step.source.function.clone()
        };
        let entry = report.functions.entry(function).or_default();
        entry.total += 1;
        report.total += 1;
        if !step.ignored && !step.guard.is_trivially_false() {
            entry.covered += 1;
            report.covered += 1;
        }
    }
    report
}

/// Write the coverage report as JSON. No-op when `path` is `None`.
pub fn output_coverage_report(path: Option<&Path>, equation: &Equation) -> std::io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let report = coverage_from_equation(equation);
    let json = serde_json::to_string_pretty(&report).map_err(std::io::Error::other)?;
    fs::write(path, json)?;
    info!(path = %path.display(), ratio = report.ratio(), "coverage report written");
    Ok(())
}
