//! Verification options and their fail-fast validation.
//!
//! The depth and unwind bounds parameterize the external symbolic execution
//! engine that produces the equation; they are parsed and validated here so
//! that an invalid combination is rejected before any execution work is
//! wasted.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::EngineError;

/// Concurrency semantics applied to shared-memory steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryModelChoice {
    /// Sequential consistency.
    #[default]
    Sc,
    /// Total store order: store buffers may delay a write past a later read.
    Tso,
    /// Partial store order: writes to different locations may also reorder.
    Pso,
}

impl FromStr for MemoryModelChoice {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sc" => Ok(MemoryModelChoice::Sc),
            "tso" => Ok(MemoryModelChoice::Tso),
            "pso" => Ok(MemoryModelChoice::Pso),
            other => Err(EngineError::Configuration(format!(
                "unknown memory model `{other}` (expected sc, tso, or pso)"
            ))),
        }
    }
}

impl std::fmt::Display for MemoryModelChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryModelChoice::Sc => write!(f, "sc"),
            MemoryModelChoice::Tso => write!(f, "tso"),
            MemoryModelChoice::Pso => write!(f, "pso"),
        }
    }
}

/// What the slicer's dependency closure is seeded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SliceMode {
    /// Assertions of live properties (default).
    #[default]
    Properties,
    /// Free variables of the whole verification formula, i.e. all
    /// assertions.
    Formula,
    /// No slicing.
    Off,
}

/// Path-exploration strategy of the external execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStrategy {
    Lifo,
    Fifo,
}

impl FromStr for PathStrategy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lifo" => Ok(PathStrategy::Lifo),
            "fifo" => Ok(PathStrategy::Fifo),
            other => Err(EngineError::Configuration(format!(
                "unknown path-exploration strategy `{other}` (expected lifo or fifo)"
            ))),
        }
    }
}

/// Which solver binary to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverChoice {
    #[default]
    Z3,
    Cvc5,
}

impl FromStr for SolverChoice {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "z3" => Ok(SolverChoice::Z3),
            "cvc5" => Ok(SolverChoice::Cvc5),
            other => Err(EngineError::Configuration(format!(
                "unknown solver `{other}` (expected z3 or cvc5)"
            ))),
        }
    }
}

/// Options for one verification run.
#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub solver: SolverChoice,
    pub memory_model: MemoryModelChoice,
    pub slice: SliceMode,
    pub paths: Option<PathStrategy>,
    /// Search-depth bound for the execution engine.
    pub depth: Option<usize>,
    /// Global unwind bound for the execution engine.
    pub unwind: Option<usize>,
    /// Per-loop unwind bounds (`loop_id:bound[,...]`).
    pub unwind_set: BTreeMap<String, usize>,
    /// Turn missed unwindings into assertions.
    pub unwinding_assertions: bool,
    /// Permit paths that leave loops partially unwound.
    pub partial_loops: bool,
    /// Coverage-based exit.
    pub cover: bool,
    /// Soft time limit forwarded to the solver binary; 0 disables.
    pub solver_timeout_secs: u64,
    /// GraphML witness destination; `None` disables the report.
    pub graphml_witness: Option<PathBuf>,
    /// Coverage report destination; `None` disables the report.
    pub coverage_report: Option<PathBuf>,
    /// Program source, hashed into the witness when present.
    pub program_file: Option<PathBuf>,
}

impl VerifyOptions {
    /// Reject incompatible option combinations before any pipeline work.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.unwinding_assertions && self.partial_loops {
            return Err(EngineError::Configuration(
                "--unwinding-assertions cannot be used with --partial-loops".into(),
            ));
        }
        if self.unwinding_assertions && self.cover {
            return Err(EngineError::Configuration(
                "--unwinding-assertions cannot be used with --cover".into(),
            ));
        }
        Ok(())
    }
}

/// Parse a `loop_id:bound[,loop_id:bound...]` unwind-set specification.
/// A later entry for the same loop overrides an earlier one.
pub fn parse_unwind_set(spec: &str) -> Result<BTreeMap<String, usize>, EngineError> {
    let mut out = BTreeMap::new();
    for entry in spec.split(',').filter(|e| !e.is_empty()) {
        let Some((loop_id, bound)) = entry.split_once(':') else {
            return Err(EngineError::Configuration(format!(
                "malformed unwind-set entry `{entry}` (expected loop_id:bound)"
            )));
        };
        if loop_id.is_empty() {
            return Err(EngineError::Configuration(format!(
                "empty loop id in unwind-set entry `{entry}`"
            )));
        }
        let bound: usize = bound.parse().map_err(|_| {
            EngineError::Configuration(format!(
                "invalid unwind bound `{bound}` for loop `{loop_id}`"
            ))
        })?;
        out.insert(loop_id.to_string(), bound);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_model_parsing() {
        assert_eq!("sc".parse::<MemoryModelChoice>().unwrap(), MemoryModelChoice::Sc);
        assert_eq!("tso".parse::<MemoryModelChoice>().unwrap(), MemoryModelChoice::Tso);
        assert_eq!("pso".parse::<MemoryModelChoice>().unwrap(), MemoryModelChoice::Pso);
        let err = "sc2".parse::<MemoryModelChoice>().unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn solver_and_paths_parsing() {
        assert_eq!("z3".parse::<SolverChoice>().unwrap(), SolverChoice::Z3);
        assert_eq!("cvc5".parse::<SolverChoice>().unwrap(), SolverChoice::Cvc5);
        assert!("yices".parse::<SolverChoice>().is_err());
        assert_eq!("lifo".parse::<PathStrategy>().unwrap(), PathStrategy::Lifo);
        assert!("random".parse::<PathStrategy>().is_err());
    }

    #[test]
    fn unwind_set_parsing() {
        let set = parse_unwind_set("main.0:3,lib.2:10").unwrap();
        assert_eq!(set["main.0"], 3);
        assert_eq!(set["lib.2"], 10);

        // later entry wins
        let set = parse_unwind_set("l:1,l:5").unwrap();
        assert_eq!(set["l"], 5);

        assert!(parse_unwind_set("").unwrap().is_empty());
        assert!(parse_unwind_set("junk").is_err());
        assert!(parse_unwind_set("l:abc").is_err());
        assert!(parse_unwind_set(":3").is_err());
    }

    #[test]
    fn exclusive_option_combinations() {
        let mut options = VerifyOptions {
            unwinding_assertions: true,
            partial_loops: true,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        options.partial_loops = false;
        options.cover = true;
        assert!(options.validate().is_err());

        options.cover = false;
        assert!(options.validate().is_ok());
    }

    #[test]
    fn partial_loops_alone_is_accepted() {
        let options = VerifyOptions {
            partial_loops: true,
            ..Default::default()
        };
        assert!(options.validate().is_ok());
    }
}
