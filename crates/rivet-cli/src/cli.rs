//! CLI argument definitions: top-level `Cli` struct and `Commands` enum.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rivet")]
#[command(about = "Equation post-processing and verdict pipeline of a bounded model checker")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Verify the properties of a symbolically executed equation
    Verify {
        /// Path to the equation JSON produced by the execution engine
        file: PathBuf,

        /// Solver backend: z3 | cvc5
        #[arg(long, default_value = "z3")]
        solver: String,

        /// Concurrency memory model: sc | tso | pso
        #[arg(long, default_value = "sc")]
        memory_model: String,

        /// Slice with respect to the whole formula instead of live properties
        #[arg(long)]
        slice_formula: bool,

        /// Disable slicing entirely
        #[arg(long, conflicts_with = "slice_formula")]
        no_slice: bool,

        /// Explore paths one at a time: lifo | fifo
        #[arg(long)]
        paths: Option<String>,

        /// Limit search depth
        #[arg(long)]
        depth: Option<usize>,

        /// Unwind every loop this many times
        #[arg(long)]
        unwind: Option<usize>,

        /// Per-loop unwind bounds, loop_id:bound[,loop_id:bound...]
        #[arg(long)]
        unwindset: Option<String>,

        /// Generate unwinding assertions (cannot be used with
        /// --partial-loops or --cover)
        #[arg(long)]
        unwinding_assertions: bool,

        /// Permit paths with partial loops
        #[arg(long)]
        partial_loops: bool,

        /// Exit once coverage goals are satisfied
        #[arg(long)]
        cover: bool,

        /// Soft solver time limit in seconds (0 disables)
        #[arg(long, default_value_t = 0)]
        solver_timeout: u64,

        /// Write a GraphML witness to this file
        #[arg(long)]
        graphml_witness: Option<PathBuf>,

        /// Write a coverage report to this file
        #[arg(long)]
        coverage_report: Option<PathBuf>,

        /// Program source file, hashed into the witness
        #[arg(long)]
        program: Option<PathBuf>,

        /// Print the full counterexample trace
        #[arg(long)]
        trace: bool,

        /// Print the counterexample trace for one property
        #[arg(long)]
        property: Option<String>,
    },

    /// Print the parsed equation without verifying anything
    Show {
        /// Path to the equation JSON produced by the execution engine
        file: PathBuf,
    },
}
