//! `rivet` binary: load a frozen equation, run the verdict pipeline, and
//! report per-property results.

mod cli;

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rivet_engine::config::{SliceMode, SolverChoice, VerifyOptions};
use rivet_engine::error::EngineError;
use rivet_engine::pipeline::{run_verification, RunReport};
use rivet_engine::verdict::RunStatus;
use rivet_ir::equation::{Equation, Step};
use rivet_ir::namespace::Namespace;
use rivet_ir::properties::{
    count_by_status, has_failures, initial_property_table, PropertyDecl, PropertyStatus,
    PropertyTable,
};
use rivet_smt::backends::process::ProcessSolver;

use crate::cli::{Cli, Commands};

/// Exit codes follow the usual model-checker convention: 0 = all pass,
/// 10 = counterexample / failed property, 6 = error or inconclusive.
const EXIT_OK: u8 = 0;
const EXIT_ERROR: u8 = 6;
const EXIT_FAILED_PROPERTY: u8 = 10;

/// Equation input as produced by the execution engine front end.
#[derive(Debug, Deserialize)]
struct InputFile {
    namespace: Namespace,
    #[serde(default)]
    properties: Vec<PropertyDecl>,
    steps: Vec<Step>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("rivet: {err}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run(cli: Cli) -> Result<u8, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Show { file } => {
            let (equation, _, _) = load_input(&file)?;
            print!("{equation}");
            Ok(EXIT_OK)
        }
        Commands::Verify {
            file,
            solver,
            memory_model,
            slice_formula,
            no_slice,
            paths,
            depth,
            unwind,
            unwindset,
            unwinding_assertions,
            partial_loops,
            cover,
            solver_timeout,
            graphml_witness,
            coverage_report,
            program,
            trace,
            property,
        } => {
            let options = VerifyOptions {
                solver: solver.parse()?,
                memory_model: memory_model.parse()?,
                slice: if no_slice {
                    SliceMode::Off
                } else if slice_formula {
                    SliceMode::Formula
                } else {
                    SliceMode::Properties
                },
                paths: paths.as_deref().map(|s| s.parse()).transpose()?,
                depth,
                unwind,
                unwind_set: unwindset
                    .as_deref()
                    .map(rivet_engine::config::parse_unwind_set)
                    .transpose()?
                    .unwrap_or_default(),
                unwinding_assertions,
                partial_loops,
                cover,
                solver_timeout_secs: solver_timeout,
                graphml_witness,
                coverage_report,
                program_file: program,
            };
            // Fail fast on bad option combinations before spawning a solver
            // or reading the equation.
            options.validate()?;

            let (mut equation, mut ns, mut table) = load_input(&file)?;
            info!(
                steps = equation.len(),
                properties = table.len(),
                "equation loaded"
            );

            let mut solver = spawn_solver(&options)?;
            let report = run_verification(
                &mut equation,
                &mut ns,
                &mut table,
                &options,
                &mut solver,
            )?;

            print_results(&table, &report);
            print_traces(&report, trace, property.as_deref())?;

            Ok(exit_code(&table, &report))
        }
    }
}

fn load_input(path: &Path) -> Result<(Equation, Namespace, PropertyTable), Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("cannot read `{}`: {e}", path.display()))?;
    let input: InputFile =
        serde_json::from_str(&raw).map_err(|e| format!("cannot parse `{}`: {e}", path.display()))?;
    let equation = Equation::from_steps(input.steps);
    let table = initial_property_table(&input.properties, &equation);
    Ok((equation, input.namespace, table))
}

fn spawn_solver(options: &VerifyOptions) -> Result<ProcessSolver, Box<dyn std::error::Error>> {
    let solver = match options.solver {
        SolverChoice::Z3 => ProcessSolver::z3(options.solver_timeout_secs)?,
        SolverChoice::Cvc5 => ProcessSolver::cvc5(options.solver_timeout_secs)?,
    };
    Ok(solver)
}

fn print_results(table: &PropertyTable, report: &RunReport) {
    println!("** Results:");
    for (id, property) in table {
        if property.description.is_empty() {
            println!("[{id}] {}: {}", property.source, property.status);
        } else {
            println!(
                "[{id}] {} {}: {}",
                property.source, property.description, property.status
            );
        }
    }
    let counts = count_by_status(table);
    let failed = counts.get(&PropertyStatus::Fail).copied().unwrap_or(0)
        + counts.get(&PropertyStatus::Error).copied().unwrap_or(0);
    println!();
    println!("** {failed} of {} failed", table.len());
    match report.status {
        RunStatus::CounterexampleFound => println!("VERIFICATION FAILED"),
        RunStatus::Inconclusive => {
            let reason = report.reason.as_deref().unwrap_or("unknown reason");
            println!("VERIFICATION INCONCLUSIVE ({reason})");
        }
        RunStatus::NoCounterexample | RunStatus::Unsolved => {
            if has_failures(table) {
                println!("VERIFICATION FAILED");
            } else {
                println!("VERIFICATION SUCCESSFUL");
            }
        }
    }
}

fn print_traces(
    report: &RunReport,
    full: bool,
    property: Option<&str>,
) -> Result<(), EngineError> {
    if full {
        if let Some(trace) = &report.trace {
            println!();
            print!("{trace}");
        }
    }
    if let Some(property_id) = property {
        let trace = report.property_trace(property_id)?;
        println!();
        print!("{trace}");
    }
    Ok(())
}

fn exit_code(table: &PropertyTable, report: &RunReport) -> u8 {
    if report.status == RunStatus::Inconclusive {
        return EXIT_ERROR;
    }
    let counts = count_by_status(table);
    if counts.get(&PropertyStatus::Fail).copied().unwrap_or(0) > 0 {
        return EXIT_FAILED_PROPERTY;
    }
    if counts.get(&PropertyStatus::Error).copied().unwrap_or(0) > 0 {
        return EXIT_ERROR;
    }
    EXIT_OK
}
