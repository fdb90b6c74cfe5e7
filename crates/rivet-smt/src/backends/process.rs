//! Process-based SMT-LIB2 backend.
//!
//! Drives an external solver binary (`z3` or `cvc5`) over a pipe in
//! incremental SMT-LIB2 mode. The pipeline's only suspension point is the
//! blocking `solve` call; the optional soft time limit is forwarded to the
//! solver binary rather than enforced here.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command, Stdio};

use thiserror::Error;

use crate::backends::smtlib_printer::{sort_to_smtlib, to_smtlib};
use crate::solver::{DecisionProcedure, ModelValue, SolveOutcome};
use crate::terms::{SmtSort, SmtTerm};

#[derive(Debug, Error)]
pub enum ProcessSolverError {
    #[error("solver I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("solver binary not found: {0}")]
    NotFound(String),
    #[error("solver error: {0}")]
    Solver(String),
    #[error("failed to parse solver output: {0}")]
    Parse(String),
}

pub struct ProcessSolver {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr: BufReader<ChildStderr>,
    vars: HashMap<String, SmtSort>,
    last_outcome: Option<SolveOutcome>,
}

impl ProcessSolver {
    /// Spawn `z3` reading SMT-LIB2 from stdin.
    pub fn z3(soft_timeout_secs: u64) -> Result<Self, ProcessSolverError> {
        let mut args = vec!["-smt2".to_string(), "-in".to_string()];
        if soft_timeout_secs > 0 {
            args.push(format!("-T:{soft_timeout_secs}"));
        }
        Self::with_command("z3", &args)
    }

    /// Spawn `cvc5` in incremental mode.
    pub fn cvc5(soft_timeout_secs: u64) -> Result<Self, ProcessSolverError> {
        let mut args = vec![
            "--lang".to_string(),
            "smt2".to_string(),
            "--incremental".to_string(),
            "--produce-models".to_string(),
        ];
        if soft_timeout_secs > 0 {
            args.push(format!("--tlimit={}", soft_timeout_secs.saturating_mul(1000)));
        }
        Self::with_command("cvc5", &args)
    }

    pub fn with_command(cmd: &str, args: &[String]) -> Result<Self, ProcessSolverError> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProcessSolverError::NotFound(format!("{cmd}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProcessSolverError::Solver("failed to capture solver stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessSolverError::Solver("failed to capture solver stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProcessSolverError::Solver("failed to capture solver stderr".into()))?;

        let mut solver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr: BufReader::new(stderr),
            vars: HashMap::new(),
            last_outcome: None,
        };

        solver.send_no_response("(set-option :produce-models true)")?;
        solver.send_no_response("(set-logic QF_LIA)")?;
        Ok(solver)
    }

    fn send(&mut self, cmd: &str) -> Result<String, ProcessSolverError> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;

        let mut response = String::new();
        self.stdout.read_line(&mut response)?;
        if response.is_empty() {
            let mut diag = String::new();
            let _ = self.stderr.read_line(&mut diag);
            return Err(ProcessSolverError::Solver(format!(
                "no response to `{cmd}`; stderr: {}",
                diag.trim()
            )));
        }
        Ok(response.trim_end().to_string())
    }

    fn send_no_response(&mut self, cmd: &str) -> Result<(), ProcessSolverError> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }
}

impl Drop for ProcessSolver {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl DecisionProcedure for ProcessSolver {
    type Error = ProcessSolverError;

    fn declare(&mut self, name: &str, sort: &SmtSort) -> Result<(), Self::Error> {
        self.send_no_response(&format!("(declare-const {name} {})", sort_to_smtlib(sort)))?;
        self.vars.insert(name.to_string(), *sort);
        Ok(())
    }

    fn add_constraint(&mut self, term: &SmtTerm) -> Result<(), Self::Error> {
        self.send_no_response(&format!("(assert {})", to_smtlib(term)))
    }

    fn solve(&mut self) -> Result<SolveOutcome, Self::Error> {
        let response = self.send("(check-sat)")?;
        let outcome = parse_check_sat(&response)?;
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    fn value_of(&mut self, name: &str, sort: &SmtSort) -> Result<Option<ModelValue>, Self::Error> {
        if self.last_outcome != Some(SolveOutcome::Sat) {
            return Err(ProcessSolverError::Solver(
                "model value requested without a sat result".into(),
            ));
        }
        if !self.vars.contains_key(name) {
            return Err(ProcessSolverError::Solver(format!(
                "model value requested for undeclared variable `{name}`"
            )));
        }
        let response = self.send(&format!("(get-value ({name}))"))?;
        Ok(parse_model_value(&response, sort))
    }
}

fn parse_check_sat(response: &str) -> Result<SolveOutcome, ProcessSolverError> {
    match response {
        "sat" => Ok(SolveOutcome::Sat),
        "unsat" => Ok(SolveOutcome::Unsat),
        "unknown" => Ok(SolveOutcome::Error("solver returned unknown".into())),
        other if other.starts_with("(error") => Ok(SolveOutcome::Error(other.to_string())),
        other => Err(ProcessSolverError::Parse(format!(
            "unexpected check-sat response `{other}`"
        ))),
    }
}

/// Parse a `((name value))` response.
fn parse_model_value(response: &str, sort: &SmtSort) -> Option<ModelValue> {
    let inner = response
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')');
    let (_, value_part) = inner.split_once(' ')?;
    let value = value_part.trim().trim_end_matches(')').trim();

    match sort {
        SmtSort::Int => {
            if let Some(rest) = value.strip_prefix("(- ") {
                let magnitude = rest.trim_end_matches(')').trim();
                magnitude
                    .parse::<i64>()
                    .ok()
                    .map(|n| ModelValue::Int(-n))
            } else {
                value.parse::<i64>().ok().map(ModelValue::Int)
            }
        }
        SmtSort::Bool => match value {
            "true" => Some(ModelValue::Bool(true)),
            "false" => Some(ModelValue::Bool(false)),
            _ => None,
        },
    }
}
