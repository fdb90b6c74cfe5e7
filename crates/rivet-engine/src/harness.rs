//! Harness-generator boundary.
//!
//! Harness generation synthesizes an entry point driving a function under
//! test. It is independent of the equation pipeline; only the two-phase
//! option contract is fixed here: `handle_option` records configuration and
//! rejects unrecognized options per generator, and `validate_options` runs
//! once after all options are recorded, failing fast on inconsistent
//! combinations before any generation work begins.

use rivet_ir::namespace::{Namespace, Sort};

use crate::error::EngineError;

/// The goto-program model a harness generator mutates in place.
#[derive(Debug, Clone, Default)]
pub struct ProgramModel {
    pub namespace: Namespace,
    pub entry_function: Option<String>,
}

pub trait HarnessGenerator {
    /// Record one command-line option. Must reject options that do not
    /// apply to this generator; must only record, never perform work.
    fn handle_option(&mut self, option: &str, values: &[String]) -> Result<(), EngineError>;

    /// Check that the recorded options are in a sane state.
    fn validate_options(&self) -> Result<(), EngineError>;

    /// Generate a harness according to the recorded options.
    fn generate(
        &mut self,
        model: &mut ProgramModel,
        entry_function: &str,
    ) -> Result<(), EngineError>;
}

/// The only value of a single-element list; error otherwise.
pub fn require_exactly_one_value<'a>(
    option: &str,
    values: &'a [String],
) -> Result<&'a str, EngineError> {
    match values {
        [single] => Ok(single),
        _ => Err(EngineError::Configuration(format!(
            "option `{option}` expects exactly one value, got {}",
            values.len()
        ))),
    }
}

/// Assert that an option carries no values.
pub fn require_no_values(option: &str, values: &[String]) -> Result<(), EngineError> {
    if values.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Configuration(format!(
            "option `{option}` takes no values"
        )))
    }
}

/// Generates a harness that calls one function with nondeterministic
/// arguments.
#[derive(Debug, Default)]
pub struct FunctionCallHarnessGenerator {
    nondet_globals: bool,
    min_array_size: Option<usize>,
    max_array_size: Option<usize>,
}

fn parse_size(option: &str, value: &str) -> Result<usize, EngineError> {
    value.parse().map_err(|_| {
        EngineError::Configuration(format!("option `{option}` expects a number, got `{value}`"))
    })
}

impl HarnessGenerator for FunctionCallHarnessGenerator {
    fn handle_option(&mut self, option: &str, values: &[String]) -> Result<(), EngineError> {
        match option {
            "nondet-globals" => {
                require_no_values(option, values)?;
                self.nondet_globals = true;
            }
            "min-array-size" => {
                let value = require_exactly_one_value(option, values)?;
                self.min_array_size = Some(parse_size(option, value)?);
            }
            "max-array-size" => {
                let value = require_exactly_one_value(option, values)?;
                self.max_array_size = Some(parse_size(option, value)?);
            }
            other => {
                return Err(EngineError::Configuration(format!(
                    "function-call harness does not understand option `{other}`"
                )));
            }
        }
        Ok(())
    }

    fn validate_options(&self) -> Result<(), EngineError> {
        if let (Some(min), Some(max)) = (self.min_array_size, self.max_array_size) {
            if min > max {
                return Err(EngineError::Configuration(format!(
                    "min-array-size ({min}) exceeds max-array-size ({max})"
                )));
            }
        }
        Ok(())
    }

    fn generate(
        &mut self,
        model: &mut ProgramModel,
        entry_function: &str,
    ) -> Result<(), EngineError> {
        if entry_function.is_empty() {
            return Err(EngineError::Configuration(
                "harness entry function name is empty".into(),
            ));
        }
        model.entry_function = Some(entry_function.to_string());
        model
            .namespace
            .declare(format!("{entry_function}::return_value"), Sort::Int);
        if self.nondet_globals {
            model
                .namespace
                .declare(format!("{entry_function}::nondet_globals"), Sort::Bool);
        }
        Ok(())
    }
}

/// Look up a generator by name.
pub fn harness_generator(kind: &str) -> Result<Box<dyn HarnessGenerator>, EngineError> {
    match kind {
        "function-call" => Ok(Box::<FunctionCallHarnessGenerator>::default()),
        other => Err(EngineError::Configuration(format!(
            "unknown harness generator `{other}`"
        ))),
    }
}
