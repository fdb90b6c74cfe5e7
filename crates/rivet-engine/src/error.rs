//! Pipeline error taxonomy.
//!
//! Configuration and conversion errors abort the current verification run;
//! solver trouble degrades the affected properties' statuses without
//! aborting unrelated ones; `TraceNotFound` signals caller misuse of the
//! trace builder, not a pipeline fault.

use thiserror::Error;

use rivet_ir::equation::ValidationError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid or incompatible option combination. Fatal, reported before
    /// any solving work.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed equation step reaching the converter. Fatal; indicates a
    /// bug in the producing engine.
    #[error("malformed equation: {0}")]
    Conversion(String),

    /// The decision procedure misbehaved at the transport level (an
    /// inconclusive solve result is *not* an error; see
    /// [`crate::verdict::RunStatus::Inconclusive`]).
    #[error("decision procedure error: {0}")]
    Solver(String),

    /// The requested property has no active failing assertion in the
    /// current model.
    #[error("no active failing assertion for property `{0}`")]
    TraceNotFound(String),

    /// Failure writing a witness or coverage report.
    #[error("report output error: {0}")]
    ReportOutput(#[from] std::io::Error),
}

impl EngineError {
    pub(crate) fn conversion_at(index: usize, reason: impl std::fmt::Display) -> Self {
        EngineError::Conversion(format!("step {index}: {reason}"))
    }

    pub(crate) fn solver<E: std::error::Error>(err: E) -> Self {
        EngineError::Solver(err.to_string())
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Conversion(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_conversion() {
        let err: EngineError = ValidationError::NonBooleanGuard { index: 3 }.into();
        assert!(matches!(err, EngineError::Conversion(_)));
        assert!(err.to_string().contains("step 3"));
    }

    #[test]
    fn display_prefixes() {
        assert!(EngineError::Configuration("bad".into())
            .to_string()
            .starts_with("configuration error"));
        assert!(EngineError::TraceNotFound("p".into())
            .to_string()
            .contains("`p`"));
    }
}
