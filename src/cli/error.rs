//! CLI-level errors (wraps infrastructure errors)

use thiserror::Error;

use crate::application::ApplicationError;
use crate::infrastructure::InfraError;

/// CLI errors are the top-level error type.
/// These are what get displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Infra(#[from] InfraError),

    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Usage(String),
}

impl From<ApplicationError> for CliError {
    fn from(e: ApplicationError) -> Self {
        CliError::Infra(InfraError::Application(e))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgs(_) | CliError::Usage(_) => crate::exitcode::USAGE,
            CliError::Infra(e) => match e {
                InfraError::Io { .. } => crate::exitcode::IOERR,
                InfraError::Application(app) => match app {
                    ApplicationError::Domain(d) if d.is_format_error() => crate::exitcode::DATAERR,
                    ApplicationError::Domain(_) => crate::exitcode::SOFTWARE,
                    ApplicationError::MissingInput(_) => crate::exitcode::NOINPUT,
                    ApplicationError::Config { .. } => crate::exitcode::CONFIG,
                    ApplicationError::OperationFailed { .. } => crate::exitcode::IOERR,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, Node};
    use std::path::PathBuf;

    #[test]
    fn given_format_error_when_mapping_then_dataerr() {
        let err: CliError = ApplicationError::from(DomainError::Disconnected(Node::new(1, 2))).into();
        assert_eq!(err.exit_code(), crate::exitcode::DATAERR);
    }

    #[test]
    fn given_missing_input_when_mapping_then_noinput() {
        let err: CliError = ApplicationError::MissingInput(PathBuf::from("tree")).into();
        assert_eq!(err.exit_code(), crate::exitcode::NOINPUT);
    }

    #[test]
    fn given_invariant_violation_when_mapping_then_software() {
        let err: CliError = ApplicationError::from(DomainError::InvariantViolation {
            node: Node::new(0, 1),
            message: "x".into(),
        })
        .into();
        assert_eq!(err.exit_code(), crate::exitcode::SOFTWARE);
    }
}
