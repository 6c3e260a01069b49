//! CLI error handling

use std::fmt;

use cpkg_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Engine, recipe or configuration error
    Ops(cpkg_errors::Error),
    /// Invalid command arguments
    InvalidArguments(String),
    /// I/O error while rendering output
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::InvalidArguments(msg) => write!(f, "Invalid arguments: {msg}"),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::InvalidArguments(_) => None,
        }
    }
}

impl From<cpkg_errors::Error> for CliError {
    fn from(e: cpkg_errors::Error) -> Self {
        CliError::Ops(e)
    }
}

impl From<cpkg_errors::RecipeError> for CliError {
    fn from(e: cpkg_errors::RecipeError) -> Self {
        CliError::Ops(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
